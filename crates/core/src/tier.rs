//! Subscription tiers used for gating

use serde::{Deserialize, Serialize};
use std::fmt;

/// Subscription tier of the requesting context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Basic,
    Pro,
}

impl Tier {
    /// Ordering rank: free=0 < basic=1 < pro=2
    pub fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Basic => 1,
            Self::Pro => 2,
        }
    }

    /// Whether this tier satisfies a minimum tier requirement.
    /// An absent requirement always passes.
    pub fn satisfies(&self, min_tier: Option<Tier>) -> bool {
        min_tier.map_or(true, |min| self.rank() >= min.rank())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Pro => "pro",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "free" => Some(Self::Free),
            "basic" => Some(Self::Basic),
            "pro" => Some(Self::Pro),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
