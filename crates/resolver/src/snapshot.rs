//! Resolved values and snapshots

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use config_engine_core::{BoundValues, ConfigValue, ScopeKind, Tier};

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Static registry default
    Default,
    /// Remote baseline
    #[serde(rename = "appconfig")]
    Baseline,
    Global,
    Server,
    Channel,
    User,
    Meeting,
    /// Caller-granted experimental entitlement
    Experimental,
    /// Forced to default by a tier or experimental gate
    Gated,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Baseline => "appconfig",
            Self::Global => "global",
            Self::Server => "server",
            Self::Channel => "channel",
            Self::User => "user",
            Self::Meeting => "meeting",
            Self::Experimental => "experimental",
            Self::Gated => "gated",
        }
    }

    /// True for the five scope override sources
    pub fn is_override(&self) -> bool {
        matches!(
            self,
            Self::Global | Self::Server | Self::Channel | Self::User | Self::Meeting
        )
    }
}

impl From<ScopeKind> for ValueSource {
    fn from(kind: ScopeKind) -> Self {
        match kind {
            ScopeKind::Global => Self::Global,
            ScopeKind::Server => Self::Server,
            ScopeKind::Channel => Self::Channel,
            ScopeKind::User => Self::User,
            ScopeKind::Meeting => Self::Meeting,
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective value of one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedValue {
    pub key: String,
    /// `None` only for keys without a static default and no usable layer
    pub value: Option<ConfigValue>,
    pub source: ValueSource,
    pub gated: bool,
}

impl ResolvedValue {
    pub(crate) fn new(key: &str, value: Option<ConfigValue>, source: ValueSource) -> Self {
        Self {
            key: key.to_string(),
            value,
            source,
            gated: false,
        }
    }
}

/// Every registered key resolved for one context.
///
/// Built once per resolution and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    values: BTreeMap<String, ResolvedValue>,
    experimental_enabled: bool,
    tier: Tier,
    missing_required: Vec<String>,
}

impl Snapshot {
    pub(crate) fn new(
        values: BTreeMap<String, ResolvedValue>,
        experimental_enabled: bool,
        tier: Tier,
        missing_required: Vec<String>,
    ) -> Self {
        Self {
            values,
            experimental_enabled,
            tier,
            missing_required,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedValue> {
        self.values.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&ConfigValue> {
        self.get(key).and_then(|v| v.value.as_ref())
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.value(key).and_then(ConfigValue::as_bool)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.value(key).and_then(ConfigValue::as_number)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(ConfigValue::as_str)
    }

    pub fn source(&self, key: &str) -> Option<ValueSource> {
        self.get(key).map(|v| v.source)
    }

    pub fn is_gated(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| v.gated)
    }

    /// Resolved values in key order
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn experimental_enabled(&self) -> bool {
        self.experimental_enabled
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Keys a required scope expects but nothing provides
    pub fn missing_required(&self) -> &[String] {
        &self.missing_required
    }
}

impl BoundValues for Snapshot {
    fn bound_value(&self, key: &str) -> Option<&ConfigValue> {
        self.value(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_names() {
        assert_eq!(ValueSource::Baseline.as_str(), "appconfig");
        assert_eq!(
            serde_json::to_value(ValueSource::Baseline).unwrap(),
            serde_json::json!("appconfig")
        );
        assert_eq!(ValueSource::from(ScopeKind::User), ValueSource::User);
        assert!(ValueSource::Meeting.is_override());
        assert!(!ValueSource::Gated.is_override());
    }

    #[test]
    fn test_accessors() {
        let mut values = BTreeMap::new();
        values.insert(
            "a".to_string(),
            ResolvedValue::new("a", Some(ConfigValue::Bool(true)), ValueSource::Server),
        );
        values.insert(
            "b".to_string(),
            ResolvedValue::new("b", Some(ConfigValue::Number(3.0)), ValueSource::Default),
        );
        let snapshot = Snapshot::new(values, false, Tier::Basic, vec![]);

        assert_eq!(snapshot.bool("a"), Some(true));
        assert_eq!(snapshot.number("b"), Some(3.0));
        assert_eq!(snapshot.string("a"), None);
        assert_eq!(snapshot.source("a"), Some(ValueSource::Server));
        assert!(!snapshot.is_gated("a"));
        assert_eq!(snapshot.bound_value("b"), Some(&ConfigValue::Number(3.0)));
        assert_eq!(snapshot.iter().count(), 2);
    }
}
