//! Per-role model parameter configuration
//!
//! Each model-capable role resolves its parameters through ordinary
//! registry keys (`models.<role>.<field>`), so every field can be
//! overridden at any scope the registry allows.

use serde::{Deserialize, Serialize};
use std::fmt;

use config_engine_core::{model_key, ConfigValue};
use config_engine_resolver::Snapshot;

use crate::LlmError;

/// How a role steers the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SamplingMode {
    #[default]
    Reasoning,
    Temperature,
}

impl SamplingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Temperature => "temperature",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reasoning" => Some(Self::Reasoning),
            "temperature" => Some(Self::Temperature),
            _ => None,
        }
    }
}

/// Reasoning effort, ordered from least to most
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    None,
    Minimal,
    Low,
    #[default]
    Medium,
    High,
    Xhigh,
}

impl ReasoningEffort {
    pub const ORDER: [ReasoningEffort; 6] = [
        Self::None,
        Self::Minimal,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Xhigh,
    ];

    pub fn rank(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Xhigh => "xhigh",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|e| e.as_str() == s)
    }
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity hint; `Default` means "send nothing"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    #[default]
    Default,
    Low,
    Medium,
    High,
}

impl Verbosity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "default" => Some(Self::Default),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Roles that call a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelRole {
    Notes,
    Ask,
    Summary,
    Correction,
}

impl ModelRole {
    pub const ALL: [ModelRole; 4] = [Self::Notes, Self::Ask, Self::Summary, Self::Correction];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notes => "notes",
            Self::Ask => "ask",
            Self::Summary => "summary",
            Self::Correction => "correction",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved sampling intent for one role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParamConfig {
    pub model: String,
    pub sampling_mode: SamplingMode,
    pub reasoning_effort: ReasoningEffort,
    /// 0..=2
    pub temperature: f64,
    pub verbosity: Verbosity,
}

impl ModelParamConfig {
    /// Read a role's parameters from a resolved snapshot
    pub fn from_snapshot(snapshot: &Snapshot, role: ModelRole) -> Result<Self, LlmError> {
        let key = |field: &str| model_key(role.as_str(), field);

        let model = read(snapshot, &key("model"), |v| v.as_str().map(str::to_string))?;
        let sampling_mode = read(snapshot, &key("sampling_mode"), |v| {
            v.as_str().and_then(SamplingMode::from_str)
        })?;
        let reasoning_effort = read(snapshot, &key("reasoning_effort"), |v| {
            v.as_str().and_then(ReasoningEffort::from_str)
        })?;
        let temperature = read(snapshot, &key("temperature"), ConfigValue::as_number)?;
        let verbosity = read(snapshot, &key("verbosity"), |v| {
            v.as_str().and_then(Verbosity::from_str)
        })?;

        Ok(Self {
            model,
            sampling_mode,
            reasoning_effort,
            temperature,
            verbosity,
        })
    }
}

fn read<T>(
    snapshot: &Snapshot,
    key: &str,
    parse: impl FnOnce(&ConfigValue) -> Option<T>,
) -> Result<T, LlmError> {
    let value = snapshot
        .value(key)
        .ok_or_else(|| LlmError::MissingValue(key.to_string()))?;
    parse(value).ok_or_else(|| LlmError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}
