//! Configuration values and value types

use serde::{Deserialize, Serialize};
use std::fmt;

/// A coerced configuration value.
///
/// Raw values arrive as JSON from the override store and the baseline;
/// after coercion every value is one of these three shapes. Select values
/// are carried as strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Convert back into a raw JSON value (used when publishing)
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Static numeric bounds of a number entry.
///
/// `min_key` / `max_key` name another number entry whose currently
/// resolved value acts as a dynamic bound.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_key: Option<String>,
}

impl NumberBounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_min_key(mut self, key: impl Into<String>) -> Self {
        self.min_key = Some(key.into());
        self
    }

    pub fn with_max_key(mut self, key: impl Into<String>) -> Self {
        self.max_key = Some(key.into());
        self
    }

    /// Keys referenced as dynamic bounds
    pub fn referenced_keys(&self) -> impl Iterator<Item = &str> {
        self.min_key
            .as_deref()
            .into_iter()
            .chain(self.max_key.as_deref())
    }
}

/// The value type of a registry entry.
///
/// Each variant carries the data its coercion and range logic needs, so an
/// entry has exactly one value type by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValueType {
    Boolean,
    String,
    Number {
        #[serde(default)]
        bounds: NumberBounds,
    },
    Select {
        /// Allowed values. `None` permits any string.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Vec<String>>,
    },
}

impl ValueType {
    pub fn number() -> Self {
        Self::Number {
            bounds: NumberBounds::default(),
        }
    }

    pub fn bounded(bounds: NumberBounds) -> Self {
        Self::Number { bounds }
    }

    pub fn select<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Select {
            options: Some(options.into_iter().map(Into::into).collect()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::String => "string",
            Self::Number { .. } => "number",
            Self::Select { .. } => "select",
        }
    }

    pub fn bounds(&self) -> Option<&NumberBounds> {
        match self {
            Self::Number { bounds } => Some(bounds),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number { .. })
    }
}
