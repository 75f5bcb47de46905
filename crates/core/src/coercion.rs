//! Raw value coercion
//!
//! Raw values come from stores as JSON. Coercion never fails loudly: an
//! unacceptable input yields `valid: false` and the caller falls back to
//! the entry's default.

use serde_json::Value;

use crate::registry::ConfigEntry;
use crate::{ConfigValue, ValueType};

/// Result of coercing a raw value against an entry
#[derive(Debug, Clone, PartialEq)]
pub struct Coerced {
    /// The coerced value, `None` when invalid
    pub value: Option<ConfigValue>,
    pub valid: bool,
}

impl Coerced {
    fn ok(value: ConfigValue) -> Self {
        Self {
            value: Some(value),
            valid: true,
        }
    }

    fn invalid() -> Self {
        Self {
            value: None,
            valid: false,
        }
    }

    /// The coerced value, or the entry's default when invalid
    pub fn or_default(self, entry: &ConfigEntry) -> Option<ConfigValue> {
        if self.valid {
            self.value
        } else {
            entry.default_value.clone()
        }
    }
}

impl From<Option<ConfigValue>> for Coerced {
    fn from(value: Option<ConfigValue>) -> Self {
        value.map_or_else(Self::invalid, Self::ok)
    }
}

/// Coerce `raw` to the value type of `entry`
pub fn coerce(entry: &ConfigEntry, raw: &Value) -> Coerced {
    let value = match &entry.value_type {
        ValueType::Boolean => coerce_boolean(raw),
        ValueType::Number { .. } => coerce_number(raw),
        ValueType::Select { options } => coerce_select(options.as_deref(), raw),
        ValueType::String => coerce_string(raw),
    };
    value.into()
}

fn coerce_boolean(raw: &Value) -> Option<ConfigValue> {
    match raw {
        Value::Bool(b) => Some(ConfigValue::Bool(*b)),
        Value::String(s) => {
            if s.eq_ignore_ascii_case("true") {
                Some(ConfigValue::Bool(true))
            } else if s.eq_ignore_ascii_case("false") {
                Some(ConfigValue::Bool(false))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn coerce_number(raw: &Value) -> Option<ConfigValue> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(ConfigValue::Number(n))
}

fn coerce_select(options: Option<&[String]>, raw: &Value) -> Option<ConfigValue> {
    let Value::String(s) = raw else {
        return None;
    };
    match options {
        Some(options) if !options.iter().any(|o| o == s) => None,
        _ => Some(ConfigValue::String(s.clone())),
    }
}

fn coerce_string(raw: &Value) -> Option<ConfigValue> {
    raw.as_str().map(|s| ConfigValue::String(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_boolean_coercion() {
        let entry = ConfigEntry::boolean("flag", false);
        for raw in [json!("true"), json!("True"), json!("TRUE"), json!(true)] {
            assert_eq!(coerce(&entry, &raw).value, Some(ConfigValue::Bool(true)));
        }
        assert_eq!(
            coerce(&entry, &json!("false")).value,
            Some(ConfigValue::Bool(false))
        );
        for raw in [
            json!("yes"),
            json!("1"),
            json!(""),
            json!(" true "),
            json!("false\n"),
            json!(1),
            json!(null),
        ] {
            assert!(!coerce(&entry, &raw).valid, "{raw} should be rejected");
        }
    }

    #[test]
    fn test_number_coercion() {
        let entry = ConfigEntry::number("n", 0.0);
        assert_eq!(coerce(&entry, &json!(42)).value, Some(ConfigValue::Number(42.0)));
        assert_eq!(
            coerce(&entry, &json!(" 2.5 ")).value,
            Some(ConfigValue::Number(2.5))
        );
        assert!(!coerce(&entry, &json!("")).valid);
        assert!(!coerce(&entry, &json!("abc")).valid);
        assert!(!coerce(&entry, &json!("inf")).valid);
        assert!(!coerce(&entry, &json!(true)).valid);
    }

    #[test]
    fn test_select_coercion() {
        let entry = ConfigEntry::select("mode", ["a", "b"], "a");
        assert!(coerce(&entry, &json!("b")).valid);
        assert!(!coerce(&entry, &json!("c")).valid);
        assert!(!coerce(&entry, &json!(1)).valid);

        let open = ConfigEntry::new("free", ValueType::Select { options: None });
        assert!(coerce(&open, &json!("anything")).valid);
    }

    #[test]
    fn test_string_coercion_and_fallback() {
        let entry = ConfigEntry::string("s", "fallback");
        assert!(coerce(&entry, &json!("x")).valid);

        let coerced = coerce(&entry, &json!(5));
        assert!(!coerced.valid);
        assert_eq!(coerced.or_default(&entry), Some(ConfigValue::from("fallback")));
    }
}
