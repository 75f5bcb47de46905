//! Numeric range resolution
//!
//! A number entry may bound itself by another key's currently resolved
//! value (`min_key` / `max_key`). Range resolution and clamping are
//! separate passes so the same bound computation serves interactive
//! validation and publish-time enforcement.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::registry::ConfigEntry;
use crate::ConfigValue;

/// Lookup of currently resolved values by key
pub trait BoundValues {
    fn bound_value(&self, key: &str) -> Option<&ConfigValue>;
}

impl BoundValues for HashMap<String, ConfigValue> {
    fn bound_value(&self, key: &str) -> Option<&ConfigValue> {
        self.get(key)
    }
}

impl BoundValues for BTreeMap<String, ConfigValue> {
    fn bound_value(&self, key: &str) -> Option<&ConfigValue> {
        self.get(key)
    }
}

/// Effective bounds for one entry
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Keys whose value made a bound unusable: missing or non-numeric
    /// references, or the entry itself when its min exceeds its max.
    pub invalid_keys: Vec<String>,
}

impl ResolvedRange {
    pub fn is_valid(&self) -> bool {
        self.invalid_keys.is_empty()
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Compute the effective range of `entry` against `values`.
///
/// Static and dynamic bounds combine to the tighter of the two. Non-number
/// entries resolve to an unbounded range.
pub fn resolve_range(entry: &ConfigEntry, values: &impl BoundValues) -> ResolvedRange {
    let mut range = ResolvedRange::default();
    let Some(bounds) = entry.number_bounds() else {
        return range;
    };

    let dynamic = |key: &Option<String>, invalid: &mut Vec<String>| -> Option<f64> {
        let key = key.as_deref()?;
        match values.bound_value(key).and_then(ConfigValue::as_number) {
            Some(n) => Some(n),
            None => {
                invalid.push(key.to_string());
                None
            }
        }
    };

    let dyn_min = dynamic(&bounds.min_key, &mut range.invalid_keys);
    let dyn_max = dynamic(&bounds.max_key, &mut range.invalid_keys);

    range.min = tighter(bounds.min, dyn_min, f64::max);
    range.max = tighter(bounds.max, dyn_max, f64::min);

    if let (Some(min), Some(max)) = (bounds.min, range.max) {
        if min > max {
            range.invalid_keys.push(entry.key.clone());
        }
    }

    range
}

fn tighter(a: Option<f64>, b: Option<f64>, pick: fn(f64, f64) -> f64) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

/// Clamp a value into `range`, applying min then max
pub fn clamp(value: f64, range: &ResolvedRange) -> f64 {
    let value = range.min.map_or(value, |min| value.max(min));
    range.max.map_or(value, |max| value.min(max))
}
