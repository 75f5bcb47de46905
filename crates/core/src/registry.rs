//! Typed registry of configuration keys
//!
//! The registry is static metadata: for every key it records the value
//! type, the code-defined default, gating conditions and per-scope
//! eligibility. It is validated once at construction; resolution code
//! can then assume bound references point at registered number entries
//! and that the bound graph is acyclic.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::coercion::coerce;
use crate::scope::{Control, ScopeConfig, ScopeKind};
use crate::{catalog, ConfigValue, CoreError, NumberBounds, Tier, ValueType};

/// Maximum length of a `min_key`/`max_key` reference chain
pub const MAX_BOUND_DEPTH: usize = 8;

/// Presentation hints for admin surfaces
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiDescriptor {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    /// Overrides the control inferred from the value type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control: Option<Control>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
}

/// Metadata for one registered key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique dotted path, e.g. `notes.enabled`
    pub key: String,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<ConfigValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_tier: Option<Tier>,
    #[serde(default)]
    pub requires_experimental_tag: bool,
    #[serde(default)]
    pub scopes: BTreeMap<ScopeKind, ScopeConfig>,
    #[serde(default)]
    pub ui: UiDescriptor,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            key: key.into(),
            value_type,
            default_value: None,
            min_tier: None,
            requires_experimental_tag: false,
            scopes: BTreeMap::new(),
            ui: UiDescriptor::default(),
        }
    }

    pub fn boolean(key: impl Into<String>, default: bool) -> Self {
        Self::new(key, ValueType::Boolean).with_default(default)
    }

    pub fn number(key: impl Into<String>, default: f64) -> Self {
        Self::new(key, ValueType::number()).with_default(default)
    }

    pub fn string(key: impl Into<String>, default: &str) -> Self {
        Self::new(key, ValueType::String).with_default(default)
    }

    pub fn select<I, S>(key: impl Into<String>, options: I, default: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(key, ValueType::select(options)).with_default(default)
    }

    pub fn with_default(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn without_default(mut self) -> Self {
        self.default_value = None;
        self
    }

    /// Replace the numeric bounds. No effect on non-number entries.
    pub fn bounds(mut self, bounds: NumberBounds) -> Self {
        if let ValueType::Number { bounds: b } = &mut self.value_type {
            *b = bounds;
        }
        self
    }

    pub fn scope(mut self, kind: ScopeKind, config: ScopeConfig) -> Self {
        self.scopes.insert(kind, config);
        self
    }

    pub fn min_tier(mut self, tier: Tier) -> Self {
        self.min_tier = Some(tier);
        self
    }

    pub fn experimental(mut self) -> Self {
        self.requires_experimental_tag = true;
        self
    }

    pub fn label(mut self, label: &str, description: &str) -> Self {
        self.ui.label = label.to_string();
        self.ui.description = description.to_string();
        self
    }

    pub fn category(mut self, category: &str) -> Self {
        self.ui.category = category.to_string();
        self
    }

    pub fn control(mut self, control: Control) -> Self {
        self.ui.control = Some(control);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.ui.step = Some(step);
        self
    }

    pub fn number_bounds(&self) -> Option<&NumberBounds> {
        self.value_type.bounds()
    }

    /// Whether `scope` takes part in the precedence chain for this entry
    pub fn is_enabled_at(&self, scope: ScopeKind) -> bool {
        self.scopes.get(&scope).is_some_and(|c| c.enabled)
    }
}

/// Validated collection of entries
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<ConfigEntry>,
    index: HashMap<String, usize>,
}

static BUILTIN: Lazy<Registry> = Lazy::new(|| {
    Registry::new(catalog::builtin_entries()).expect("built-in catalog must validate")
});

impl Registry {
    /// Build and validate a registry
    pub fn new(entries: Vec<ConfigEntry>) -> Result<Self, CoreError> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.key.trim().is_empty() {
                return Err(CoreError::InvalidEntry {
                    key: entry.key.clone(),
                    message: "key must not be empty".to_string(),
                });
            }
            if index.insert(entry.key.clone(), i).is_some() {
                return Err(CoreError::DuplicateKey(entry.key.clone()));
            }
        }

        let registry = Self { entries, index };
        registry.validate()?;

        tracing::debug!(keys = registry.len(), "Registry validated");
        Ok(registry)
    }

    /// The process-wide built-in catalog
    pub fn builtin() -> &'static Registry {
        &BUILTIN
    }

    fn validate(&self) -> Result<(), CoreError> {
        for entry in &self.entries {
            if let Some(default) = &entry.default_value {
                if !coerce(entry, &default.to_json()).valid {
                    return Err(CoreError::InvalidEntry {
                        key: entry.key.clone(),
                        message: format!("default {} does not match {}", default, entry.value_type.name()),
                    });
                }
            }

            if let Some(bounds) = entry.number_bounds() {
                for referenced in bounds.referenced_keys() {
                    match self.get(referenced) {
                        Some(target) if target.value_type.is_number() => {}
                        _ => {
                            return Err(CoreError::InvalidBoundReference {
                                key: entry.key.clone(),
                                referenced: referenced.to_string(),
                            })
                        }
                    }
                }
            }
        }

        for entry in &self.entries {
            self.check_bound_depth(&entry.key, &mut Vec::new())?;
        }
        Ok(())
    }

    fn check_bound_depth<'a>(&'a self, key: &'a str, path: &mut Vec<&'a str>) -> Result<(), CoreError> {
        if path.contains(&key) || path.len() >= MAX_BOUND_DEPTH {
            let mut chain: Vec<String> = path.iter().map(|k| k.to_string()).collect();
            chain.push(key.to_string());
            return Err(CoreError::BoundCycle(chain));
        }

        let Some(bounds) = self.get(key).and_then(ConfigEntry::number_bounds) else {
            return Ok(());
        };

        path.push(key);
        for referenced in bounds.referenced_keys() {
            self.check_bound_depth(referenced, path)?;
        }
        path.pop();
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ConfigEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entries in registration order
    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number entries whose dynamic bounds reference `key`
    pub fn dependents_of<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a ConfigEntry> + 'a {
        self.entries.iter().filter(move |entry| {
            entry
                .number_bounds()
                .is_some_and(|b| b.referenced_keys().any(|r| r == key))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::Role;

    fn admin() -> ScopeConfig {
        ScopeConfig::enabled(Role::Admin, Control::Number)
    }

    #[test]
    fn test_builtin_registry_validates() {
        let registry = Registry::builtin();
        assert!(!registry.is_empty());
        assert!(registry.contains(catalog::EXPERIMENTAL_FLAG_KEY));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = Registry::new(vec![
            ConfigEntry::boolean("a", true),
            ConfigEntry::boolean("a", false),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey(k) if k == "a"));
    }

    #[test]
    fn test_default_must_match_type() {
        let err = Registry::new(vec![
            ConfigEntry::select("mode", ["fast", "slow"], "medium"),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidEntry { .. }));
    }

    #[test]
    fn test_bound_reference_must_be_number() {
        let err = Registry::new(vec![
            ConfigEntry::boolean("flag", true),
            ConfigEntry::number("budget", 10.0)
                .bounds(NumberBounds::new().with_max_key("flag"))
                .scope(ScopeKind::Global, admin()),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBoundReference { .. }));

        let err = Registry::new(vec![ConfigEntry::number("budget", 10.0)
            .bounds(NumberBounds::new().with_max_key("missing"))])
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidBoundReference { .. }));
    }

    #[test]
    fn test_bound_cycle_rejected() {
        let err = Registry::new(vec![
            ConfigEntry::number("a", 1.0).bounds(NumberBounds::new().with_max_key("b")),
            ConfigEntry::number("b", 1.0).bounds(NumberBounds::new().with_min_key("a")),
        ])
        .unwrap_err();
        assert!(matches!(err, CoreError::BoundCycle(_)));
    }

    #[test]
    fn test_bound_chain_depth_limit() {
        let mut entries = Vec::new();
        for i in 0..=MAX_BOUND_DEPTH {
            let entry = ConfigEntry::number(format!("k{}", i), 1.0);
            entries.push(if i < MAX_BOUND_DEPTH {
                entry.bounds(NumberBounds::new().with_max_key(format!("k{}", i + 1)))
            } else {
                entry
            });
        }
        assert!(matches!(Registry::new(entries), Err(CoreError::BoundCycle(_))));
    }

    #[test]
    fn test_dependents_of() {
        let registry = Registry::new(vec![
            ConfigEntry::number("cap", 100.0),
            ConfigEntry::number("free", 10.0).bounds(NumberBounds::new().with_max_key("cap")),
            ConfigEntry::number("pro", 50.0).bounds(NumberBounds::new().with_max_key("cap")),
            ConfigEntry::number("other", 1.0),
        ])
        .unwrap();

        let deps: Vec<&str> = registry.dependents_of("cap").map(|e| e.key.as_str()).collect();
        assert_eq!(deps, vec!["free", "pro"]);
        assert!(registry.get("other").unwrap().scopes.is_empty());
    }
}
