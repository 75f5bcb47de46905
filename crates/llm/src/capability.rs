//! Backend model capability table
//!
//! An ordered list of prefix rules. Lookup walks the list and the first
//! matching prefix wins, so more specific prefixes (`gpt-5-pro`) must come
//! before their family (`gpt-5`).

use serde::{Deserialize, Serialize};

use crate::ReasoningEffort;

/// Sampling controls a backend model accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ModelCapabilities {
    /// Supported reasoning effort levels; empty when the model has no reasoning control
    #[serde(default)]
    pub reasoning_efforts: Vec<ReasoningEffort>,
    #[serde(default)]
    pub supports_temperature: bool,
    #[serde(default)]
    pub supports_verbosity: bool,
    /// Sending a temperature requires reasoning effort `none`
    #[serde(default)]
    pub temperature_requires_no_reasoning: bool,
}

impl ModelCapabilities {
    /// Temperature only, no reasoning or verbosity control
    pub fn temperature_only() -> Self {
        Self {
            supports_temperature: true,
            ..Default::default()
        }
    }

    /// Reasoning control with the given levels
    pub fn reasoning(efforts: &[ReasoningEffort]) -> Self {
        Self {
            reasoning_efforts: efforts.to_vec(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self) -> Self {
        self.supports_temperature = true;
        self
    }

    pub fn with_verbosity(mut self) -> Self {
        self.supports_verbosity = true;
        self
    }

    /// Temperature is accepted only with reasoning effort `none`
    pub fn temperature_without_reasoning(mut self) -> Self {
        self.supports_temperature = true;
        self.temperature_requires_no_reasoning = true;
        self
    }

    pub fn supports_reasoning(&self) -> bool {
        !self.reasoning_efforts.is_empty()
    }

    pub fn supports_effort(&self, effort: ReasoningEffort) -> bool {
        self.reasoning_efforts.contains(&effort)
    }
}

/// One prefix rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityRule {
    pub prefix: String,
    pub capabilities: ModelCapabilities,
}

impl CapabilityRule {
    pub fn new(prefix: impl Into<String>, capabilities: ModelCapabilities) -> Self {
        Self {
            prefix: prefix.into(),
            capabilities,
        }
    }

    fn matches(&self, model: &str) -> bool {
        model.starts_with(&self.prefix)
    }
}

/// Ordered capability rules with a fallback for unknown models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityTable {
    rules: Vec<CapabilityRule>,
    #[serde(default = "ModelCapabilities::temperature_only")]
    fallback: ModelCapabilities,
}

impl Default for CapabilityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CapabilityTable {
    pub fn new(rules: Vec<CapabilityRule>) -> Self {
        Self {
            rules,
            fallback: ModelCapabilities::temperature_only(),
        }
    }

    pub fn with_fallback(mut self, fallback: ModelCapabilities) -> Self {
        self.fallback = fallback;
        self
    }

    /// Built-in table for the hosted model families we call
    pub fn builtin() -> Self {
        use ReasoningEffort as E;

        Self::new(vec![
            CapabilityRule::new("gpt-5-pro", ModelCapabilities::reasoning(&[E::High]).with_verbosity()),
            CapabilityRule::new(
                "gpt-5.2",
                ModelCapabilities::reasoning(&[E::None, E::Low, E::Medium, E::High, E::Xhigh])
                    .temperature_without_reasoning()
                    .with_verbosity(),
            ),
            CapabilityRule::new(
                "gpt-5.1",
                ModelCapabilities::reasoning(&[E::None, E::Low, E::Medium, E::High])
                    .temperature_without_reasoning()
                    .with_verbosity(),
            ),
            CapabilityRule::new("gpt-5-chat", ModelCapabilities::temperature_only()),
            CapabilityRule::new(
                "gpt-5",
                ModelCapabilities::reasoning(&[E::Minimal, E::Low, E::Medium, E::High]).with_verbosity(),
            ),
            CapabilityRule::new("o1-mini", ModelCapabilities::default()),
            CapabilityRule::new("o1", ModelCapabilities::reasoning(&[E::Low, E::Medium, E::High])),
            CapabilityRule::new("o3-pro", ModelCapabilities::reasoning(&[E::Low, E::Medium, E::High])),
            CapabilityRule::new("o3", ModelCapabilities::reasoning(&[E::Low, E::Medium, E::High])),
            CapabilityRule::new("o4-mini", ModelCapabilities::reasoning(&[E::Low, E::Medium, E::High])),
            CapabilityRule::new("gpt-4.1", ModelCapabilities::temperature_only()),
            CapabilityRule::new("gpt-4o", ModelCapabilities::temperature_only()),
        ])
    }

    pub fn rules(&self) -> &[CapabilityRule] {
        &self.rules
    }

    /// Capabilities of `model`: first matching rule, else the fallback
    pub fn lookup(&self, model: &str) -> &ModelCapabilities {
        let model = model.trim().to_ascii_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&model))
            .map(|rule| &rule.capabilities)
            .unwrap_or(&self.fallback)
    }

    /// Prefix of the rule that matched `model`, if any
    pub fn matched_prefix(&self, model: &str) -> Option<&str> {
        let model = model.trim().to_ascii_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&model))
            .map(|rule| rule.prefix.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_most_specific_prefix_first() {
        let table = CapabilityTable::builtin();
        assert_eq!(table.matched_prefix("gpt-5-pro-2025-10-06"), Some("gpt-5-pro"));
        assert_eq!(table.matched_prefix("gpt-5-mini"), Some("gpt-5"));
        assert_eq!(table.matched_prefix("gpt-5.1-2025-11-13"), Some("gpt-5.1"));
        assert_eq!(table.matched_prefix("GPT-4.1-mini"), Some("gpt-4.1"));
        assert_eq!(table.matched_prefix("o3-pro"), Some("o3-pro"));

        assert_eq!(
            table.lookup("gpt-5-pro").reasoning_efforts,
            vec![ReasoningEffort::High]
        );
        assert!(!table.lookup("gpt-5-mini").supports_temperature);
    }

    #[test]
    fn test_unknown_model_uses_fallback() {
        let table = CapabilityTable::builtin();
        assert_eq!(table.matched_prefix("claude-sonnet-4"), None);
        assert_eq!(
            table.lookup("claude-sonnet-4"),
            &ModelCapabilities::temperature_only()
        );

        let strict = table.with_fallback(ModelCapabilities::default());
        assert!(!strict.lookup("mystery").supports_temperature);
    }

    #[test]
    fn test_rule_order_matters() {
        let shadowed = CapabilityTable::new(vec![
            CapabilityRule::new("gpt-5", ModelCapabilities::temperature_only()),
            CapabilityRule::new("gpt-5-pro", ModelCapabilities::reasoning(&[ReasoningEffort::High])),
        ]);
        assert!(shadowed.lookup("gpt-5-pro").supports_temperature);
    }
}
