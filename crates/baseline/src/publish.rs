//! Baseline publish pipeline
//!
//! Read, validate, write. Every key in the batch is checked against the
//! registry and coerced; numeric keys and every number entry bounded by a
//! batch key are re-checked against one merged view (registry defaults,
//! then the currently published baseline, then the batch). A single
//! violation rejects the whole batch before anything is written.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

use config_engine_core::{coerce, resolve_range, ConfigValue, ScopeKind};

use crate::source::parse_content;
use crate::{BaselineClient, BaselineError, BaselineMap, PublishError};

/// Values to publish as the new baseline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishRequest {
    pub values: BaselineMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PublishRequest {
    pub fn new(values: BaselineMap) -> Self {
        Self {
            values,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Outcome of a successful publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_number: Option<u64>,
}

/// One reason a batch was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("{key}: not a registered key")]
    UnknownKey { key: String },

    #[error("{key}: not enabled at global scope")]
    NotGlobal { key: String },

    #[error("{key}: {value} is not a valid {expected}")]
    InvalidValue {
        key: String,
        value: serde_json::Value,
        expected: &'static str,
    },

    #[error("{key}: {value} outside [{}, {}]", fmt_bound(.min), fmt_bound(.max))]
    OutOfRange {
        key: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("{key}: bound conflict involving {}", .keys.join(", "))]
    BoundConflict { key: String, keys: Vec<String> },
}

impl Violation {
    pub fn key(&self) -> &str {
        match self {
            Violation::UnknownKey { key }
            | Violation::NotGlobal { key }
            | Violation::InvalidValue { key, .. }
            | Violation::OutOfRange { key, .. }
            | Violation::BoundConflict { key, .. } => key,
        }
    }
}

fn fmt_bound(bound: &Option<f64>) -> String {
    bound.map_or_else(|| "-".to_string(), |b| b.to_string())
}

impl BaselineClient {
    /// Validate and publish a batch of baseline values.
    ///
    /// On success the batch is merged over the currently published
    /// baseline, uploaded as a new version, deployed, and the local cache
    /// is invalidated.
    pub async fn publish(&self, request: PublishRequest) -> Result<PublishResult, PublishError> {
        if !self.is_enabled() {
            return Err(PublishError::Disabled);
        }
        if request.values.is_empty() {
            return Err(PublishError::EmptyBatch);
        }

        let batch = self.validate_batch(&request.values).map_err(reject)?;

        let published = self.fetch_published().await?;
        let merged = self.merged_view(&published, &batch);
        self.validate_bounds(&batch, &merged).map_err(reject)?;

        let mut content: BTreeMap<String, serde_json::Value> = published.into_iter().collect();
        content.extend(batch.iter().map(|(k, v)| (k.clone(), v.to_json())));
        let body = serde_json::to_vec(&content).map_err(BaselineError::from)?;

        let version = self
            .source
            .create_version(body, request.description.as_deref())
            .await?;
        let deployment_number = self.source.start_deployment(version).await?;
        self.cache.invalidate();

        metrics::counter!("config_engine_baseline_publish_total", "outcome" => "published")
            .increment(1);
        tracing::info!(
            version,
            deployment_number = ?deployment_number,
            keys = batch.len(),
            description = ?request.description,
            "Baseline published"
        );

        Ok(PublishResult {
            version,
            deployment_number,
        })
    }

    /// Registry, scope and type checks for every batch key
    fn validate_batch(
        &self,
        values: &BaselineMap,
    ) -> Result<BTreeMap<String, ConfigValue>, Vec<Violation>> {
        let mut violations = Vec::new();
        let mut batch = BTreeMap::new();

        let sorted: BTreeMap<&String, &serde_json::Value> = values.iter().collect();
        for (key, raw) in sorted {
            let Some(entry) = self.registry.get(key) else {
                violations.push(Violation::UnknownKey { key: key.clone() });
                continue;
            };
            if !entry.is_enabled_at(ScopeKind::Global) {
                violations.push(Violation::NotGlobal { key: key.clone() });
                continue;
            }
            match coerce(entry, raw).value {
                Some(value) => {
                    batch.insert(key.clone(), value);
                }
                None => violations.push(Violation::InvalidValue {
                    key: key.clone(),
                    value: raw.clone(),
                    expected: entry.value_type.name(),
                }),
            }
        }

        if violations.is_empty() {
            Ok(batch)
        } else {
            Err(violations)
        }
    }

    /// Point-in-time view: defaults, then published values, then the batch
    fn merged_view(
        &self,
        published: &BaselineMap,
        batch: &BTreeMap<String, ConfigValue>,
    ) -> HashMap<String, ConfigValue> {
        let mut merged = HashMap::with_capacity(self.registry.len());
        for entry in self.registry.iter() {
            let published = published
                .get(&entry.key)
                .and_then(|raw| coerce(entry, raw).value);
            if let Some(value) = published.or_else(|| entry.default_value.clone()) {
                merged.insert(entry.key.clone(), value);
            }
        }
        merged.extend(batch.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Bound checks for numeric batch keys and their dependents
    fn validate_bounds(
        &self,
        batch: &BTreeMap<String, ConfigValue>,
        merged: &HashMap<String, ConfigValue>,
    ) -> Result<(), Vec<Violation>> {
        let mut affected = BTreeSet::new();
        for key in batch.keys() {
            affected.insert(key.as_str());
            affected.extend(self.registry.dependents_of(key).map(|e| e.key.as_str()));
        }

        let mut violations = Vec::new();
        for key in affected {
            let Some(entry) = self.registry.get(key) else {
                continue;
            };
            if !entry.value_type.is_number() {
                continue;
            }
            let Some(value) = merged.get(key).and_then(ConfigValue::as_number) else {
                continue;
            };

            let range = resolve_range(entry, merged);
            if !range.is_valid() {
                violations.push(Violation::BoundConflict {
                    key: key.to_string(),
                    keys: range.invalid_keys.clone(),
                });
            } else if !range.contains(value) {
                violations.push(Violation::OutOfRange {
                    key: key.to_string(),
                    value,
                    min: range.min,
                    max: range.max,
                });
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }

    /// Currently published baseline, read from the remote rather than the cache
    async fn fetch_published(&self) -> Result<BaselineMap, BaselineError> {
        let token = self.source.start_session().await?;
        let latest = self.source.get_latest(&token).await?;
        match latest.content {
            Some(content) => parse_content(&content),
            None => Ok(BaselineMap::new()),
        }
    }
}

fn reject(violations: Vec<Violation>) -> PublishError {
    metrics::counter!("config_engine_baseline_publish_total", "outcome" => "rejected").increment(1);
    tracing::warn!(
        violations = violations.len(),
        first = %violations[0],
        "Baseline publish rejected"
    );
    PublishError::Rejected(violations)
}
