//! Override records and the store trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::PersistenceError;

/// One override row, unique per (scope_id, config_key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    /// Composite scope id, e.g. `channel#<guild>#<channel>`
    pub scope_id: String,
    pub config_key: String,
    /// Raw value as written; coerced at resolution time
    pub value: serde_json::Value,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl OverrideRecord {
    pub fn new(
        scope_id: impl Into<String>,
        config_key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            scope_id: scope_id.into(),
            config_key: config_key.into(),
            value,
            updated_at: Utc::now(),
            updated_by: None,
        }
    }

    pub fn with_updated_by(mut self, user: impl Into<String>) -> Self {
        self.updated_by = Some(user.into());
        self
    }
}

/// Keyed read/write access to per-scope overrides
#[async_trait]
pub trait OverrideStore: Send + Sync {
    /// Fetch a single override
    async fn get(&self, scope_id: &str, key: &str)
        -> Result<Option<OverrideRecord>, PersistenceError>;

    /// All overrides held by a scope
    async fn list_by_scope(&self, scope_id: &str) -> Result<Vec<OverrideRecord>, PersistenceError>;

    /// Insert or replace an override
    async fn write(&self, record: &OverrideRecord) -> Result<(), PersistenceError>;

    /// Delete an override; deleting a missing row is not an error
    async fn remove(&self, scope_id: &str, key: &str) -> Result<(), PersistenceError>;

    /// Backend name for logs
    fn backend(&self) -> &'static str;
}
