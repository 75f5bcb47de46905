//! Override persistence using ScyllaDB

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{OverrideRecord, OverrideStore, PersistenceError, ScyllaClient};

/// ScyllaDB implementation of the override store
#[derive(Clone)]
pub struct ScyllaOverrideStore {
    client: ScyllaClient,
}

impl ScyllaOverrideStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn row_to_record(
        &self,
        row: scylla::frame::response::result::Row,
    ) -> Result<OverrideRecord, PersistenceError> {
        let (scope_id, config_key, value_json, updated_at, updated_by): (
            String,
            String,
            String,
            i64,
            Option<String>,
        ) = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        Ok(OverrideRecord {
            value: serde_json::from_str(&value_json)?,
            scope_id,
            config_key,
            updated_at: DateTime::from_timestamp_millis(updated_at).unwrap_or_else(Utc::now),
            updated_by,
        })
    }
}

#[async_trait]
impl OverrideStore for ScyllaOverrideStore {
    async fn get(
        &self,
        scope_id: &str,
        key: &str,
    ) -> Result<Option<OverrideRecord>, PersistenceError> {
        let query = format!(
            "SELECT scope_id, config_key, value_json, updated_at, updated_by
             FROM {}.config_overrides WHERE scope_id = ? AND config_key = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (scope_id, key))
            .await?;

        if let Some(rows) = result.rows {
            if let Some(row) = rows.into_iter().next() {
                return Ok(Some(self.row_to_record(row)?));
            }
        }

        Ok(None)
    }

    async fn list_by_scope(&self, scope_id: &str) -> Result<Vec<OverrideRecord>, PersistenceError> {
        let query = format!(
            "SELECT scope_id, config_key, value_json, updated_at, updated_by
             FROM {}.config_overrides WHERE scope_id = ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (scope_id,))
            .await?;

        let mut records = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                records.push(self.row_to_record(row)?);
            }
        }

        Ok(records)
    }

    async fn write(&self, record: &OverrideRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.config_overrides (
                scope_id, config_key, value_json, updated_at, updated_by
            ) VALUES (?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        let value_json = serde_json::to_string(&record.value)?;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &record.scope_id,
                    &record.config_key,
                    value_json,
                    record.updated_at.timestamp_millis(),
                    &record.updated_by,
                ),
            )
            .await?;

        tracing::info!(
            scope_id = %record.scope_id,
            key = %record.config_key,
            updated_by = ?record.updated_by,
            "Override written to ScyllaDB"
        );

        Ok(())
    }

    async fn remove(&self, scope_id: &str, key: &str) -> Result<(), PersistenceError> {
        let query = format!(
            "DELETE FROM {}.config_overrides WHERE scope_id = ? AND config_key = ?",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(query, (scope_id, key))
            .await?;

        tracing::info!(scope_id = %scope_id, key = %key, "Override removed");

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "scylla"
    }
}
