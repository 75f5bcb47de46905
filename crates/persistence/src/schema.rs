//! ScyllaDB schema creation

use crate::error::PersistenceError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    // One partition per scope so list_by_scope is a single-partition read
    let overrides_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.config_overrides (
            scope_id TEXT,
            config_key TEXT,
            value_json TEXT,
            updated_at BIGINT,
            updated_by TEXT,
            PRIMARY KEY ((scope_id), config_key)
        )
    "#,
        keyspace
    );

    session.query_unpaged(overrides_table, &[]).await.map_err(|e| {
        PersistenceError::SchemaError(format!("Failed to create config_overrides table: {}", e))
    })?;

    Ok(())
}
