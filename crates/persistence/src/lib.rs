//! Override store for the configuration engine
//!
//! Stores one override row per (scope id, config key):
//! - `InMemoryOverrideStore` - development default and test double
//! - `ScyllaOverrideStore` - production persistence using ScyllaDB
//!
//! Values are stored raw; the resolver coerces them against the registry.

pub mod client;
pub mod error;
pub mod memory;
pub mod overrides;
pub mod schema;
pub mod store;

pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;
pub use memory::InMemoryOverrideStore;
pub use overrides::ScyllaOverrideStore;
pub use store::{OverrideRecord, OverrideStore};

/// Connect to ScyllaDB, ensure the schema and return the override store
pub async fn init(config: ScyllaConfig) -> Result<ScyllaOverrideStore, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaOverrideStore::new(client))
}
