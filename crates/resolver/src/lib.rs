//! Snapshot resolution for the scoped configuration engine
//!
//! Composes the registry, the remote baseline and the override store:
//! - `SnapshotResolver` - one immutable snapshot per request context
//! - `OverrideService` - validated override writes
//! - `Snapshot` / `ResolvedValue` - resolved values with their source

pub mod overrides;
pub mod resolver;
pub mod snapshot;

pub use overrides::OverrideService;
pub use resolver::SnapshotResolver;
pub use snapshot::{ResolvedValue, Snapshot, ValueSource};

use config_engine_core::{CoreError, ScopeKind};
use config_engine_persistence::PersistenceError;
use thiserror::Error;

/// Resolution and override write errors
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Scope(#[from] CoreError),

    #[error("Override store error: {0}")]
    Store(#[from] PersistenceError),

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("{key} cannot be overridden at {scope} scope")]
    ScopeNotEnabled { key: String, scope: ScopeKind },

    #[error("{key}: {value} is not a valid {expected}")]
    InvalidValue {
        key: String,
        value: serde_json::Value,
        expected: &'static str,
    },

    #[error("{key}: unusable bounds from {}", .keys.join(", "))]
    InvalidBounds { key: String, keys: Vec<String> },
}
