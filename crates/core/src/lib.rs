//! Core types for the scoped configuration engine
//!
//! This crate provides the leaf components every other crate builds on:
//! - Typed registry of configuration keys and the built-in catalog
//! - Value coercion per value type
//! - Numeric range resolution with cross-key bounds
//! - Scopes, scope ids and per-scope eligibility
//! - Request context and subscription tiers

pub mod catalog;
pub mod coercion;
pub mod context;
pub mod range;
pub mod registry;
pub mod scope;
pub mod tier;
pub mod value;

pub use catalog::{model_key, EXPERIMENTAL_FLAG_KEY, MODEL_ROLES};
pub use coercion::{coerce, Coerced};
pub use context::ResolveContext;
pub use range::{clamp, resolve_range, BoundValues, ResolvedRange};
pub use registry::{ConfigEntry, Registry, UiDescriptor, MAX_BOUND_DEPTH};
pub use scope::{resolve_scope, Control, Role, ScopeConfig, ScopeKind, ScopeRef};
pub use tier::Tier;
pub use value::{ConfigValue, NumberBounds, ValueType};

use thiserror::Error;

/// Registry and scope errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Duplicate configuration key: {0}")]
    DuplicateKey(String),

    #[error("Invalid entry {key}: {message}")]
    InvalidEntry { key: String, message: String },

    #[error("Entry {key} bounds reference {referenced}, which is not a registered number key")]
    InvalidBoundReference { key: String, referenced: String },

    #[error("Bound reference chain is cyclic or too deep: {}", .0.join(" -> "))]
    BoundCycle(Vec<String>),

    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid scope id: {0}")]
    InvalidScopeId(String),

    #[error("{scope} scope requires {field} in the request context")]
    MissingScopeContext {
        scope: ScopeKind,
        field: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
