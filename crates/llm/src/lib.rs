//! Model parameter derivation
//!
//! Features:
//! - Per-role sampling configuration resolved from a snapshot
//! - Ordered capability table for backend model families
//! - Derivation of concrete call parameters with defined fallbacks

pub mod capability;
pub mod derive;
pub mod params;

pub use capability::{CapabilityRule, CapabilityTable, ModelCapabilities};
pub use derive::{derive_for_role, derive_params, nearest_effort, ModelCallParams};
pub use params::{ModelParamConfig, ModelRole, ReasoningEffort, SamplingMode, Verbosity};

use thiserror::Error;

/// Model parameter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Unknown model role: {0}")]
    UnknownRole(String),

    #[error("No resolved value for {0}")]
    MissingValue(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
