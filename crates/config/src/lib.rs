//! Runtime settings for the configuration engine
//!
//! Supports loading settings from:
//! - YAML/TOML files under `config/`
//! - Environment variables (CONFIG_ENGINE__ prefix)
//!
//! These are the engine's own operating parameters (where the override
//! store lives, how the remote baseline is polled, how to log). The keys
//! the engine resolves live in the registry of `config-engine-core`.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, BaselineConfig, ObservabilityConfig, PersistenceConfig,
    RuntimeEnvironment, Settings, StoreBackend,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
