//! Remote baseline client
//!
//! The baseline is the globally published layer that sits between the
//! registry defaults and every scope override. This crate provides:
//! - `BaselineSource` - the remote store (HTTP and in-memory)
//! - `BaselineCache` - process-wide cached map, poll token and expiry
//! - `BaselineClient` - fetch that never fails, plus the publish pipeline

pub mod cache;
pub mod client;
pub mod publish;
pub mod source;

pub use cache::BaselineCache;
pub use client::{BaselineClient, BaselineProvider, StaticBaseline};
pub use publish::{PublishRequest, PublishResult, Violation};
pub use source::{
    parse_content, BaselineSource, HttpBaselineSource, HttpSourceConfig, InMemoryBaselineSource,
    LatestConfiguration,
};

use std::collections::HashMap;
use thiserror::Error;

/// Raw baseline values by key
pub type BaselineMap = HashMap<String, serde_json::Value>;

/// Remote baseline errors
#[derive(Error, Debug, Clone)]
pub enum BaselineError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration session expired")]
    SessionExpired,

    #[error("Invalid baseline content: {0}")]
    InvalidContent(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for BaselineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BaselineError::InvalidContent(err.to_string())
        } else {
            BaselineError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BaselineError {
    fn from(err: serde_json::Error) -> Self {
        BaselineError::InvalidContent(err.to_string())
    }
}

/// Publish failures
#[derive(Error, Debug, Clone)]
pub enum PublishError {
    #[error("Publish rejected: {}", format_violations(.0))]
    Rejected(Vec<Violation>),

    #[error("Publish batch is empty")]
    EmptyBatch,

    #[error("Remote baseline disabled")]
    Disabled,

    #[error(transparent)]
    Remote(#[from] BaselineError),
}

impl PublishError {
    /// Validation violations, empty for remote failures
    pub fn violations(&self) -> &[Violation] {
        match self {
            PublishError::Rejected(violations) => violations,
            _ => &[],
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
