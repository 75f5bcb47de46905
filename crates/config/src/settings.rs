//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{baseline, persistence, ENV_PREFIX};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - in-memory collaborators allowed
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Logging and metrics
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Remote baseline client
    #[serde(default)]
    pub baseline: BaselineConfig,

    /// Override store
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    /// Record metrics counters
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Remote baseline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Disabled baseline resolves every key without a remote layer
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_baseline_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_application")]
    pub application: String,

    /// Remote deployment environment (not the runtime environment)
    #[serde(default = "default_baseline_environment")]
    pub environment: String,

    #[serde(default = "default_profile")]
    pub profile: String,

    /// Strategy id used when deploying a published version
    #[serde(default = "default_deployment_strategy")]
    pub deployment_strategy: String,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_min_poll_interval")]
    pub min_poll_interval_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_baseline_endpoint() -> String {
    baseline::DEFAULT_ENDPOINT.to_string()
}

fn default_application() -> String {
    baseline::DEFAULT_APPLICATION.to_string()
}

fn default_baseline_environment() -> String {
    baseline::DEFAULT_ENVIRONMENT.to_string()
}

fn default_profile() -> String {
    baseline::DEFAULT_PROFILE.to_string()
}

fn default_deployment_strategy() -> String {
    baseline::DEFAULT_DEPLOYMENT_STRATEGY.to_string()
}

fn default_cache_ttl() -> u64 {
    baseline::CACHE_TTL_SECS
}

fn default_min_poll_interval() -> u64 {
    baseline::MIN_POLL_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    baseline::REQUEST_TIMEOUT_MS
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_baseline_endpoint(),
            application: default_application(),
            environment: default_baseline_environment(),
            profile: default_profile(),
            deployment_strategy: default_deployment_strategy(),
            cache_ttl_secs: default_cache_ttl(),
            min_poll_interval_secs: default_min_poll_interval(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

impl BaselineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn min_poll_interval(&self) -> Duration {
        Duration::from_secs(self.min_poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Which override store backs the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Scylla,
}

/// Override store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    #[serde(default = "default_scylla_hosts")]
    pub scylla_hosts: Vec<String>,

    #[serde(default = "default_scylla_keyspace")]
    pub keyspace: String,

    #[serde(default = "default_replication_factor")]
    pub replication_factor: u8,
}

fn default_scylla_hosts() -> Vec<String> {
    std::env::var("SCYLLA_HOSTS")
        .map(|s| s.split(',').map(|h| h.trim().to_string()).collect())
        .unwrap_or_else(|_| vec![persistence::DEFAULT_SCYLLA_HOST.to_string()])
}

fn default_scylla_keyspace() -> String {
    std::env::var("SCYLLA_KEYSPACE").unwrap_or_else(|_| persistence::DEFAULT_KEYSPACE.to_string())
}

fn default_replication_factor() -> u8 {
    persistence::DEFAULT_REPLICATION_FACTOR
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            scylla_hosts: default_scylla_hosts(),
            keyspace: default_scylla_keyspace(),
            replication_factor: default_replication_factor(),
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_baseline()?;
        self.validate_persistence()?;
        Ok(())
    }

    fn validate_baseline(&self) -> Result<(), ConfigError> {
        let baseline = &self.baseline;
        if !baseline.enabled {
            if self.environment.is_strict() {
                tracing::warn!("Remote baseline disabled in a strict environment");
            }
            return Ok(());
        }

        if baseline.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "baseline.endpoint".to_string(),
                message: "Endpoint must be set when the baseline is enabled".to_string(),
            });
        }

        for (field, value) in [
            ("baseline.application", &baseline.application),
            ("baseline.environment", &baseline.environment),
            ("baseline.profile", &baseline.profile),
            ("baseline.deployment_strategy", &baseline.deployment_strategy),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField(field.to_string()));
            }
        }

        if baseline.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "baseline.request_timeout_ms".to_string(),
                message: "Timeout must be at least 1ms".to_string(),
            });
        }

        if baseline.cache_ttl_secs < baseline.min_poll_interval_secs {
            tracing::warn!(
                cache_ttl_secs = baseline.cache_ttl_secs,
                min_poll_interval_secs = baseline.min_poll_interval_secs,
                "Cache TTL shorter than the minimum poll interval, the poll interval wins"
            );
        }

        Ok(())
    }

    fn validate_persistence(&self) -> Result<(), ConfigError> {
        let persistence = &self.persistence;
        if persistence.backend != StoreBackend::Scylla {
            if self.environment.is_production() {
                return Err(ConfigError::InvalidValue {
                    field: "persistence.backend".to_string(),
                    message: "In-memory override store is not allowed in production".to_string(),
                });
            }
            return Ok(());
        }

        if persistence.scylla_hosts.is_empty() {
            return Err(ConfigError::MissingField("persistence.scylla_hosts".to_string()));
        }

        if persistence.keyspace.trim().is_empty() {
            return Err(ConfigError::MissingField("persistence.keyspace".to_string()));
        }

        if persistence.replication_factor == 0 {
            return Err(ConfigError::InvalidValue {
                field: "persistence.replication_factor".to_string(),
                message: "Must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority (highest to lowest):
/// 1. Environment variables (CONFIG_ENGINE__ prefix, `__` separator)
/// 2. config/{env}.yaml (if env specified)
/// 3. config/default.yaml
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings with an explicit configuration directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    let default_path = dir.join("default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    if let Some(env_name) = env {
        let env_path = dir.join(env_name);
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        environment = ?settings.environment,
        store = ?settings.persistence.backend,
        baseline_enabled = settings.baseline.enabled,
        "Settings loaded"
    );

    Ok(settings)
}
