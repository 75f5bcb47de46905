//! Centralized defaults for engine settings
//!
//! Values shared by settings defaults and the collaborator clients.

/// Remote baseline defaults
pub mod baseline {
    /// Local cache TTL when the remote does not ask for a longer poll interval
    pub const CACHE_TTL_SECS: u64 = 60;

    /// Lower bound on the poll interval requested from the remote
    pub const MIN_POLL_INTERVAL_SECS: u64 = 15;

    pub const REQUEST_TIMEOUT_MS: u64 = 5_000;

    pub const DEFAULT_ENDPOINT: &str = "http://localhost:2772";
    pub const DEFAULT_APPLICATION: &str = "config-engine";
    pub const DEFAULT_ENVIRONMENT: &str = "development";
    pub const DEFAULT_PROFILE: &str = "baseline";
    pub const DEFAULT_DEPLOYMENT_STRATEGY: &str = "AllAtOnce";
}

/// Override store defaults
pub mod persistence {
    pub const DEFAULT_SCYLLA_HOST: &str = "127.0.0.1:9042";
    pub const DEFAULT_KEYSPACE: &str = "config_engine";
    pub const DEFAULT_REPLICATION_FACTOR: u8 = 1;
}

/// Environment variable prefix for settings overrides
pub const ENV_PREFIX: &str = "CONFIG_ENGINE";
