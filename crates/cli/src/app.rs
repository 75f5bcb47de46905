//! Engine wiring from settings

use anyhow::{Context, Result};
use std::sync::Arc;

use config_engine_baseline::{BaselineClient, HttpBaselineSource, HttpSourceConfig};
use config_engine_config::{PersistenceConfig, Settings, StoreBackend};
use config_engine_core::Registry;
use config_engine_persistence::{InMemoryOverrideStore, OverrideStore, ScyllaConfig};
use config_engine_resolver::{OverrideService, SnapshotResolver};

/// Collaborators shared by every command
pub struct Engine {
    pub baseline: Arc<BaselineClient>,
    pub resolver: Arc<SnapshotResolver>,
    pub overrides: OverrideService,
}

impl Engine {
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let registry = Arc::new(Registry::builtin().clone());
        let store = build_store(settings).await?;

        let source = HttpBaselineSource::new(HttpSourceConfig {
            endpoint: settings.baseline.endpoint.clone(),
            application: settings.baseline.application.clone(),
            environment: settings.baseline.environment.clone(),
            profile: settings.baseline.profile.clone(),
            deployment_strategy: settings.baseline.deployment_strategy.clone(),
            min_poll_interval: settings.baseline.min_poll_interval(),
            timeout: settings.baseline.request_timeout(),
        })
        .context("Failed to create baseline source")?;

        let baseline = Arc::new(
            BaselineClient::new(Arc::new(source), registry.clone())
                .with_ttl(settings.baseline.cache_ttl())
                .with_enabled(settings.baseline.enabled),
        );

        let resolver = Arc::new(SnapshotResolver::new(registry, store, baseline.clone()));
        let overrides = OverrideService::new(resolver.clone());

        Ok(Self {
            baseline,
            resolver,
            overrides,
        })
    }
}

async fn build_store(settings: &Settings) -> Result<Arc<dyn OverrideStore>> {
    match settings.persistence.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory override store");
            Ok(Arc::new(InMemoryOverrideStore::new()))
        }
        StoreBackend::Scylla => {
            let store = config_engine_persistence::init(scylla_config(&settings.persistence))
                .await
                .context("Failed to initialize ScyllaDB override store")?;
            tracing::info!("Using ScyllaDB override store");
            Ok(Arc::new(store))
        }
    }
}

/// ScyllaDB connection settings, taken from the persistence section only
fn scylla_config(persistence: &PersistenceConfig) -> ScyllaConfig {
    ScyllaConfig {
        hosts: persistence.scylla_hosts.clone(),
        keyspace: persistence.keyspace.clone(),
        replication_factor: persistence.replication_factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_engine_core::ResolveContext;

    #[tokio::test]
    async fn test_engine_from_default_settings() {
        let mut settings = Settings::default();
        settings.baseline.enabled = false;

        let engine = Engine::from_settings(&settings).await.unwrap();
        assert!(!engine.baseline.is_enabled());

        let snapshot = engine
            .resolver
            .resolve_snapshot(&ResolveContext::new())
            .await
            .unwrap();
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_scylla_config_from_settings() {
        let mut persistence = PersistenceConfig::default();
        persistence.scylla_hosts = vec!["10.0.0.1:9042".to_string(), "10.0.0.2:9042".to_string()];
        persistence.keyspace = "overrides_prod".to_string();
        persistence.replication_factor = 3;

        let config = scylla_config(&persistence);
        assert_eq!(config.hosts, persistence.scylla_hosts);
        assert_eq!(config.keyspace, "overrides_prod");
        assert_eq!(config.replication_factor, 3);
    }
}
