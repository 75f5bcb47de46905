//! Baseline client
//!
//! `fetch_baseline` always yields a map: a fresh cached one, a newly polled
//! one, or on failure the last good one (empty when nothing was ever
//! fetched). Failures are logged and counted, never returned.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

use config_engine_core::Registry;

use crate::source::parse_content;
use crate::{BaselineCache, BaselineError, BaselineMap, BaselineSource};

/// Anything that can supply the current baseline map
#[async_trait]
pub trait BaselineProvider: Send + Sync {
    async fn fetch_baseline(&self) -> Arc<BaselineMap>;
}

/// Fixed baseline, for tests and for running without a remote
#[derive(Debug, Clone, Default)]
pub struct StaticBaseline {
    values: Arc<BaselineMap>,
}

impl StaticBaseline {
    pub fn new(values: BaselineMap) -> Self {
        Self {
            values: Arc::new(values),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaselineProvider for StaticBaseline {
    async fn fetch_baseline(&self) -> Arc<BaselineMap> {
        Arc::clone(&self.values)
    }
}

/// Cached client over a remote baseline source
pub struct BaselineClient {
    pub(crate) source: Arc<dyn BaselineSource>,
    pub(crate) cache: Arc<BaselineCache>,
    pub(crate) registry: Arc<Registry>,
    ttl: Duration,
    enabled: bool,
}

impl BaselineClient {
    /// Client sharing the process-wide cache
    pub fn new(source: Arc<dyn BaselineSource>, registry: Arc<Registry>) -> Self {
        Self {
            source,
            cache: BaselineCache::global(),
            registry,
            ttl: Duration::from_secs(60),
            enabled: true,
        }
    }

    pub fn with_cache(mut self, cache: Arc<BaselineCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// A disabled client always serves an empty baseline and refuses to publish
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cache(&self) -> &Arc<BaselineCache> {
        &self.cache
    }

    /// Expire the shared cache so the next fetch polls the remote
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    /// Current baseline map; never fails
    pub async fn fetch_baseline(&self) -> Arc<BaselineMap> {
        if !self.enabled {
            return Arc::default();
        }

        if let Some(values) = self.cache.fresh(Instant::now()) {
            metrics::counter!("config_engine_baseline_fetch_total", "outcome" => "cached")
                .increment(1);
            return values;
        }

        match self.refresh().await {
            Ok(values) => {
                metrics::counter!("config_engine_baseline_fetch_total", "outcome" => "refreshed")
                    .increment(1);
                values
            }
            Err(e) => {
                metrics::counter!("config_engine_baseline_fetch_total", "outcome" => "fallback")
                    .increment(1);
                let fallback = self.cache.last_good().unwrap_or_default();
                tracing::warn!(
                    error = %e,
                    cached_keys = fallback.len(),
                    "Baseline fetch failed, serving last cached baseline"
                );
                fallback
            }
        }
    }

    async fn refresh(&self) -> Result<Arc<BaselineMap>, BaselineError> {
        let latest = match self.cache.token() {
            Some(token) => match self.source.get_latest(&token).await {
                Err(BaselineError::SessionExpired) => {
                    tracing::debug!("Baseline session expired, starting a new one");
                    self.cache.clear_token();
                    let token = self.source.start_session().await?;
                    self.source.get_latest(&token).await?
                }
                other => other?,
            },
            None => {
                let token = self.source.start_session().await?;
                self.source.get_latest(&token).await?
            }
        };

        let values = match &latest.content {
            Some(content) => Some(self.known_keys(parse_content(content)?)),
            None => None,
        };
        let changed = values.is_some();

        let expires_at = Instant::now() + self.ttl.max(latest.poll_interval);
        let values = self.cache.store(values, latest.next_token, expires_at);

        tracing::debug!(
            keys = values.len(),
            changed,
            poll_interval_secs = latest.poll_interval.as_secs(),
            "Baseline refreshed"
        );
        Ok(values)
    }

    fn known_keys(&self, values: BaselineMap) -> BaselineMap {
        values
            .into_iter()
            .filter(|(key, _)| {
                let known = self.registry.contains(key);
                if !known {
                    tracing::warn!(key = %key, "Ignoring unregistered key in baseline");
                }
                known
            })
            .collect()
    }
}

#[async_trait]
impl BaselineProvider for BaselineClient {
    async fn fetch_baseline(&self) -> Arc<BaselineMap> {
        BaselineClient::fetch_baseline(self).await
    }
}
