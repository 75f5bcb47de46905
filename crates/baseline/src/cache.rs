//! Process-wide baseline cache
//!
//! Holds the last good map, the next poll token and an expiry instant.
//! The lock only guards field reads and swaps; it is never held across a
//! fetch, so concurrent cache misses each refresh on their own and the
//! last writer wins.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

use crate::BaselineMap;

static GLOBAL: Lazy<Arc<BaselineCache>> = Lazy::new(|| Arc::new(BaselineCache::new()));

#[derive(Default)]
struct CacheState {
    values: Option<Arc<BaselineMap>>,
    token: Option<String>,
    expires_at: Option<Instant>,
}

#[derive(Default)]
pub struct BaselineCache {
    state: RwLock<CacheState>,
}

impl BaselineCache {
    /// A private cache, e.g. for tests
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every client in the process
    pub fn global() -> Arc<BaselineCache> {
        Arc::clone(&GLOBAL)
    }

    /// Cached map if it has not expired at `now`
    pub fn fresh(&self, now: Instant) -> Option<Arc<BaselineMap>> {
        let state = self.state.read();
        match (&state.values, state.expires_at) {
            (Some(values), Some(expires_at)) if now < expires_at => Some(Arc::clone(values)),
            _ => None,
        }
    }

    /// Last successfully fetched map, regardless of expiry
    pub fn last_good(&self) -> Option<Arc<BaselineMap>> {
        self.state.read().values.clone()
    }

    /// Token for the next poll of the current session
    pub fn token(&self) -> Option<String> {
        self.state.read().token.clone()
    }

    /// Record a successful poll.
    ///
    /// `values` is `None` when the remote reported no change; the previous
    /// map is kept (or an empty map is cached if nothing was cached yet).
    pub fn store(
        &self,
        values: Option<BaselineMap>,
        token: String,
        expires_at: Instant,
    ) -> Arc<BaselineMap> {
        let mut state = self.state.write();
        let values = match values {
            Some(values) => Arc::new(values),
            None => state.values.clone().unwrap_or_default(),
        };
        state.values = Some(Arc::clone(&values));
        state.token = Some(token);
        state.expires_at = Some(expires_at);
        values
    }

    /// Drop the poll token so the next refresh opens a new session
    pub fn clear_token(&self) {
        self.state.write().token = None;
    }

    /// Expire the cache now; the last good map stays available as fallback
    pub fn invalidate(&self) {
        self.state.write().expires_at = None;
    }

    /// Forget everything: map, token and expiry
    pub fn reset(&self) {
        *self.state.write() = CacheState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn map(key: &str, value: serde_json::Value) -> BaselineMap {
        [(key.to_string(), value)].into_iter().collect()
    }

    #[test]
    fn test_fresh_until_expiry() {
        let cache = BaselineCache::new();
        let now = Instant::now();
        assert!(cache.fresh(now).is_none());

        cache.store(Some(map("a", json!(1))), "t1".into(), now + Duration::from_secs(60));
        assert!(cache.fresh(now).is_some());
        assert!(cache.fresh(now + Duration::from_secs(61)).is_none());
        assert_eq!(cache.token().as_deref(), Some("t1"));
    }

    #[test]
    fn test_unchanged_poll_keeps_values() {
        let cache = BaselineCache::new();
        let now = Instant::now();
        cache.store(Some(map("a", json!(1))), "t1".into(), now);
        let kept = cache.store(None, "t2".into(), now + Duration::from_secs(5));
        assert_eq!(kept.get("a"), Some(&json!(1)));
        assert_eq!(cache.token().as_deref(), Some("t2"));
    }

    #[test]
    fn test_invalidate_and_reset() {
        let cache = BaselineCache::new();
        let now = Instant::now();
        cache.store(Some(map("a", json!(1))), "t1".into(), now + Duration::from_secs(60));

        cache.invalidate();
        assert!(cache.fresh(now).is_none());
        assert!(cache.last_good().is_some());
        assert!(cache.token().is_some());

        cache.reset();
        assert!(cache.last_good().is_none());
        assert!(cache.token().is_none());
    }
}
