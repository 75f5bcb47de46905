//! Validated override writes
//!
//! Writes go through the registry: the key must exist and be enabled at
//! the target scope, the value must coerce, and numbers are clamped into
//! the range resolved for the same context.

use std::sync::Arc;

use config_engine_core::{clamp, coerce, resolve_range, ConfigValue, ResolveContext, ScopeKind, ScopeRef};
use config_engine_persistence::OverrideRecord;

use crate::{ResolveError, SnapshotResolver};

pub struct OverrideService {
    resolver: Arc<SnapshotResolver>,
}

impl OverrideService {
    pub fn new(resolver: Arc<SnapshotResolver>) -> Self {
        Self { resolver }
    }

    /// Validate, coerce and store an override at `scope` for `ctx`.
    ///
    /// Returns the record as written.
    pub async fn set_override(
        &self,
        ctx: &ResolveContext,
        scope: ScopeKind,
        key: &str,
        raw: serde_json::Value,
        updated_by: Option<&str>,
    ) -> Result<OverrideRecord, ResolveError> {
        let registry = self.resolver.registry();
        let entry = registry
            .get(key)
            .ok_or_else(|| ResolveError::UnknownKey(key.to_string()))?;
        if !entry.is_enabled_at(scope) {
            return Err(ResolveError::ScopeNotEnabled {
                key: key.to_string(),
                scope,
            });
        }
        let target = ScopeRef::for_context(scope, ctx)?;

        let value = coerce(entry, &raw)
            .value
            .ok_or_else(|| ResolveError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                expected: entry.value_type.name(),
            })?;

        let value = match value {
            ConfigValue::Number(n) if entry.number_bounds().is_some() => {
                let snapshot = self.resolver.resolve_snapshot(ctx).await?;
                let range = resolve_range(entry, &snapshot);
                if !range.is_valid() {
                    return Err(ResolveError::InvalidBounds {
                        key: key.to_string(),
                        keys: range.invalid_keys,
                    });
                }
                let clamped = clamp(n, &range);
                if clamped != n {
                    tracing::debug!(key = %key, requested = n, clamped, "Override clamped into range");
                }
                ConfigValue::Number(clamped)
            }
            other => other,
        };

        let mut record = OverrideRecord::new(target.scope_id(), key, value.to_json());
        if let Some(user) = updated_by {
            record = record.with_updated_by(user);
        }
        self.resolver.store().write(&record).await?;

        tracing::info!(
            scope_id = %record.scope_id,
            key = %key,
            value = %value,
            backend = self.resolver.store().backend(),
            "Override set"
        );
        Ok(record)
    }

    /// Remove the override for `key` at `scope`; removing nothing is fine
    pub async fn clear_override(
        &self,
        ctx: &ResolveContext,
        scope: ScopeKind,
        key: &str,
    ) -> Result<(), ResolveError> {
        if !self.resolver.registry().contains(key) {
            return Err(ResolveError::UnknownKey(key.to_string()));
        }
        let target = ScopeRef::for_context(scope, ctx)?;
        self.resolver
            .store()
            .remove(&target.scope_id(), key)
            .await?;

        tracing::info!(scope_id = %target, key = %key, "Override cleared");
        Ok(())
    }

    /// Every override stored at `scope` for `ctx`
    pub async fn list_overrides(
        &self,
        ctx: &ResolveContext,
        scope: ScopeKind,
    ) -> Result<Vec<OverrideRecord>, ResolveError> {
        let target = ScopeRef::for_context(scope, ctx)?;
        Ok(self.resolver.store().list_by_scope(&target.scope_id()).await?)
    }
}
