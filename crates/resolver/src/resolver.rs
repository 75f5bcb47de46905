//! Snapshot resolution
//!
//! For every registered key, layers are applied in fixed precedence order
//! and a later layer replaces value and source outright:
//!
//! static default < baseline < global < server < channel < user < meeting
//!
//! The winning raw value is coerced against the registry; an invalid value
//! reverts to the static default. Gating runs as a second pass once every
//! key is resolved, so the experimental flag it reads went through the
//! same chain as everything else.

use futures::future::try_join_all;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use config_engine_baseline::{BaselineMap, BaselineProvider};
use config_engine_core::{
    coerce, resolve_scope, ConfigEntry, ConfigValue, Registry, ResolveContext, ScopeKind,
    ScopeRef, EXPERIMENTAL_FLAG_KEY,
};
use config_engine_persistence::{OverrideRecord, OverrideStore};

use crate::{ResolveError, ResolvedValue, Snapshot, ValueSource};

/// Overrides held by one addressed scope
struct ScopeLayer {
    kind: ScopeKind,
    records: HashMap<String, serde_json::Value>,
}

impl ScopeLayer {
    fn new(kind: ScopeKind, records: Vec<OverrideRecord>) -> Self {
        Self {
            kind,
            records: records
                .into_iter()
                .map(|r| (r.config_key, r.value))
                .collect(),
        }
    }
}

/// Composes registry, baseline and override store into snapshots
#[derive(Clone)]
pub struct SnapshotResolver {
    registry: Arc<Registry>,
    store: Arc<dyn OverrideStore>,
    baseline: Arc<dyn BaselineProvider>,
}

impl SnapshotResolver {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn OverrideStore>,
        baseline: Arc<dyn BaselineProvider>,
    ) -> Self {
        Self {
            registry,
            store,
            baseline,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn store(&self) -> &Arc<dyn OverrideStore> {
        &self.store
    }

    /// Resolve every registered key for `ctx`
    pub async fn resolve_snapshot(&self, ctx: &ResolveContext) -> Result<Snapshot, ResolveError> {
        let chain = ScopeRef::chain_for(ctx);

        let reads = chain.iter().map(|scope| {
            let scope_id = scope.scope_id();
            let kind = scope.kind();
            async move {
                let records = self.store.list_by_scope(&scope_id).await?;
                Ok::<_, ResolveError>(ScopeLayer::new(kind, records))
            }
        });
        let (baseline, layers) = futures::join!(self.baseline.fetch_baseline(), try_join_all(reads));
        let layers = layers?;

        let mut values = BTreeMap::new();
        let mut overridden = HashSet::new();
        for entry in self.registry.iter() {
            let (resolved, has_override) = resolve_entry(entry, &baseline, &layers);
            if has_override {
                overridden.insert(entry.key.as_str());
            }
            values.insert(entry.key.clone(), resolved);
        }

        if let Some(enabled) = ctx.experimental {
            if let Some(flag) = values.get_mut(EXPERIMENTAL_FLAG_KEY) {
                flag.value = Some(ConfigValue::Bool(enabled));
                flag.source = ValueSource::Experimental;
            }
        }

        let experimental_enabled = values
            .get(EXPERIMENTAL_FLAG_KEY)
            .and_then(|v| v.value.as_ref())
            .and_then(ConfigValue::as_bool)
            .unwrap_or(false);
        let tier = ctx.effective_tier();

        let mut gated = 0usize;
        for entry in self.registry.iter() {
            let blocked_by_flag = entry.requires_experimental_tag && !experimental_enabled;
            let blocked_by_tier = !tier.satisfies(entry.min_tier);
            if !(blocked_by_flag || blocked_by_tier) {
                continue;
            }
            if let Some(resolved) = values.get_mut(&entry.key) {
                resolved.value = entry.default_value.clone();
                resolved.source = ValueSource::Gated;
                resolved.gated = true;
                gated += 1;
            }
        }

        let chain_kinds: Vec<ScopeKind> = chain.iter().map(ScopeRef::kind).collect();
        let missing_required: Vec<String> = self
            .registry
            .iter()
            .filter(|entry| {
                entry.default_value.is_none()
                    && !overridden.contains(entry.key.as_str())
                    && chain_kinds.iter().any(|kind| {
                        let scope = resolve_scope(entry, *kind);
                        scope.enabled && scope.required
                    })
            })
            .map(|entry| entry.key.clone())
            .collect();

        metrics::counter!("config_engine_snapshots_resolved_total").increment(1);
        metrics::counter!("config_engine_gated_values_total").increment(gated as u64);
        tracing::debug!(
            scopes = chain.len(),
            keys = values.len(),
            gated,
            tier = %tier,
            experimental_enabled,
            missing_required = missing_required.len(),
            "Snapshot resolved"
        );

        Ok(Snapshot::new(values, experimental_enabled, tier, missing_required))
    }

    /// Global-level values of every globally configurable key, for admin listings.
    ///
    /// Only default, baseline and global override layers apply; no gating.
    pub async fn resolve_global_values(&self) -> Result<Vec<ResolvedValue>, ResolveError> {
        let global_scope_id = ScopeRef::Global.scope_id();
        let (baseline, records) = futures::join!(
            self.baseline.fetch_baseline(),
            self.store.list_by_scope(&global_scope_id)
        );
        let layers = [ScopeLayer::new(ScopeKind::Global, records?)];

        Ok(self
            .registry
            .iter()
            .filter(|entry| entry.is_enabled_at(ScopeKind::Global))
            .map(|entry| resolve_entry(entry, &baseline, &layers).0)
            .collect())
    }
}

/// Run one entry through the precedence chain.
///
/// Returns the resolved value and whether a scope override supplied it.
/// An override that fails coercion does not count.
fn resolve_entry(
    entry: &ConfigEntry,
    baseline: &BaselineMap,
    layers: &[ScopeLayer],
) -> (ResolvedValue, bool) {
    let mut chosen: Option<(&serde_json::Value, ValueSource)> = baseline
        .get(&entry.key)
        .map(|raw| (raw, ValueSource::Baseline));
    for layer in layers {
        if !entry.is_enabled_at(layer.kind) {
            continue;
        }
        if let Some(raw) = layer.records.get(&entry.key) {
            chosen = Some((raw, layer.kind.into()));
        }
    }

    let resolved = match chosen {
        None => ResolvedValue::new(&entry.key, entry.default_value.clone(), ValueSource::Default),
        Some((raw, source)) => match coerce(entry, raw).value {
            Some(value) => ResolvedValue::new(&entry.key, Some(value), source),
            None => {
                tracing::debug!(
                    key = %entry.key,
                    source = %source,
                    raw = %raw,
                    "Invalid value, falling back to default"
                );
                ResolvedValue::new(&entry.key, entry.default_value.clone(), ValueSource::Default)
            }
        },
    };

    let has_override = resolved.source.is_override();
    (resolved, has_override)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_engine_baseline::StaticBaseline;
    use config_engine_core::{Control, Role, ScopeConfig};
    use config_engine_persistence::InMemoryOverrideStore;
    use serde_json::json;

    fn entry_everywhere(key: &str) -> ConfigEntry {
        let mut entry = ConfigEntry::string(key, "d");
        for kind in ScopeKind::PRECEDENCE {
            entry = entry.scope(kind, ScopeConfig::enabled(Role::Admin, Control::Text));
        }
        entry
    }

    fn layer(kind: ScopeKind, key: &str, value: serde_json::Value) -> ScopeLayer {
        ScopeLayer::new(kind, vec![OverrideRecord::new("x", key, value)])
    }

    #[test]
    fn test_later_layer_wins() {
        let entry = entry_everywhere("k");
        let baseline: BaselineMap = [("k".to_string(), json!("b"))].into_iter().collect();
        let layers = [
            layer(ScopeKind::Global, "k", json!("g")),
            layer(ScopeKind::Channel, "k", json!("c")),
        ];
        let (resolved, overridden) = resolve_entry(&entry, &baseline, &layers);
        assert_eq!(resolved.value, Some(ConfigValue::String("c".into())));
        assert_eq!(resolved.source, ValueSource::Channel);
        assert!(overridden);

        let (resolved, overridden) = resolve_entry(&entry, &baseline, &[]);
        assert_eq!(resolved.source, ValueSource::Baseline);
        assert!(!overridden);
    }

    #[test]
    fn test_disabled_scope_ignored() {
        let entry = ConfigEntry::boolean("b", true);
        let layers = [layer(ScopeKind::Server, "b", json!(false))];
        let (resolved, _) = resolve_entry(&entry, &BaselineMap::new(), &layers);
        assert_eq!(resolved.value, Some(ConfigValue::Bool(true)));
        assert_eq!(resolved.source, ValueSource::Default);
    }

    #[test]
    fn test_invalid_value_reverts_to_default() {
        let entry = entry_everywhere("k");
        let layers = [layer(ScopeKind::User, "k", json!(42))];
        let (resolved, _) = resolve_entry(&entry, &BaselineMap::new(), &layers);
        assert_eq!(resolved.value, Some(ConfigValue::String("d".into())));
        assert_eq!(resolved.source, ValueSource::Default);
    }

    #[tokio::test]
    async fn test_global_values_listing() {
        let registry = Arc::new(Registry::builtin().clone());
        let store = Arc::new(InMemoryOverrideStore::with_records([OverrideRecord::new(
            "global#default",
            "notes.enabled",
            json!(false),
        )]));
        let baseline = StaticBaseline::new(
            [("transcription.language".to_string(), json!("fr"))]
                .into_iter()
                .collect(),
        );
        let resolver = SnapshotResolver::new(registry.clone(), store, Arc::new(baseline));

        let values = resolver.resolve_global_values().await.unwrap();
        assert!(values.iter().all(|v| !v.gated));
        assert!(values.iter().all(|v| registry
            .get(&v.key)
            .is_some_and(|e| e.is_enabled_at(ScopeKind::Global))));

        let find = |key: &str| values.iter().find(|v| v.key == key).cloned().unwrap();
        assert_eq!(find("notes.enabled").source, ValueSource::Global);
        assert_eq!(find("transcription.language").source, ValueSource::Baseline);
        assert_eq!(find("features.experimental").source, ValueSource::Default);
        assert!(values.iter().all(|v| v.key != "ask.enabled"));
    }
}
