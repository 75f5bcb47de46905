//! Integration tests for snapshot resolution
//!
//! Resolver, in-memory override store and baselines wired together the way
//! the binary wires them.

use serde_json::json;
use std::sync::Arc;

use config_engine_baseline::{
    BaselineCache, BaselineClient, BaselineMap, InMemoryBaselineSource, StaticBaseline,
};
use config_engine_core::{
    ConfigEntry, ConfigValue, Control, Registry, ResolveContext, Role, ScopeConfig, ScopeKind,
    Tier, EXPERIMENTAL_FLAG_KEY,
};
use config_engine_persistence::{InMemoryOverrideStore, OverrideRecord, OverrideStore};
use config_engine_resolver::{SnapshotResolver, ValueSource};

fn everywhere(mut entry: ConfigEntry) -> ConfigEntry {
    for kind in ScopeKind::PRECEDENCE {
        entry = entry.scope(kind, ScopeConfig::enabled(Role::Admin, Control::Text));
    }
    entry
}

fn test_registry() -> Arc<Registry> {
    Arc::new(
        Registry::new(vec![
            everywhere(ConfigEntry::boolean(EXPERIMENTAL_FLAG_KEY, false)),
            everywhere(ConfigEntry::string("greeting", "hello")),
            everywhere(ConfigEntry::boolean("beta.feature", false).experimental()),
            everywhere(ConfigEntry::boolean("pro.feature", false).min_tier(Tier::Pro)),
        ])
        .unwrap(),
    )
}

fn baseline(pairs: &[(&str, serde_json::Value)]) -> Arc<StaticBaseline> {
    let values: BaselineMap = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Arc::new(StaticBaseline::new(values))
}

fn setup(
    registry: Arc<Registry>,
    records: Vec<OverrideRecord>,
    baseline: Arc<StaticBaseline>,
) -> (SnapshotResolver, Arc<InMemoryOverrideStore>) {
    let store = Arc::new(InMemoryOverrideStore::with_records(records));
    (SnapshotResolver::new(registry, store.clone(), baseline), store)
}

fn full_context() -> ResolveContext {
    ResolveContext::new()
        .with_guild("g1")
        .with_channel("c1")
        .with_user("u1")
        .with_meeting("m1")
}

#[tokio::test]
async fn test_most_specific_scope_wins() {
    let (resolver, _) = setup(
        test_registry(),
        vec![
            OverrideRecord::new("server#g1", "greeting", json!("A")),
            OverrideRecord::new("channel#g1#c1", "greeting", json!("B")),
            OverrideRecord::new("user#g1#u1", "greeting", json!("C")),
        ],
        baseline(&[]),
    );

    let ctx = ResolveContext::new()
        .with_guild("g1")
        .with_channel("c1")
        .with_user("u1");
    let snapshot = resolver.resolve_snapshot(&ctx).await.unwrap();
    assert_eq!(snapshot.string("greeting"), Some("C"));
    assert_eq!(snapshot.source("greeting"), Some(ValueSource::User));
}

#[tokio::test]
async fn test_full_precedence_chain() {
    let registry = test_registry();
    let records = vec![
        OverrideRecord::new("global#default", "greeting", json!("global")),
        OverrideRecord::new("user#g1#u1", "greeting", json!("user")),
        OverrideRecord::new("meeting#m1", "greeting", json!("meeting")),
    ];

    let (resolver, _) = setup(registry.clone(), vec![], baseline(&[]));
    let snapshot = resolver.resolve_snapshot(&full_context()).await.unwrap();
    assert_eq!(snapshot.source("greeting"), Some(ValueSource::Default));
    assert_eq!(snapshot.string("greeting"), Some("hello"));

    let (resolver, _) = setup(registry.clone(), vec![], baseline(&[("greeting", json!("base"))]));
    let snapshot = resolver.resolve_snapshot(&full_context()).await.unwrap();
    assert_eq!(snapshot.source("greeting"), Some(ValueSource::Baseline));

    let (resolver, _) = setup(registry.clone(), records[..1].to_vec(), baseline(&[("greeting", json!("base"))]));
    let snapshot = resolver.resolve_snapshot(&full_context()).await.unwrap();
    assert_eq!(snapshot.string("greeting"), Some("global"));

    let (resolver, _) = setup(registry, records, baseline(&[]));
    let snapshot = resolver.resolve_snapshot(&full_context()).await.unwrap();
    assert_eq!(snapshot.string("greeting"), Some("meeting"));
    assert_eq!(snapshot.source("greeting"), Some(ValueSource::Meeting));

    // without a meeting id the meeting layer is not addressed
    let ctx = ResolveContext::new().with_guild("g1").with_user("u1");
    let snapshot = resolver.resolve_snapshot(&ctx).await.unwrap();
    assert_eq!(snapshot.source("greeting"), Some(ValueSource::User));
}

#[tokio::test]
async fn test_invalid_override_falls_back_to_default() {
    let (resolver, _) = setup(
        test_registry(),
        vec![
            OverrideRecord::new("global#default", "greeting", json!("global")),
            OverrideRecord::new("server#g1", "greeting", json!(7)),
        ],
        baseline(&[]),
    );
    let snapshot = resolver
        .resolve_snapshot(&ResolveContext::new().with_guild("g1"))
        .await
        .unwrap();
    assert_eq!(snapshot.string("greeting"), Some("hello"));
    assert_eq!(snapshot.source("greeting"), Some(ValueSource::Default));
}

#[tokio::test]
async fn test_experimental_gate_uses_resolved_flag() {
    let overridden = OverrideRecord::new("server#g1", "beta.feature", json!(true));
    let ctx = ResolveContext::new().with_guild("g1").with_tier(Tier::Pro);

    let (resolver, store) = setup(test_registry(), vec![overridden], baseline(&[]));
    let snapshot = resolver.resolve_snapshot(&ctx).await.unwrap();
    assert!(!snapshot.experimental_enabled());
    assert_eq!(snapshot.bool("beta.feature"), Some(false));
    assert_eq!(snapshot.source("beta.feature"), Some(ValueSource::Gated));
    assert!(snapshot.is_gated("beta.feature"));

    // the flag resolves through the same chain as any other key
    store
        .write(&OverrideRecord::new("channel#g1#c1", EXPERIMENTAL_FLAG_KEY, json!("true")))
        .await
        .unwrap();
    let snapshot = resolver
        .resolve_snapshot(&ctx.clone().with_channel("c1"))
        .await
        .unwrap();
    assert!(snapshot.experimental_enabled());
    assert_eq!(snapshot.bool("beta.feature"), Some(true));
    assert_eq!(snapshot.source("beta.feature"), Some(ValueSource::Server));

    // other guilds stay gated
    let snapshot = resolver
        .resolve_snapshot(&ResolveContext::new().with_guild("g2").with_channel("c1"))
        .await
        .unwrap();
    assert!(snapshot.is_gated("beta.feature"));
}

#[tokio::test]
async fn test_experimental_entitlement_from_context() {
    let (resolver, _) = setup(
        test_registry(),
        vec![
            OverrideRecord::new("global#default", EXPERIMENTAL_FLAG_KEY, json!(true)),
            OverrideRecord::new("global#default", "beta.feature", json!(true)),
        ],
        baseline(&[]),
    );

    let snapshot = resolver
        .resolve_snapshot(&ResolveContext::new().with_experimental(false))
        .await
        .unwrap();
    assert_eq!(snapshot.source(EXPERIMENTAL_FLAG_KEY), Some(ValueSource::Experimental));
    assert!(!snapshot.experimental_enabled());
    assert!(snapshot.is_gated("beta.feature"));

    let snapshot = resolver.resolve_snapshot(&ResolveContext::new()).await.unwrap();
    assert!(snapshot.experimental_enabled());
    assert_eq!(snapshot.source("beta.feature"), Some(ValueSource::Global));
}

#[tokio::test]
async fn test_tier_gate() {
    let (resolver, _) = setup(
        test_registry(),
        vec![OverrideRecord::new("server#g1", "pro.feature", json!(true))],
        baseline(&[("pro.feature", json!(true))]),
    );

    for ctx in [
        ResolveContext::new().with_guild("g1").with_tier(Tier::Basic),
        ResolveContext::new().with_guild("g1"),
    ] {
        let snapshot = resolver.resolve_snapshot(&ctx).await.unwrap();
        assert_eq!(snapshot.bool("pro.feature"), Some(false));
        assert_eq!(snapshot.source("pro.feature"), Some(ValueSource::Gated));
    }

    let snapshot = resolver
        .resolve_snapshot(&ResolveContext::new().with_guild("g1").with_tier(Tier::Pro))
        .await
        .unwrap();
    assert_eq!(snapshot.bool("pro.feature"), Some(true));
    assert_eq!(snapshot.tier(), Tier::Pro);
}

#[tokio::test]
async fn test_missing_required_in_builtin_catalog() {
    let registry = Arc::new(Registry::builtin().clone());
    let (resolver, store) = setup(registry, vec![], baseline(&[]));

    let snapshot = resolver.resolve_snapshot(&ResolveContext::new()).await.unwrap();
    assert!(snapshot.missing_required().is_empty());

    let ctx = ResolveContext::new().with_guild("g1");
    let snapshot = resolver.resolve_snapshot(&ctx).await.unwrap();
    assert_eq!(snapshot.missing_required(), ["notes.channel_id".to_string()]);
    assert_eq!(snapshot.value("notes.channel_id"), None);

    store
        .write(&OverrideRecord::new("server#g1", "notes.channel_id", json!("123")))
        .await
        .unwrap();
    let snapshot = resolver.resolve_snapshot(&ctx).await.unwrap();
    assert!(snapshot.missing_required().is_empty());
    assert_eq!(snapshot.string("notes.channel_id"), Some("123"));
}

#[tokio::test]
async fn test_snapshot_unaffected_by_later_writes() {
    let (resolver, store) = setup(test_registry(), vec![], baseline(&[]));
    let ctx = ResolveContext::new().with_guild("g1");

    let before = resolver.resolve_snapshot(&ctx).await.unwrap();
    store
        .write(&OverrideRecord::new("server#g1", "greeting", json!("later")))
        .await
        .unwrap();
    let after = resolver.resolve_snapshot(&ctx).await.unwrap();

    assert_eq!(before.string("greeting"), Some("hello"));
    assert_eq!(after.string("greeting"), Some("later"));
}

#[tokio::test]
async fn test_baseline_failure_resolves_defaults() {
    let registry = test_registry();
    let source = Arc::new(InMemoryBaselineSource::new());
    source.set_failing(true);
    let client = BaselineClient::new(source, registry.clone())
        .with_cache(Arc::new(BaselineCache::new()));

    let store = Arc::new(InMemoryOverrideStore::new());
    let resolver = SnapshotResolver::new(registry, store, Arc::new(client));
    let snapshot = resolver.resolve_snapshot(&full_context()).await.unwrap();
    assert_eq!(
        snapshot.value("greeting"),
        Some(&ConfigValue::String("hello".to_string()))
    );
    assert_eq!(snapshot.len(), 4);
}

#[tokio::test]
async fn test_uncoercible_override_leaves_required_key_missing() {
    let registry = Arc::new(Registry::builtin().clone());
    let records = vec![OverrideRecord::new("server#g1", "notes.channel_id", json!(42))];
    let (resolver, _) = setup(registry, records, baseline(&[]));

    let snapshot = resolver
        .resolve_snapshot(&ResolveContext::new().with_guild("g1"))
        .await
        .unwrap();
    assert_eq!(snapshot.value("notes.channel_id"), None);
    assert_eq!(snapshot.source("notes.channel_id"), Some(ValueSource::Default));
    assert_eq!(snapshot.missing_required(), ["notes.channel_id".to_string()]);
}

#[tokio::test]
async fn test_one_read_per_scope_and_one_baseline_poll() {
    let registry = test_registry();
    let source = Arc::new(InMemoryBaselineSource::with_values(
        [("greeting".to_string(), json!("from baseline"))].into_iter().collect(),
    ));
    let client = BaselineClient::new(source.clone(), registry.clone())
        .with_cache(Arc::new(BaselineCache::new()));
    let store = Arc::new(InMemoryOverrideStore::new());
    let resolver = SnapshotResolver::new(registry, store.clone(), Arc::new(client));

    let snapshot = resolver.resolve_snapshot(&full_context()).await.unwrap();
    assert_eq!(snapshot.string("greeting"), Some("from baseline"));
    assert_eq!(store.read_count(), 5);
    assert_eq!(source.poll_count(), 1);
    assert_eq!(source.session_count(), 1);
}
