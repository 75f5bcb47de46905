//! Role parameters resolved through the full snapshot chain

use serde_json::json;
use std::sync::Arc;

use config_engine_baseline::StaticBaseline;
use config_engine_core::{Registry, ResolveContext};
use config_engine_llm::{
    derive_for_role, CapabilityTable, LlmError, ModelParamConfig, ModelRole, ReasoningEffort,
    SamplingMode, Verbosity,
};
use config_engine_persistence::{InMemoryOverrideStore, OverrideRecord};
use config_engine_resolver::SnapshotResolver;

fn resolver(records: Vec<OverrideRecord>) -> SnapshotResolver {
    SnapshotResolver::new(
        Arc::new(Registry::builtin().clone()),
        Arc::new(InMemoryOverrideStore::with_records(records)),
        Arc::new(StaticBaseline::empty()),
    )
}

#[tokio::test]
async fn test_role_defaults() {
    let snapshot = resolver(vec![])
        .resolve_snapshot(&ResolveContext::new())
        .await
        .unwrap();

    let notes = ModelParamConfig::from_snapshot(&snapshot, ModelRole::Notes).unwrap();
    assert_eq!(notes.model, "gpt-5.1");
    assert_eq!(notes.sampling_mode, SamplingMode::Reasoning);
    assert_eq!(notes.reasoning_effort, ReasoningEffort::Medium);
    assert_eq!(notes.verbosity, Verbosity::Default);

    let correction = ModelParamConfig::from_snapshot(&snapshot, ModelRole::Correction).unwrap();
    assert_eq!(correction.sampling_mode, SamplingMode::Temperature);

    let table = CapabilityTable::builtin();
    let params = derive_for_role(&snapshot, ModelRole::Correction, &table).unwrap();
    assert_eq!(
        serde_json::to_value(&params).unwrap(),
        json!({"model": "gpt-4.1-mini", "temperature": 0.0})
    );
}

#[tokio::test]
async fn test_server_override_changes_derived_params() {
    let records = vec![
        OverrideRecord::new("server#g1", "models.ask.sampling_mode", json!("temperature")),
        OverrideRecord::new("server#g1", "models.ask.model", json!("gpt-5.1")),
        OverrideRecord::new("server#g1", "models.ask.temperature", json!(0.2)),
        OverrideRecord::new("server#g1", "models.ask.verbosity", json!("high")),
    ];
    let snapshot = resolver(records)
        .resolve_snapshot(&ResolveContext::new().with_guild("g1"))
        .await
        .unwrap();

    let params = derive_for_role(&snapshot, ModelRole::Ask, &CapabilityTable::builtin()).unwrap();
    assert_eq!(
        serde_json::to_value(&params).unwrap(),
        json!({
            "model": "gpt-5.1",
            "temperature": 0.2,
            "reasoning_effort": "none",
            "verbosity": "high"
        })
    );
}

#[tokio::test]
async fn test_missing_model_keys_reported() {
    let registry = Registry::new(vec![]).unwrap();
    let resolver = SnapshotResolver::new(
        Arc::new(registry),
        Arc::new(InMemoryOverrideStore::new()),
        Arc::new(StaticBaseline::empty()),
    );
    let snapshot = resolver.resolve_snapshot(&ResolveContext::new()).await.unwrap();
    assert_eq!(
        ModelParamConfig::from_snapshot(&snapshot, ModelRole::Summary),
        Err(LlmError::MissingValue("models.summary.model".to_string()))
    );
}
