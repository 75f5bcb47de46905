//! Call parameter derivation
//!
//! Maps a role's sampling intent onto what the concrete model accepts.
//! The requested mode is honoured when the model supports it, otherwise
//! the other control is used. Unsupported effort levels are replaced by
//! the nearest supported level, looking downward first.

use serde::{Deserialize, Serialize};

use config_engine_resolver::Snapshot;

use crate::{
    CapabilityTable, LlmError, ModelCapabilities, ModelParamConfig, ModelRole, ReasoningEffort,
    SamplingMode, Verbosity,
};

const MIN_TEMPERATURE: f64 = 0.0;
const MAX_TEMPERATURE: f64 = 2.0;

/// Parameters to put on a model call; absent fields are not sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ModelCallParams {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbosity: Option<Verbosity>,
}

impl ModelCallParams {
    fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            temperature: None,
            reasoning_effort: None,
            verbosity: None,
        }
    }
}

/// Derive call parameters for `config` against `table`
pub fn derive_params(config: &ModelParamConfig, table: &CapabilityTable) -> ModelCallParams {
    let caps = table.lookup(&config.model);
    let mut params = ModelCallParams::new(&config.model);

    match config.sampling_mode {
        SamplingMode::Temperature => {
            if caps.supports_temperature {
                apply_temperature(&mut params, config, caps);
            } else if caps.supports_reasoning() {
                tracing::debug!(model = %config.model, "Temperature unsupported, using reasoning effort");
                params.reasoning_effort = nearest_effort(config.reasoning_effort, caps);
            }
        }
        SamplingMode::Reasoning => {
            if caps.supports_reasoning() {
                params.reasoning_effort = nearest_effort(config.reasoning_effort, caps);
            } else if caps.supports_temperature {
                tracing::debug!(model = %config.model, "Reasoning unsupported, using temperature");
                apply_temperature(&mut params, config, caps);
            }
        }
    }

    if caps.supports_verbosity && config.verbosity != Verbosity::Default {
        params.verbosity = Some(config.verbosity);
    }

    params
}

/// Resolve a role's parameters from a snapshot and derive its call parameters
pub fn derive_for_role(
    snapshot: &Snapshot,
    role: ModelRole,
    table: &CapabilityTable,
) -> Result<ModelCallParams, LlmError> {
    let config = ModelParamConfig::from_snapshot(snapshot, role)?;
    let params = derive_params(&config, table);

    tracing::debug!(
        role = %role,
        model = %params.model,
        temperature = ?params.temperature,
        reasoning_effort = ?params.reasoning_effort,
        verbosity = ?params.verbosity,
        "Model call parameters derived"
    );
    Ok(params)
}

fn apply_temperature(
    params: &mut ModelCallParams,
    config: &ModelParamConfig,
    caps: &ModelCapabilities,
) {
    if caps.temperature_requires_no_reasoning {
        params.reasoning_effort = Some(ReasoningEffort::None);
    }
    params.temperature = Some(config.temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE));
}

/// `requested` if supported, else the closest supported level below it,
/// else the closest above it
pub fn nearest_effort(
    requested: ReasoningEffort,
    caps: &ModelCapabilities,
) -> Option<ReasoningEffort> {
    if caps.supports_effort(requested) {
        return Some(requested);
    }

    let rank = requested.rank();
    let below = ReasoningEffort::ORDER[..rank].iter().rev();
    let above = ReasoningEffort::ORDER[rank + 1..].iter();
    below
        .chain(above)
        .copied()
        .find(|effort| caps.supports_effort(*effort))
}
