//! Built-in configuration catalog
//!
//! Every key the engine knows about. Model keys follow the pattern
//! `models.<role>.<field>` and are generated per role.

use crate::registry::ConfigEntry;
use crate::scope::{Control, Role, ScopeConfig, ScopeKind};
use crate::{NumberBounds, Tier};

/// Boolean key read by the experimental gate
pub const EXPERIMENTAL_FLAG_KEY: &str = "features.experimental";

/// Roles that carry their own model parameters
pub const MODEL_ROLES: [&str; 4] = ["notes", "ask", "summary", "correction"];

pub const SAMPLING_MODES: [&str; 2] = ["reasoning", "temperature"];
pub const REASONING_EFFORTS: [&str; 6] = ["none", "minimal", "low", "medium", "high", "xhigh"];
pub const VERBOSITY_LEVELS: [&str; 4] = ["default", "low", "medium", "high"];

/// Key of a model field for a role, e.g. `models.notes.temperature`
pub fn model_key(role: &str, field: &str) -> String {
    format!("models.{}.{}", role, field)
}

fn superadmin(control: Control) -> ScopeConfig {
    ScopeConfig::enabled(Role::Superadmin, control)
}

fn admin(control: Control) -> ScopeConfig {
    ScopeConfig::enabled(Role::Admin, control)
}

fn member(control: Control) -> ScopeConfig {
    ScopeConfig::enabled(Role::Member, control)
}

/// Entries of the built-in registry
pub fn builtin_entries() -> Vec<ConfigEntry> {
    let mut entries = vec![
        ConfigEntry::boolean(EXPERIMENTAL_FLAG_KEY, false)
            .label("Experimental features", "Opt in to features still under evaluation")
            .category("features")
            .scope(ScopeKind::Global, superadmin(Control::Toggle))
            .scope(ScopeKind::Server, admin(Control::Toggle)),
        ConfigEntry::boolean("notes.enabled", true)
            .label("Meeting notes", "Generate notes when a meeting ends")
            .category("notes")
            .scope(ScopeKind::Global, superadmin(Control::Toggle))
            .scope(ScopeKind::Server, admin(Control::Toggle))
            .scope(ScopeKind::Channel, admin(Control::TriState)),
        ConfigEntry::string("notes.tags", "")
            .label("Default tags", "Comma separated tags applied to new notes")
            .category("notes")
            .scope(ScopeKind::Server, admin(Control::Text))
            .scope(ScopeKind::Channel, admin(Control::Text)),
        ConfigEntry::new("notes.channel_id", crate::ValueType::String)
            .label("Notes channel", "Channel where finished notes are posted")
            .category("notes")
            .scope(ScopeKind::Server, admin(Control::Text).required()),
        ConfigEntry::select(
            "transcription.language",
            ["auto", "en", "es", "fr", "de", "ja", "pt"],
            "auto",
        )
        .label("Transcription language", "Spoken language hint for transcription")
        .category("transcription")
        .scope(ScopeKind::Global, superadmin(Control::Select))
        .scope(ScopeKind::Server, admin(Control::Select))
        .scope(ScopeKind::User, member(Control::Select)),
        ConfigEntry::boolean("transcription.live_captions", false)
            .label("Live captions", "Post captions while the meeting is running")
            .category("transcription")
            .min_tier(Tier::Basic)
            .scope(ScopeKind::Server, admin(Control::Toggle))
            .scope(ScopeKind::Channel, admin(Control::TriState)),
        ConfigEntry::boolean("live_voice.enabled", false)
            .label("Live voice", "Let the assistant answer questions aloud")
            .category("live_voice")
            .min_tier(Tier::Pro)
            .experimental()
            .scope(ScopeKind::Server, admin(Control::Toggle))
            .scope(ScopeKind::User, member(Control::TriState)),
        ConfigEntry::boolean("ask.enabled", true)
            .label("Ask", "Answer questions about past meetings")
            .category("ask")
            .scope(ScopeKind::Server, admin(Control::Toggle))
            .scope(ScopeKind::Channel, admin(Control::TriState))
            .scope(ScopeKind::User, member(Control::TriState)),
        ConfigEntry::number("ask.max_context_meetings", 5.0)
            .bounds(NumberBounds::new().with_min(1.0).with_max(20.0))
            .label("Ask context size", "Past meetings searched per question")
            .category("ask")
            .step(1.0)
            .scope(ScopeKind::Server, admin(Control::Number)),
        ConfigEntry::boolean("images.enabled", false)
            .label("Meeting images", "Generate a cover image for notes")
            .category("images")
            .min_tier(Tier::Pro)
            .experimental()
            .scope(ScopeKind::Server, admin(Control::Toggle))
            .scope(ScopeKind::Channel, admin(Control::TriState)),
        ConfigEntry::number("context.transcript_floor_tokens", 500.0)
            .bounds(NumberBounds::new().with_min(0.0))
            .label("Transcript token floor", "Lowest transcript budget any scope may set")
            .category("context")
            .scope(ScopeKind::Global, superadmin(Control::Number)),
        ConfigEntry::number("context.transcript_tokens", 1000.0)
            .bounds(
                NumberBounds::new()
                    .with_min_key("context.transcript_floor_tokens")
                    .with_max(2000.0),
            )
            .label("Transcript token budget", "Transcript tokens sent with each request")
            .category("context")
            .step(50.0)
            .scope(ScopeKind::Global, superadmin(Control::Number))
            .scope(ScopeKind::Server, admin(Control::Number))
            .scope(ScopeKind::Meeting, admin(Control::Number)),
        ConfigEntry::number("limits.meeting_minutes.hard_cap", 600.0)
            .bounds(NumberBounds::new().with_min(1.0))
            .label("Meeting length hard cap", "Absolute limit for any tier")
            .category("limits")
            .scope(ScopeKind::Global, superadmin(Control::Number)),
    ];

    for (tier, default) in [("free", 60.0), ("basic", 120.0), ("pro", 360.0)] {
        entries.push(
            ConfigEntry::number(format!("limits.meeting_minutes.{}", tier), default)
                .bounds(
                    NumberBounds::new()
                        .with_min(1.0)
                        .with_max_key("limits.meeting_minutes.hard_cap"),
                )
                .label("Meeting length budget", "Minutes recorded per meeting for this tier")
                .category("limits")
                .scope(ScopeKind::Global, superadmin(Control::Number)),
        );
    }

    for role in MODEL_ROLES {
        entries.extend(model_entries(role));
    }

    entries
}

fn model_entries(role: &str) -> Vec<ConfigEntry> {
    let (model, mode, effort, temperature) = match role {
        "notes" => ("gpt-5.1", "reasoning", "medium", 0.3),
        "ask" => ("gpt-5-mini", "reasoning", "low", 0.5),
        "summary" => ("gpt-5-mini", "reasoning", "minimal", 0.3),
        _ => ("gpt-4.1-mini", "temperature", "none", 0.0),
    };
    let category = format!("models.{}", role);

    let scoped = |entry: ConfigEntry, control: Control| {
        entry
            .category(&category)
            .scope(ScopeKind::Global, superadmin(control))
            .scope(ScopeKind::Server, admin(control))
    };

    vec![
        scoped(
            ConfigEntry::string(model_key(role, "model"), model)
                .label("Model", "Backend model identifier"),
            Control::Text,
        ),
        scoped(
            ConfigEntry::select(model_key(role, "sampling_mode"), SAMPLING_MODES, mode)
                .label("Sampling mode", "Steer the model by reasoning effort or temperature"),
            Control::Select,
        ),
        scoped(
            ConfigEntry::select(model_key(role, "reasoning_effort"), REASONING_EFFORTS, effort)
                .label("Reasoning effort", "Requested reasoning depth"),
            Control::Select,
        ),
        scoped(
            ConfigEntry::number(model_key(role, "temperature"), temperature)
                .bounds(NumberBounds::new().with_min(0.0).with_max(2.0))
                .label("Temperature", "Sampling temperature")
                .step(0.1),
            Control::Number,
        ),
        scoped(
            ConfigEntry::select(model_key(role, "verbosity"), VERBOSITY_LEVELS, "default")
                .label("Verbosity", "Response verbosity hint"),
            Control::Select,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registry;

    #[test]
    fn test_every_role_has_model_keys() {
        let registry = Registry::builtin();
        for role in MODEL_ROLES {
            for field in ["model", "sampling_mode", "reasoning_effort", "temperature", "verbosity"] {
                assert!(
                    registry.contains(&model_key(role, field)),
                    "missing {}",
                    model_key(role, field)
                );
            }
        }
    }

    #[test]
    fn test_tier_budgets_capped_by_hard_limit() {
        let registry = Registry::builtin();
        let deps: Vec<&str> = registry
            .dependents_of("limits.meeting_minutes.hard_cap")
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(
            deps,
            vec![
                "limits.meeting_minutes.free",
                "limits.meeting_minutes.basic",
                "limits.meeting_minutes.pro"
            ]
        );
    }
}
