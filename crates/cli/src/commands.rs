//! CLI command definitions and execution

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;

use config_engine_baseline::PublishRequest;
use config_engine_core::{ResolveContext, ScopeKind, Tier};
use config_engine_llm::{derive_for_role, CapabilityTable, LlmError, ModelRole};

use crate::app::Engine;

/// config-engine - inspect and publish scoped configuration
#[derive(Parser, Debug)]
#[command(
    name = "config-engine",
    version,
    about = "Inspect and publish scoped configuration",
    long_about = "Resolves configuration snapshots, derives model call parameters and publishes baseline values"
)]
pub struct Cli {
    /// Directory holding default.yaml and per-environment settings files
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// Settings environment (falls back to CONFIG_ENGINE_ENV)
    #[arg(long, global = true)]
    pub env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve every key for a context
    Snapshot(ContextArgs),

    /// List global-level values of globally configurable keys
    Global,

    /// Derive model call parameters for one role or all roles
    ModelParams(ModelParamsArgs),

    /// Validate and publish baseline values
    Publish(PublishArgs),

    /// Set an override at a scope
    SetOverride(SetOverrideArgs),

    /// Remove an override at a scope
    ClearOverride(ClearOverrideArgs),

    /// List overrides stored at a scope
    ListOverrides(ScopeArgs),
}

/// Request context
#[derive(Args, Debug, Default)]
pub struct ContextArgs {
    #[arg(long)]
    guild: Option<String>,

    #[arg(long)]
    channel: Option<String>,

    #[arg(long)]
    user: Option<String>,

    #[arg(long)]
    meeting: Option<String>,

    /// free, basic or pro
    #[arg(long, value_parser = parse_tier)]
    tier: Option<Tier>,

    /// Grant or deny the experimental entitlement
    #[arg(long)]
    experimental: Option<bool>,
}

impl ContextArgs {
    fn to_context(&self) -> ResolveContext {
        ResolveContext {
            guild_id: self.guild.clone(),
            channel_id: self.channel.clone(),
            user_id: self.user.clone(),
            meeting_id: self.meeting.clone(),
            tier: self.tier,
            experimental: self.experimental,
        }
    }
}

#[derive(Args, Debug)]
pub struct ModelParamsArgs {
    /// notes, ask, summary or correction; all roles when omitted
    #[arg(long)]
    role: Option<String>,

    #[command(flatten)]
    context: ContextArgs,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// key=value; the value is read as JSON, or as a string when it is not JSON
    #[arg(long = "set", value_parser = parse_assignment, required = true)]
    values: Vec<(String, serde_json::Value)>,

    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScopeArgs {
    /// global, server, channel, user or meeting
    #[arg(long, value_parser = parse_scope)]
    scope: ScopeKind,

    #[command(flatten)]
    context: ContextArgs,
}

#[derive(Args, Debug)]
pub struct SetOverrideArgs {
    #[command(flatten)]
    target: ScopeArgs,

    /// key=value
    #[arg(value_parser = parse_assignment)]
    assignment: (String, serde_json::Value),

    #[arg(long)]
    updated_by: Option<String>,
}

#[derive(Args, Debug)]
pub struct ClearOverrideArgs {
    #[command(flatten)]
    target: ScopeArgs,

    key: String,
}

impl Commands {
    pub async fn execute(self, engine: &Engine) -> Result<()> {
        match self {
            Commands::Snapshot(args) => {
                let snapshot = engine.resolver.resolve_snapshot(&args.to_context()).await?;
                print_json(&snapshot)
            }
            Commands::Global => {
                let values = engine.resolver.resolve_global_values().await?;
                print_json(&values)
            }
            Commands::ModelParams(args) => model_params(engine, args).await,
            Commands::Publish(args) => {
                let mut request = PublishRequest::new(args.values.into_iter().collect());
                if let Some(description) = args.description {
                    request = request.with_description(description);
                }
                let result = engine.baseline.publish(request).await?;
                print_json(&result)
            }
            Commands::SetOverride(args) => {
                let (key, value) = args.assignment;
                let record = engine
                    .overrides
                    .set_override(
                        &args.target.context.to_context(),
                        args.target.scope,
                        &key,
                        value,
                        args.updated_by.as_deref(),
                    )
                    .await?;
                print_json(&record)
            }
            Commands::ClearOverride(args) => {
                engine
                    .overrides
                    .clear_override(&args.target.context.to_context(), args.target.scope, &args.key)
                    .await?;
                print_json(&json!({ "cleared": args.key }))
            }
            Commands::ListOverrides(args) => {
                let records = engine
                    .overrides
                    .list_overrides(&args.context.to_context(), args.scope)
                    .await?;
                print_json(&records)
            }
        }
    }
}

async fn model_params(engine: &Engine, args: ModelParamsArgs) -> Result<()> {
    let roles = match &args.role {
        Some(name) => vec![ModelRole::from_str(name).ok_or_else(|| LlmError::UnknownRole(name.clone()))?],
        None => ModelRole::ALL.to_vec(),
    };

    let snapshot = engine.resolver.resolve_snapshot(&args.context.to_context()).await?;
    let table = CapabilityTable::builtin();

    let mut output = BTreeMap::new();
    for role in roles {
        output.insert(role.as_str(), derive_for_role(&snapshot, role, &table)?);
    }
    print_json(&output)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{}", rendered);
    Ok(())
}

fn parse_tier(s: &str) -> Result<Tier, String> {
    Tier::from_str(s).ok_or_else(|| format!("unknown tier '{}'", s))
}

fn parse_scope(s: &str) -> Result<ScopeKind, String> {
    ScopeKind::from_str(s).ok_or_else(|| format!("unknown scope '{}'", s))
}

/// Parse `key=value`, reading the value as JSON when possible
fn parse_assignment(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("notes.enabled=false").unwrap(),
            ("notes.enabled".to_string(), json!(false))
        );
        assert_eq!(
            parse_assignment("limits.meeting_minutes.pro=300").unwrap(),
            ("limits.meeting_minutes.pro".to_string(), json!(300))
        );
        assert_eq!(
            parse_assignment("models.ask.model=gpt-5.1").unwrap(),
            ("models.ask.model".to_string(), json!("gpt-5.1"))
        );
        assert!(parse_assignment("no-equals").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn test_cli_parses_snapshot_context() {
        let cli = Cli::parse_from([
            "config-engine",
            "snapshot",
            "--guild",
            "g1",
            "--tier",
            "pro",
            "--experimental",
            "true",
        ]);
        let Commands::Snapshot(args) = cli.command else {
            panic!("expected snapshot command");
        };
        let ctx = args.to_context();
        assert_eq!(ctx.guild_id.as_deref(), Some("g1"));
        assert_eq!(ctx.tier, Some(Tier::Pro));
        assert_eq!(ctx.experimental, Some(true));
    }

    #[test]
    fn test_cli_parses_set_override() {
        let cli = Cli::parse_from([
            "config-engine",
            "set-override",
            "--scope",
            "server",
            "--guild",
            "g1",
            "notes.enabled=false",
        ]);
        let Commands::SetOverride(args) = cli.command else {
            panic!("expected set-override command");
        };
        assert_eq!(args.target.scope, ScopeKind::Server);
        assert_eq!(args.assignment.1, json!(false));
    }
}
