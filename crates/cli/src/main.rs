//! config-engine command line

mod app;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use config_engine_config::{load_settings_from, Settings};

use crate::app::Engine;
use crate::commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env = cli
        .env
        .clone()
        .or_else(|| std::env::var("CONFIG_ENGINE_ENV").ok());
    let settings = match load_settings_from(&cli.config_dir, env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&settings);

    let metrics = if settings.observability.metrics_enabled {
        match metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install metrics recorder");
                None
            }
        }
    } else {
        None
    };

    let engine = Engine::from_settings(&settings).await?;
    let result = cli.command.execute(&engine).await;

    if let Some(handle) = metrics {
        tracing::debug!(metrics = %handle.render(), "Metrics at exit");
    }
    result
}

/// Logs go to stderr; stdout carries command output
fn init_tracing(settings: &Settings) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("config_engine={}", settings.observability.log_level).into()
    });

    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
