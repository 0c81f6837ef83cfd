//! TFWS trust service binary.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tfws_api::config::{Config, LoggingConfig};
use tfws_api::server::{run_with_config, ApiRuntimeConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "tfws-api")]
#[command(version, about = "TFWS trust-state HTTP service", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging, cli.debug)?;

    info!("TFWS trust service starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Probe: {} (timeout {} ms)",
        if config.probe.enabled { "enabled" } else { "disabled" },
        config.probe.timeout_ms
    );
    info!("  Validity window: {} days", config.trust.validity_days);

    run_with_config(ApiRuntimeConfig::from_config(&config)).await
}

/// Initialize tracing subscriber for logging
fn init_logging(logging: &LoggingConfig, debug: bool) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = if debug {
        EnvFilter::new("tfws_api=debug,tfws_verifier=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "tfws_api={level},tfws_verifier={level},tower_http={level}",
                level = logging.level
            ))
        })
    };

    let registry = tracing_subscriber::registry().with(env_filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_target(true).with_line_number(true))
            .try_init()?;
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()?;
    }

    Ok(())
}
