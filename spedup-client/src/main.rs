//! spedup - SPED ledger ingestion client
//!
//! Filters fiscal ledgers down to the records the server imports, uploads
//! them in chunks, waits for the import jobs and refreshes the consolidated
//! views.
//!
//! Exit codes: 0 success, 1 failure, 2 authentication required.

use anyhow::{Context, Result};
use clap::Parser;
use spedup_client::cli::{commands, Args, Command, CommandOutcome};
use spedup_client::config::{CliOverrides, ClientConfig};
use spedup_common::config::load_toml_config;
use std::process::ExitCode;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let toml_config = load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());

    // Initialize tracing; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("spedup {}", env!("CARGO_PKG_VERSION"));

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let outcome = match args.command {
        Command::Filter { input, output } => {
            commands::run_filter(&input, output.as_deref(), &toml_config.pipeline, cancel).await?
        }
        command => {
            let overrides = CliOverrides {
                server_url: args.server_url,
                token: args.token,
                company_id: match &command {
                    Command::Upload(upload) => upload.company_id.clone(),
                    _ => None,
                },
                log_level: args.log_level,
            };
            let config = ClientConfig::resolve(&toml_config, &overrides)?;
            commands::run_remote(command, config, cancel).await?
        }
    };

    if outcome == CommandOutcome::AuthenticationRequired {
        eprintln!("Authentication required: refresh the token and run again");
    }
    Ok(outcome.exit_code())
}

/// Cancel in-flight work on Ctrl+C
async fn cancel_on_signal(cancel: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling");
            cancel.cancel();
        }
        Err(e) => tracing::warn!("Failed to install Ctrl+C handler: {}", e),
    }
}
