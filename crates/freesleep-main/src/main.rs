// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FreeSleep Bridge.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use freesleep_adapters::{FreeSleepClient, FreeSleepDeviceAdapter};
use freesleep_core::{Coordinator, IntegrationContext, entry_id_for};
use freesleep_main::config::{
    AppConfig, DEFAULT_CONFIG_PATH, ValidationResult, ValidationSeverity,
};
use freesleep_main::host::EntityHost;

#[derive(Debug, Parser)]
#[command(name = "freesleep", version, about = "Bridge for the Free Sleep bed controller")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Poll the device and keep entities up to date until Ctrl-C
    Run,
    /// Validate the configuration and check that the device answers
    Check,
    /// Refresh once and print every entity state as JSON
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "freesleep=info,freesleep_main=info,freesleep_core=info,freesleep_adapters=info",
            )
        }))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config).await,
        Command::Check => check(&config).await,
        Command::Status => status(&config).await,
    }
}

fn report(validation: &ValidationResult) {
    for issue in validation.issues() {
        match issue.severity {
            ValidationSeverity::Error => error!(field = %issue.field, "{}", issue.message),
            ValidationSeverity::Warning => warn!(field = %issue.field, "{}", issue.message),
        }
    }
}

fn build_coordinator(config: &AppConfig) -> Result<Arc<Coordinator>> {
    let validation = config.validate();
    report(&validation);
    if validation.has_errors() {
        bail!("Configuration has {} error(s)", validation.errors.len());
    }

    let options = config.to_options();
    let client = FreeSleepClient::from_options(&options).context("Failed to create device client")?;
    let adapter = Arc::new(FreeSleepDeviceAdapter::new(Arc::new(client)));
    let context = IntegrationContext::new(entry_id_for(&options), options, adapter);
    Ok(Coordinator::new(context))
}

async fn run(config: &AppConfig) -> Result<()> {
    let coordinator = build_coordinator(config)?;
    info!(
        endpoint = %coordinator.context().options().endpoint(),
        entry_id = %coordinator.context().entry_id(),
        "Free Sleep bridge starting"
    );

    if let Err(e) = coordinator.refresh().await {
        warn!(error = %format!("{e:#}"), "Initial refresh failed, will retry on schedule");
    }
    coordinator.start();

    let host = EntityHost::new(Arc::clone(&coordinator));
    host.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    })
    .await;

    info!("Shutting down");
    coordinator.shutdown().await;
    Ok(())
}

async fn check(config: &AppConfig) -> Result<()> {
    let validation = config.validate();
    report(&validation);
    if validation.has_errors() {
        bail!("Configuration has {} error(s)", validation.errors.len());
    }

    let options = config.to_options();
    let client = FreeSleepClient::from_options(&options).context("Failed to create device client")?;
    if !client.ping().await? {
        bail!("Device at {} is not reachable", client.base_url());
    }

    info!(endpoint = %client.base_url(), "Configuration valid, device reachable");
    Ok(())
}

async fn status(config: &AppConfig) -> Result<()> {
    let coordinator = build_coordinator(config)?;
    coordinator
        .refresh()
        .await
        .context("Failed to read device state")?;

    let host = EntityHost::new(coordinator);
    let rendered = serde_json::to_string_pretty(&host.render())?;
    println!("{rendered}");
    Ok(())
}
