//! logkeep Compactor Service
//!
//! Runs the size-based retention trigger against the configured store
//! directory. The compaction routine wired in here is a dry run that only
//! logs what would be compacted; embedders supply their own
//! [`CompactionFn`](compactor::CompactionFn).

use anyhow::{Context, Result};
use clap::Parser;
use common::cli::utils;
use common::cli::{CommonArgs, CommonCommands};
use compactor::retention::{
    CompactionContext, RetentionTriggerConfig, SizeBasedRetentionService,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<CommonCommands>,
}

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => log::info!("Received SIGINT"),
            _ = sigterm.recv() => log::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        log::info!("Received Ctrl+C");
    }

    Ok(())
}

async fn dry_run_compaction(ctx: CompactionContext, threshold: i32, dir: PathBuf) -> Result<()> {
    if ctx.is_cancelled() {
        log::info!("Shutdown requested, skipping dry-run compaction");
        return Ok(());
    }

    log::info!(
        "[DRY-RUN] Would compact {} (disk usage at or above {}%)",
        dir.display(),
        threshold
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    utils::init_logging(&args.common);

    let config = utils::load_config(args.common.config.as_ref())?;

    let command = args.command.unwrap_or_default();
    let version = utils::version_info(env!("CARGO_BIN_NAME"), env!("CARGO_PKG_VERSION"));
    if utils::handle_common_command(&command, &config, &version).await? {
        return Ok(());
    }

    utils::validate_config(&config)?;

    if !config.compactor.enabled {
        log::info!("Compactor is disabled in configuration (compactor.enabled = false)");
        log::info!("Set LOGKEEP__COMPACTOR__ENABLED=true or enable in config file to run compactor");
        return Ok(());
    }

    if !config.compactor.size_based_retention.enabled {
        log::info!(
            "Size-based retention is disabled (compactor.size_based_retention.enabled = false)"
        );
        return Ok(());
    }

    let trigger_config = RetentionTriggerConfig::from(&config);
    log::info!(
        "Starting logkeep compactor: checking {} every {:?}, threshold {}%",
        trigger_config.working_directory().display(),
        trigger_config.interval(),
        trigger_config.threshold()
    );

    let service = SizeBasedRetentionService::new(trigger_config, dry_run_compaction);
    service
        .start()
        .await
        .context("Failed to start size-based retention service")?;

    log::info!("Compactor service running, waiting for shutdown signal");
    wait_for_shutdown_signal().await?;

    log::info!("Received shutdown signal, stopping compactor service");
    service.stop().await;

    let metrics = service.metrics();
    log::info!(
        "Compactor service stopped: {} ticks, {} compactions ({} failed), {} probe failures",
        metrics.ticks_evaluated(),
        metrics.compactions_triggered(),
        metrics.compactions_failed(),
        metrics.probe_failures()
    );

    Ok(())
}
