use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Common CLI arguments shared across all binaries
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    pub quiet: bool,
}

/// Common subcommands available for all services
#[derive(Subcommand, Debug, Clone, Default)]
pub enum CommonCommands {
    /// Start the service (default behavior)
    #[default]
    Start,
    /// Show current configuration and exit
    Config {
        #[arg(long, help = "Show configuration in JSON format")]
        json: bool,
    },
    /// Validate configuration and exit
    Validate,
    /// Show version information and exit
    Version,
    /// Probe the storage directory's filesystem usage and exit
    DiskUsage {
        #[arg(long, help = "Show disk usage in JSON format")]
        json: bool,
    },
}

/// Utility functions for CLI operations
pub mod utils {
    use super::*;
    use crate::config::Configuration;
    use crate::storage::{DiskUsageProvider, FilesystemProbe};
    use anyhow::{Context, Result};
    use tracing_subscriber::EnvFilter;

    /// Initialize logging based on CLI arguments.
    ///
    /// `RUST_LOG` takes precedence over the verbosity flags.
    pub fn init_logging(args: &CommonArgs) {
        let level = if args.quiet {
            "warn"
        } else if args.verbose {
            "debug"
        } else {
            "info"
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    /// Load configuration with optional override from CLI
    pub fn load_config(config_path: Option<&PathBuf>) -> Result<Configuration> {
        match config_path {
            Some(path) => {
                log::info!("Loading configuration from: {}", path.display());
                Configuration::load_from_path(path).context("Failed to load configuration")
            }
            None => Configuration::load().context("Failed to load configuration"),
        }
    }

    /// Display configuration in human-readable or JSON format
    pub fn display_config(config: &Configuration, json: bool) -> Result<()> {
        if json {
            let json = serde_json::to_string_pretty(config)
                .context("Failed to serialize configuration to JSON")?;
            println!("{json}");
        } else {
            let retention = &config.compactor.size_based_retention;

            println!("logkeep Configuration:");
            println!("======================");
            println!("Storage directory: {}", config.storage.directory.display());
            println!("Compactor enabled: {}", config.compactor.enabled);
            println!("Size-based retention enabled: {}", retention.enabled);
            println!("Size-based retention interval: {:?}", retention.interval);
            println!("Size-based retention threshold: {}%", retention.threshold);
        }
        Ok(())
    }

    /// Validate configuration and report any issues
    pub fn validate_config(config: &Configuration) -> Result<()> {
        log::info!("Validating configuration...");

        config.validate().context("Invalid configuration")?;

        log::info!("Configuration validation passed");
        Ok(())
    }

    /// Probe and print the disk usage of the configured storage directory
    pub fn display_disk_usage(config: &Configuration, json: bool) -> Result<()> {
        let directory = &config.storage.directory;
        let status = FilesystemProbe
            .disk_usage(directory)
            .context("Failed to probe disk usage")?;

        if json {
            let json = serde_json::to_string_pretty(&status)
                .context("Failed to serialize disk usage to JSON")?;
            println!("{json}");
        } else {
            println!("Disk usage for {}:", directory.display());
            println!("  Total: {} bytes", status.total());
            println!("  Used:  {} bytes", status.used());
            println!("  Free:  {} bytes", status.free());
            println!("  Used percent: {:.2}%", status.used_percent());
        }
        Ok(())
    }

    /// Handle common CLI commands that don't require starting services.
    ///
    /// `version` is the line printed by `version`, see [`version_info`].
    pub async fn handle_common_command(
        command: &CommonCommands,
        config: &Configuration,
        version: &str,
    ) -> Result<bool> {
        match command {
            CommonCommands::Config { json } => {
                display_config(config, *json)?;
                Ok(true)
            }
            CommonCommands::Validate => {
                validate_config(config)?;
                Ok(true)
            }
            CommonCommands::Version => {
                println!("{version}");
                Ok(true)
            }
            CommonCommands::DiskUsage { json } => {
                display_disk_usage(config, *json)?;
                Ok(true)
            }
            CommonCommands::Start => Ok(false),
        }
    }

    /// Standard version line. Callers pass their own `CARGO_BIN_NAME` and
    /// `CARGO_PKG_VERSION`; expanding them here would name this crate instead.
    pub fn version_info(name: &str, version: &str) -> String {
        format!("{name} {version}")
    }
}
