use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "logkeep.toml";

/// Prefix for environment variable overrides, e.g. `LOGKEEP__STORAGE__DIRECTORY`.
pub const ENV_PREFIX: &str = "LOGKEEP__";

/// Local filesystem store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding index and chunk files. Its filesystem usage drives
    /// size-based retention.
    ///
    /// Env: LOGKEEP__STORAGE__DIRECTORY
    pub directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(".data"),
        }
    }
}

/// Size-based retention: compact once the store's filesystem fills up.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SizeBasedRetentionConfig {
    /// Enable the size-based retention trigger.
    ///
    /// Env: LOGKEEP__COMPACTOR__SIZE_BASED_RETENTION__ENABLED
    #[serde(default)]
    pub enabled: bool,

    /// Interval between disk usage checks.
    ///
    /// Env: LOGKEEP__COMPACTOR__SIZE_BASED_RETENTION__INTERVAL
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,

    /// Used-space percentage at or above which compaction runs.
    ///
    /// Not range-checked: values above 100 never trigger, values at or below 0
    /// always do.
    ///
    /// Env: LOGKEEP__COMPACTOR__SIZE_BASED_RETENTION__THRESHOLD
    #[serde(default = "default_threshold")]
    pub threshold: i32,
}

fn default_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_threshold() -> i32 {
    80
}

impl Default for SizeBasedRetentionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: default_interval(),
            threshold: default_threshold(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CompactorConfig {
    /// Enable the compactor service.
    ///
    /// Env: LOGKEEP__COMPACTOR__ENABLED
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub size_based_retention: SizeBasedRetentionConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Local store configuration
    pub storage: StorageConfig,
    /// Compactor configuration (disabled by default)
    pub compactor: CompactorConfig,
}

/// Errors raised by [`Configuration::validate`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("storage directory cannot be empty")]
    EmptyStorageDirectory,

    #[error("size-based retention interval must be positive, got {0:?}")]
    InvalidRetentionInterval(Duration),
}

impl Configuration {
    /// Load `logkeep.toml` from the working directory, then apply environment overrides.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::figment(Toml::file(DEFAULT_CONFIG_FILE))
            .extract()
            .map_err(Box::new)
    }

    /// Load an explicit configuration file, then apply environment overrides.
    ///
    /// Unlike [`Configuration::load`], a missing file is an error.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        if !path.is_file() {
            return Err(Box::new(figment::Error::from(format!(
                "configuration file not found: {}",
                path.display()
            ))));
        }

        Self::figment(Toml::file_exact(path))
            .extract()
            .map_err(Box::new)
    }

    fn figment(file: figment::providers::Data<Toml>) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(file)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.directory.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStorageDirectory);
        }

        let retention = &self.compactor.size_based_retention;
        if retention.interval.is_zero() {
            return Err(ConfigError::InvalidRetentionInterval(retention.interval));
        }

        Ok(())
    }
}
