//! Runtime configuration of the size-based retention trigger.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::config::Configuration;

/// Default interval between disk usage checks.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

/// Settings the trigger runs with. Immutable once the service is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetentionTriggerConfig {
    interval: Duration,
    threshold: i32,
    working_directory: PathBuf,
}

impl RetentionTriggerConfig {
    /// Trigger with the default 60 second interval.
    pub fn new(threshold: i32, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            threshold,
            working_directory: working_directory.into(),
        }
    }

    /// Override the polling interval. A zero interval is clamped to one millisecond.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Used-space percentage at or above which compaction runs.
    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Directory whose filesystem usage is sampled.
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }
}

impl From<&Configuration> for RetentionTriggerConfig {
    fn from(config: &Configuration) -> Self {
        let retention = &config.compactor.size_based_retention;
        Self::new(retention.threshold, config.storage.directory.clone())
            .with_interval(retention.interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::testing::TestConfigBuilder;

    #[test]
    fn test_defaults() {
        let config = RetentionTriggerConfig::new(80, "/data");
        assert_eq!(config.interval(), Duration::from_secs(60));
        assert_eq!(config.threshold(), 80);
        assert_eq!(config.working_directory(), Path::new("/data"));
    }

    #[test]
    fn test_from_configuration() {
        let config = TestConfigBuilder::new()
            .with_storage_directory("/var/lib/logkeep")
            .with_size_based_retention(Duration::from_secs(10), 92)
            .build();

        let trigger = RetentionTriggerConfig::from(&config);
        assert_eq!(trigger.interval(), Duration::from_secs(10));
        assert_eq!(trigger.threshold(), 92);
        assert_eq!(trigger.working_directory(), Path::new("/var/lib/logkeep"));
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = RetentionTriggerConfig::new(80, "/data").with_interval(Duration::ZERO);
        assert_eq!(config.interval(), Duration::from_millis(1));
    }
}
