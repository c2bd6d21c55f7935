//! Test configuration builder for creating test setups quickly.

use std::path::Path;
use std::time::Duration;

use crate::config::Configuration;

/// Builder for creating test configurations.
///
/// Starts from the defaults and lets tests point the store at a temporary
/// directory and tune the size-based retention trigger.
///
/// # Example
///
/// ```rust,ignore
/// use common::testing::TestConfigBuilder;
/// use tempfile::TempDir;
///
/// let dir = TempDir::new().unwrap();
/// let config = TestConfigBuilder::new()
///     .with_storage_directory(dir.path())
///     .with_size_based_retention(Duration::from_secs(1), 80)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestConfigBuilder {
    config: Configuration,
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Configuration::default(),
        }
    }

    /// Set the store directory (also the retention working directory).
    pub fn with_storage_directory(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.storage.directory = dir.as_ref().to_path_buf();
        self
    }

    /// Enable the compactor and its size-based retention trigger.
    pub fn with_size_based_retention(mut self, interval: Duration, threshold: i32) -> Self {
        self.config.compactor.enabled = true;

        let retention = &mut self.config.compactor.size_based_retention;
        retention.enabled = true;
        retention.interval = interval;
        retention.threshold = threshold;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> Configuration {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_builder() {
        let config = TestConfigBuilder::new().build();
        assert_eq!(config.storage.directory, PathBuf::from(".data"));
        assert!(!config.compactor.enabled);
    }

    #[test]
    fn test_with_size_based_retention() {
        let config = TestConfigBuilder::new()
            .with_storage_directory("/tmp/test-logkeep")
            .with_size_based_retention(Duration::from_secs(5), 95)
            .build();

        assert_eq!(config.storage.directory, PathBuf::from("/tmp/test-logkeep"));
        assert!(config.compactor.enabled);

        let retention = &config.compactor.size_based_retention;
        assert!(retention.enabled);
        assert_eq!(retention.interval, Duration::from_secs(5));
        assert_eq!(retention.threshold, 95);
    }
}
