//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values and
//! [`TestConfigFile`] when the code under test loads config from disk.

use std::path::{Path, PathBuf};

use stillcode_config::{AppConfig, TimeoutDescriptor, TrackerConfig};
use tempfile::TempDir;

/// Fluent builder for [`AppConfig`] in tests.
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .near_margin(10)
///     .timeout(5, true, false)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
    timeouts: Option<Vec<TimeoutDescriptor>>,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            timeouts: None,
        }
    }

    pub fn near_margin(mut self, margin: usize) -> Self {
        self.config.tracker.near_margin = margin;
        self
    }

    pub fn far_margin(mut self, margin: usize) -> Self {
        self.config.tracker.far_margin = margin;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.tracker.still_in_code_threshold = threshold;
        self
    }

    pub fn capture_code_margin(mut self, margin: usize) -> Self {
        self.config.tracker.capture_code_margin = margin;
        self
    }

    pub fn capture_prefix_chars(mut self, chars: usize) -> Self {
        self.config.tracker.capture_prefix_chars = chars;
        self
    }

    /// Add a timeout. The first call replaces the default schedule.
    pub fn timeout(mut self, delay_secs: u64, capture_code: bool, capture_rejection: bool) -> Self {
        self.timeouts
            .get_or_insert_with(Vec::new)
            .push(TimeoutDescriptor::new(delay_secs, capture_code, capture_rejection));
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(mut self) -> AppConfig {
        if let Some(timeouts) = self.timeouts {
            self.config.tracker.timeouts = timeouts;
        }
        self.config
    }

    pub fn build_tracker(self) -> TrackerConfig {
        self.build().tracker
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A TOML config file in a temp directory that lives as long as this value.
pub struct TestConfigFile {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl TestConfigFile {
    pub async fn with_toml(toml_content: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("stillcode.toml");
        tokio::fs::write(&path, toml_content)
            .await
            .expect("failed to write test config");
        Self {
            path,
            _temp_dir: temp_dir,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
