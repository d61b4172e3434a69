#![deny(unsafe_code)]

//! Configuration loading and validation for Stillcode.
//!
//! Loads TOML configuration files and validates them. [`AppConfig`] is the
//! top-level structure; [`TrackerConfig`] carries every tunable the survival
//! tracker consumes (search margins, the still-in-code threshold, and the
//! ordered list of [`TimeoutDescriptor`] horizons).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Survival tracker configuration.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One scheduled re-check after an acceptance or rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutDescriptor {
    /// Delay since the acceptance/rejection event, in seconds.
    pub delay_secs: u64,

    /// Capture the code surrounding the tracked offset at this horizon.
    #[serde(default)]
    pub capture_code: bool,

    /// Also fire this horizon after a rejection (capture only).
    #[serde(default)]
    pub capture_rejection: bool,
}

impl TimeoutDescriptor {
    pub const fn new(delay_secs: u64, capture_code: bool, capture_rejection: bool) -> Self {
        Self {
            delay_secs,
            capture_code,
            capture_rejection,
        }
    }

    /// The delay as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Default horizons: 15s, 30s (with code capture, also after rejection),
/// 2min, 5min and 10min.
pub const DEFAULT_TIMEOUTS: [TimeoutDescriptor; 5] = [
    TimeoutDescriptor::new(15, false, false),
    TimeoutDescriptor::new(30, true, true),
    TimeoutDescriptor::new(120, false, false),
    TimeoutDescriptor::new(300, false, false),
    TimeoutDescriptor::new(600, false, false),
];

/// Survival tracker configuration.
///
/// All margins are measured in characters (Unicode scalar values).
///
/// ## TOML Example
///
/// ```toml
/// [tracker]
/// near_margin = 50
/// far_margin = 1500
/// still_in_code_threshold = 0.5
///
/// [[tracker.timeouts]]
/// delay_secs = 15
///
/// [[tracker.timeouts]]
/// delay_secs = 30
/// capture_code = true
/// capture_rejection = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Margin around the tracked offset for the first search.
    #[serde(default = "default_near_margin")]
    pub near_margin: usize,

    /// Margin for the single retry when the near search fails.
    #[serde(default = "default_far_margin")]
    pub far_margin: usize,

    /// Maximum relative lexeme edit distance still counted as "in code".
    #[serde(default = "default_still_in_code_threshold")]
    pub still_in_code_threshold: f64,

    /// Fallback length of captured code when no block end is detected.
    #[serde(default = "default_capture_code_margin")]
    pub capture_code_margin: usize,

    /// How much text before/after the tracked offsets goes into the
    /// hypothetical prompt of a code capture.
    #[serde(default = "default_capture_prefix_chars")]
    pub capture_prefix_chars: usize,

    /// Ordered horizons, strictly increasing in delay.
    #[serde(default = "default_timeouts")]
    pub timeouts: Vec<TimeoutDescriptor>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            near_margin: default_near_margin(),
            far_margin: default_far_margin(),
            still_in_code_threshold: default_still_in_code_threshold(),
            capture_code_margin: default_capture_code_margin(),
            capture_prefix_chars: default_capture_prefix_chars(),
            timeouts: default_timeouts(),
        }
    }
}

impl TrackerConfig {
    /// Horizons that also fire after a rejection.
    pub fn rejection_timeouts(&self) -> impl Iterator<Item = &TimeoutDescriptor> {
        self.timeouts.iter().filter(|t| t.capture_rejection)
    }

    /// Validate the tracker section on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near_margin == 0 {
            return Err(ConfigError::Validation(
                "tracker.near_margin must be non-zero".to_string(),
            ));
        }
        if self.far_margin < self.near_margin {
            return Err(ConfigError::Validation(format!(
                "tracker.far_margin ({}) must not be smaller than tracker.near_margin ({})",
                self.far_margin, self.near_margin
            )));
        }
        if !(0.0..=1.0).contains(&self.still_in_code_threshold) {
            return Err(ConfigError::Validation(format!(
                "tracker.still_in_code_threshold must be in [0.0, 1.0], got {}",
                self.still_in_code_threshold
            )));
        }
        if self.capture_code_margin == 0 {
            return Err(ConfigError::Validation(
                "tracker.capture_code_margin must be non-zero".to_string(),
            ));
        }
        if self.timeouts.is_empty() {
            return Err(ConfigError::Validation(
                "tracker.timeouts must contain at least one horizon".to_string(),
            ));
        }
        let mut previous = 0;
        for (i, timeout) in self.timeouts.iter().enumerate() {
            if timeout.delay_secs <= previous {
                return Err(ConfigError::Validation(format!(
                    "tracker.timeouts[{i}].delay_secs must be greater than {previous}, got {}",
                    timeout.delay_secs
                )));
            }
            previous = timeout.delay_secs;
        }
        Ok(())
    }
}

fn default_near_margin() -> usize {
    50
}

fn default_far_margin() -> usize {
    1500
}

fn default_still_in_code_threshold() -> f64 {
    0.5
}

fn default_capture_code_margin() -> usize {
    500
}

fn default_capture_prefix_chars() -> usize {
    2000
}

fn default_timeouts() -> Vec<TimeoutDescriptor> {
    DEFAULT_TIMEOUTS.to_vec()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tracker.validate()?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.tracker.near_margin, 50);
        assert_eq!(config.tracker.far_margin, 1500);
        assert_eq!(config.tracker.still_in_code_threshold, 0.5);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_timeouts_are_increasing() {
        let delays: Vec<u64> = DEFAULT_TIMEOUTS.iter().map(|t| t.delay_secs).collect();
        assert_eq!(delays, vec![15, 30, 120, 300, 600]);
    }

    #[test]
    fn test_rejection_timeouts() {
        let config = TrackerConfig::default();
        let rejection: Vec<u64> = config.rejection_timeouts().map(|t| t.delay_secs).collect();
        assert_eq!(rejection, vec![30]);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.tracker.timeouts.len(), 5);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [tracker]
            near_margin = 20
            far_margin = 400
            still_in_code_threshold = 0.25
            capture_code_margin = 100

            [[tracker.timeouts]]
            delay_secs = 5

            [[tracker.timeouts]]
            delay_secs = 10
            capture_code = true
            capture_rejection = true

            [logging]
            level = "debug"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(config.tracker.near_margin, 20);
        assert_eq!(config.tracker.far_margin, 400);
        assert_eq!(config.tracker.still_in_code_threshold, 0.25);
        assert_eq!(config.tracker.capture_code_margin, 100);
        assert_eq!(
            config.tracker.timeouts,
            vec![
                TimeoutDescriptor::new(5, false, false),
                TimeoutDescriptor::new(10, true, true),
            ]
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_zero_near_margin() {
        let toml = r#"
            [tracker]
            near_margin = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_far_below_near() {
        let toml = r#"
            [tracker]
            near_margin = 100
            far_margin = 10
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_threshold_out_of_range() {
        let toml = r#"
            [tracker]
            still_in_code_threshold = 1.5
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_unordered_timeouts() {
        let toml = r#"
            [[tracker.timeouts]]
            delay_secs = 30

            [[tracker.timeouts]]
            delay_secs = 15
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("tracker.timeouts[1]"));
    }

    #[test]
    fn test_validation_rejects_zero_delay() {
        let toml = r#"
            [[tracker.timeouts]]
            delay_secs = 0
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_timeouts() {
        let toml = r#"
            [tracker]
            timeouts = []
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_log_level() {
        let toml = r#"
            [logging]
            level = "loud"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stillcode.toml");
        tokio::fs::write(&path, b"[tracker]\nnear_margin = 80\nfar_margin = 800\n")
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.tracker.near_margin, 80);
        assert_eq!(config.tracker.far_margin, 800);
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/file.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[").await.unwrap();

        let result = AppConfig::load(&path).await;
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    // ── Error display ─────────────────────────────────────────────────

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }

    #[test]
    fn test_timeout_delay_duration() {
        let timeout = TimeoutDescriptor::new(30, true, false);
        assert_eq!(timeout.delay(), Duration::from_secs(30));
    }
}
