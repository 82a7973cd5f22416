//! Configuration for the ShaftSense Agent.

use crate::core::classifier::{ConfidenceEstimator, ZoneRules};
use crate::core::filter::TrackingMode;
use crate::core::report::DEFAULT_FAULT_CODE;
use crate::core::session::SessionConfig;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Tracking context, selects the movement threshold
    pub tracking_mode: TrackingMode,

    /// Explicit movement threshold, overrides the mode when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_threshold: Option<f64>,

    /// Nominal accelerometer update interval
    #[serde(with = "duration_serde")]
    pub sample_interval: Duration,

    /// Session timer heartbeat interval
    #[serde(with = "duration_serde")]
    pub tick_interval: Duration,

    /// Zone decision rules
    #[serde(default)]
    pub zone_rules: ZoneRules,

    /// Confidence cut-off
    #[serde(default)]
    pub confidence: ConfidenceEstimator,

    /// Fault code used when a job doesn't name one
    pub default_fault_code: String,

    /// IANA timezone for report summaries
    pub timezone: String,

    /// Path for exporting maintenance reports
    pub export_path: PathBuf,

    /// Path for storing state and transparency logs
    pub data_path: PathBuf,

    /// Whether tracking is currently paused
    pub paused: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shaftsense-agent");

        Self {
            tracking_mode: TrackingMode::Active,
            filter_threshold: None,
            sample_interval: Duration::from_millis(200),
            tick_interval: Duration::from_millis(1000),
            zone_rules: ZoneRules::default(),
            confidence: ConfidenceEstimator::default(),
            default_fault_code: DEFAULT_FAULT_CODE.to_string(),
            timezone: "UTC".to_string(),
            export_path: data_dir.join("reports"),
            data_path: data_dir,
            paused: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shaftsense-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// The movement threshold in effect.
    pub fn effective_threshold(&self) -> f64 {
        self.filter_threshold
            .unwrap_or_else(|| self.tracking_mode.threshold())
    }

    /// Engine parameters derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            filter_threshold: self.effective_threshold(),
            tick_interval_ms: self.tick_interval.as_millis().min(u32::MAX as u128) as u32,
        }
    }

    /// Parsed report timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidValue(format!("unknown timezone '{}'", self.timezone)))
    }

    /// Check value ranges that serde can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session_config()
            .validate()
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        if self.sample_interval.is_zero() {
            return Err(ConfigError::InvalidValue(
                "sample interval must be at least 1 ms".to_string(),
            ));
        }
        self.tz()?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Serialize error: {0}")]
    SerializeError(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Serde support for millisecond Durations.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
