//! Configuration management for the risk sentinel service

use crate::features::BasicFeatures;
use crate::models::ForestParams;
use crate::types::SeverityThresholds;
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/sentinel.toml";

/// Environment prefix, e.g. `SENTINEL_SERVER__PORT=5001`
pub const ENV_PREFIX: &str = "SENTINEL";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allow cross-origin requests from any origin
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            enable_cors: false,
        }
    }
}

/// Anomaly model configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Path of the persisted detector artifact
    pub model_path: String,
    /// Ordered feature slots the model consumes
    pub feature_schema: Vec<String>,
    pub n_estimators: usize,
    pub max_samples: usize,
    /// Expected share of outliers in training data
    pub contamination: f64,
    /// Seed for tree construction
    pub seed: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        let forest = ForestParams::default();
        Self {
            model_path: "models/anomaly_detector.json".to_string(),
            feature_schema: BasicFeatures::NAMES.iter().map(|s| s.to_string()).collect(),
            n_estimators: forest.n_estimators,
            max_samples: forest.max_samples,
            contamination: forest.contamination,
            seed: forest.seed,
        }
    }
}

impl ModelsConfig {
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_estimators: self.n_estimators,
            max_samples: self.max_samples,
            contamination: self.contamination,
            seed: self.seed,
        }
    }
}

/// Anomaly decision configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Serve simulated decisions instead of consulting the model
    pub mock_mode: bool,
    /// Model score above which a protocol is flagged
    pub anomaly_threshold: f64,
    pub severity: SeverityThresholds,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            mock_mode: true,
            anomaly_threshold: 0.7,
            severity: SeverityThresholds::default(),
        }
    }
}

/// Risk table configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Fixed RNG seed for placeholder scores and mock decisions
    pub seed: Option<u64>,
    /// Inclusive range for placeholder scores of unseen addresses
    pub unknown_min: u8,
    pub unknown_max: u8,
    /// Score used for protocols absent from the table in non-memoizing paths
    pub neutral_score: u8,
    pub high_risk_threshold: u8,
    /// Confidence reported alongside risk lookups
    pub confidence: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            seed: None,
            unknown_min: 20,
            unknown_max: 80,
            neutral_score: 50,
            high_risk_threshold: 70,
            confidence: 0.85,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between logged summaries; 0 disables the reporter
    pub report_interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 60,
        }
    }
}

impl AppConfig {
    /// Load configuration from `SENTINEL_CONFIG` or the default path, layered
    /// with `SENTINEL_*` environment variables.
    pub fn load() -> Result<Self> {
        let path = std::env::var("SENTINEL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path. The file is optional.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let scoring = &self.scoring;
        ensure!(
            scoring.unknown_min <= scoring.unknown_max && scoring.unknown_max <= 100,
            "scoring.unknown_min..=unknown_max must be a range within 0..=100"
        );
        ensure!(scoring.neutral_score <= 100, "scoring.neutral_score must be at most 100");
        ensure!(
            self.detection.severity.medium <= self.detection.severity.high,
            "detection.severity.medium must not exceed detection.severity.high"
        );
        ensure!(
            self.models.contamination > 0.0 && self.models.contamination <= 0.5,
            "models.contamination must be in (0, 0.5]"
        );
        ensure!(self.models.n_estimators > 0, "models.n_estimators must be positive");
        ensure!(
            !self.models.feature_schema.is_empty(),
            "models.feature_schema must name at least one feature"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 5001);
        assert!(config.detection.mock_mode);
        assert_eq!(config.detection.anomaly_threshold, 0.7);
        assert_eq!(config.models.contamination, 0.1);
        assert_eq!(config.models.feature_schema.len(), 5);
        assert_eq!(config.scoring.unknown_min, 20);
        assert_eq!(config.scoring.unknown_max, 80);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[detection]\nmock_mode = false\n\n[server]\nport = 9000\n\n[scoring]\nseed = 7"
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert!(!config.detection.mock_mode);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.scoring.seed, Some(7));
        // untouched sections keep defaults
        assert_eq!(config.models.n_estimators, 100);
        assert_eq!(config.detection.severity.high, 0.85);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 5001);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let mut config = AppConfig::default();
        config.scoring.unknown_min = 90;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.models.contamination = 0.9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_forest_params() {
        let params = AppConfig::default().models.forest_params();
        assert_eq!(params, ForestParams::default());
    }
}
