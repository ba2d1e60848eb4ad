//! DeFi Risk Sentinel Library
//!
//! Risk scoring and anomaly detection for DeFi protocol addresses and user
//! portfolios: transaction feature extraction, an isolation-forest outlier
//! model, and a scoring service exposed over HTTP.

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod metrics;
pub mod models;
pub mod scoring;
pub mod types;

pub use config::AppConfig;
pub use error::{Result, SentinelError};
pub use features::FeatureExtractor;
pub use models::{AnomalyDetector, ModelLoader};
pub use scoring::ScoringService;
pub use types::{AnomalyReport, Transaction};
