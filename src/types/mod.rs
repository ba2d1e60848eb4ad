//! Type definitions for the risk sentinel

pub mod anomaly;
pub mod portfolio;
pub mod risk;
pub mod transaction;

pub use anomaly::{AnomalyKind, AnomalyReport, ScoreSource, Severity, SeverityThresholds};
pub use portfolio::{Exposure, PortfolioAssessment, ScoredExposure};
pub use risk::RiskScore;
pub use transaction::Transaction;
