//! Risk lookup, anomaly decisions and portfolio scoring

pub mod schema;
pub mod scorer;
pub mod service;
pub mod store;

pub use schema::{FeatureMap, FeatureSchema};
pub use scorer::{AnomalyScorer, MockScorer, ModelScorer};
pub use service::{ObserveSummary, ScoringService};
pub use store::{RiskScoreStore, KNOWN_PROTOCOLS};
