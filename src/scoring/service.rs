//! Scoring service: risk lookups, anomaly decisions and portfolio aggregation

use super::schema::{FeatureMap, FeatureSchema};
use super::scorer::{AnomalyScorer, MockScorer, ModelScorer};
use super::store::RiskScoreStore;
use crate::config::AppConfig;
use crate::error::Result;
use crate::features::{network, temporal, BasicFeatures, FeatureExtractor, NetworkFeatures, TemporalFeatures};
use crate::metrics::ServiceMetrics;
use crate::models::aggregator::{round2, PortfolioAggregator};
use crate::models::AnomalyDetector;
use crate::types::{AnomalyReport, Exposure, PortfolioAssessment, RiskScore, ScoredExposure, Transaction};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{info, warn};

/// Result of observing a transaction batch
#[derive(Debug, Clone, Serialize)]
pub struct ObserveSummary {
    pub observed: usize,
    pub tracked_addresses: usize,
    pub total_mentions: u64,
}

/// Orchestrates the risk table, feature extractor and scorers.
///
/// Shared state is owned here and injected at construction: the risk table
/// carries its own lock, and the extractor's address profiles sit behind a
/// mutex so batches are applied one at a time.
pub struct ScoringService {
    store: Arc<RiskScoreStore>,
    extractor: Mutex<FeatureExtractor>,
    model: Option<ModelScorer>,
    mock: MockScorer,
    mock_mode: bool,
    aggregator: PortfolioAggregator,
    metrics: Arc<ServiceMetrics>,
    confidence: f64,
    neutral_score: u8,
}

impl ScoringService {
    /// Build the service. A detector that cannot back the model scorer
    /// (unfitted, or a width that disagrees with the schema) is dropped and
    /// scoring stays on the mock path.
    pub fn new(
        config: &AppConfig,
        store: Arc<RiskScoreStore>,
        detector: Option<AnomalyDetector>,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<Self> {
        let schema = FeatureSchema::new(&config.models.feature_schema)?;

        let model = match detector {
            Some(detector) => match ModelScorer::new(detector, schema, &config.detection) {
                Ok(scorer) => Some(scorer),
                Err(e) => {
                    warn!(error = %e, "Anomaly detector unusable, scoring will use mock mode");
                    None
                }
            },
            None => None,
        };

        let mock = MockScorer::new(store.clone(), config.scoring.seed, config.scoring.neutral_score);

        info!(
            model_loaded = model.is_some(),
            mock_mode = config.detection.mock_mode,
            "Scoring service initialized"
        );

        Ok(Self {
            store,
            extractor: Mutex::new(FeatureExtractor::new()),
            model,
            mock,
            mock_mode: config.detection.mock_mode,
            aggregator: PortfolioAggregator::new(config.scoring.high_risk_threshold),
            metrics,
            confidence: config.scoring.confidence,
            neutral_score: config.scoring.neutral_score,
        })
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn mock_mode(&self) -> bool {
        self.mock_mode
    }

    pub fn metrics(&self) -> &Arc<ServiceMetrics> {
        &self.metrics
    }

    pub fn store(&self) -> &Arc<RiskScoreStore> {
        &self.store
    }

    /// Risk score for a protocol, memoizing a placeholder for unseen addresses.
    pub fn risk_score(&self, address: &str) -> RiskScore {
        let address = address.to_lowercase();
        let risk_score = self.store.lookup(&address);
        self.metrics.record_risk_lookup();

        info!(address = %address, risk_score = risk_score, "Returning risk score");

        RiskScore {
            address,
            risk_score,
            timestamp: Utc::now().timestamp(),
            confidence: self.confidence,
        }
    }

    /// Anomaly decision for a protocol.
    ///
    /// Uses the model when mock mode is off, a fitted model is loaded and
    /// features were supplied. Any model failure falls back to the mock scorer.
    pub fn detect_anomaly(&self, address: &str, features: &FeatureMap) -> AnomalyReport {
        let start = Instant::now();
        let report = self.run_detection(address, features);
        self.metrics.record_anomaly_check(start.elapsed(), &report);

        info!(
            address = %address,
            anomaly_detected = report.anomaly_detected,
            source = ?report.source,
            "Anomaly detection result"
        );
        report
    }

    fn run_detection(&self, address: &str, features: &FeatureMap) -> AnomalyReport {
        if let Some(model) = self.model_path(features) {
            match model.detect(address, features) {
                Ok(report) => return report,
                Err(e) => {
                    warn!(address = %address, error = %e, "Model scoring failed, falling back to mock");
                    self.metrics.record_model_fallback();
                }
            }
        }

        self.mock
            .detect(address, features)
            .unwrap_or_else(|_| AnomalyReport::clear(address, self.mock.source()))
    }

    fn model_path(&self, features: &FeatureMap) -> Option<&ModelScorer> {
        if self.mock_mode || features.is_empty() {
            return None;
        }
        self.model.as_ref()
    }

    /// Value-weighted portfolio risk over table scores.
    pub fn assess_portfolio(&self, user_address: &str, exposures: &[Exposure]) -> PortfolioAssessment {
        let scored: Vec<ScoredExposure> = exposures
            .iter()
            .map(|exposure| match &exposure.protocol_address {
                Some(address) if !address.is_empty() => {
                    let table_score = self.store.peek(address);
                    ScoredExposure {
                        amount: exposure.amount,
                        risk_score: table_score.unwrap_or(self.neutral_score),
                        table_score: table_score.unwrap_or(0),
                        has_address: true,
                    }
                }
                _ => ScoredExposure {
                    amount: exposure.amount,
                    risk_score: 0,
                    table_score: 0,
                    has_address: false,
                },
            })
            .collect();

        let aggregated = self.aggregator.aggregate(&scored);
        self.metrics.record_portfolio();

        info!(
            user_address = %user_address,
            risk_score = aggregated.risk_score,
            exposures = aggregated.exposure_count,
            "User risk assessment"
        );

        PortfolioAssessment {
            user_address: user_address.to_string(),
            risk_score: round2(aggregated.risk_score),
            timestamp: Utc::now().timestamp(),
            exposure_count: aggregated.exposure_count,
            high_risk_exposure_count: aggregated.high_risk_count,
        }
    }

    /// Feed a batch into the address profiles.
    pub fn observe_transactions(&self, transactions: &[Transaction]) -> ObserveSummary {
        let mut extractor = self.extractor();
        extractor.update_address_profiles(transactions);
        self.metrics.record_observed(transactions.len());

        let profiles = extractor.profiles();
        ObserveSummary {
            observed: transactions.len(),
            tracked_addresses: profiles.len(),
            total_mentions: profiles.total_mentions(),
        }
    }

    pub fn basic_features(&self, record: &Value) -> Result<BasicFeatures> {
        self.extractor().extract_basic_features_from_record(record)
    }

    /// Batch-local; does not touch the address profiles.
    pub fn temporal_features(&self, transactions: &[Transaction]) -> Vec<TemporalFeatures> {
        temporal::extract(transactions)
    }

    pub fn network_features(&self, transactions: &[Transaction]) -> Vec<NetworkFeatures> {
        network::extract(transactions)
    }

    fn extractor(&self) -> MutexGuard<'_, FeatureExtractor> {
        self.extractor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
