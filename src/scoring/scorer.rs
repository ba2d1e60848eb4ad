//! Anomaly scorers: the model-backed one and the simulated one

use super::schema::{FeatureMap, FeatureSchema};
use super::store::RiskScoreStore;
use crate::config::DetectionConfig;
use crate::error::{Result, SentinelError};
use crate::models::AnomalyDetector;
use crate::types::{AnomalyKind, AnomalyReport, ScoreSource, Severity, SeverityThresholds};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const MODEL_DESCRIPTION: &str = "Machine learning model detected unusual patterns in protocol data.";
const MOCK_DESCRIPTION: &str = "Unusual activity detected in protocol operations.";

/// Produces an anomaly decision for a protocol address
pub trait AnomalyScorer: Send + Sync {
    fn source(&self) -> ScoreSource;

    fn detect(&self, address: &str, features: &FeatureMap) -> Result<AnomalyReport>;
}

/// Scores a feature map with the fitted detector
pub struct ModelScorer {
    detector: AnomalyDetector,
    schema: FeatureSchema,
    threshold: f64,
    severity: SeverityThresholds,
}

impl ModelScorer {
    /// Fails if the detector is unfitted or its width differs from the schema.
    pub fn new(detector: AnomalyDetector, schema: FeatureSchema, detection: &DetectionConfig) -> Result<Self> {
        let width = detector.n_features().ok_or(SentinelError::NotFitted)?;
        if width != schema.len() {
            return Err(SentinelError::Inference(format!(
                "model expects {} features but schema has {} slots",
                width,
                schema.len()
            )));
        }

        Ok(Self {
            detector,
            schema,
            threshold: detection.anomaly_threshold,
            severity: detection.severity.clone(),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }
}

impl AnomalyScorer for ModelScorer {
    fn source(&self) -> ScoreSource {
        ScoreSource::Model
    }

    fn detect(&self, address: &str, features: &FeatureMap) -> Result<AnomalyReport> {
        if features.is_empty() {
            return Err(SentinelError::Inference("no features supplied".to_string()));
        }

        let vector = self.schema.vectorize(features)?;
        let score = self.detector.get_anomaly_score(&vector)?;

        debug!(address = %address, score = score, threshold = self.threshold, "Model anomaly score");

        if score > self.threshold {
            Ok(AnomalyReport::flagged(
                address,
                ScoreSource::Model,
                score,
                AnomalyKind::MlDetected,
                Severity::from_score(score, &self.severity),
                MODEL_DESCRIPTION,
            ))
        } else {
            Ok(AnomalyReport::clear(address, ScoreSource::Model).with_score(score))
        }
    }
}

/// Simulated decisions: riskier protocols are flagged more often.
///
/// The flag probability is the protocol's table score / 100, using the
/// neutral score for protocols not in the table.
pub struct MockScorer {
    store: Arc<RiskScoreStore>,
    rng: Mutex<StdRng>,
    neutral_score: u8,
}

impl MockScorer {
    pub fn new(store: Arc<RiskScoreStore>, seed: Option<u64>, neutral_score: u8) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            store,
            rng: Mutex::new(rng),
            neutral_score,
        }
    }

    /// Probability that `address` is flagged
    pub fn anomaly_probability(&self, address: &str) -> f64 {
        self.store.peek(address).unwrap_or(self.neutral_score) as f64 / 100.0
    }
}

impl AnomalyScorer for MockScorer {
    fn source(&self) -> ScoreSource {
        ScoreSource::Mock
    }

    fn detect(&self, address: &str, _features: &FeatureMap) -> Result<AnomalyReport> {
        let probability = self.anomaly_probability(address);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        if rng.gen::<f64>() >= probability {
            return Ok(AnomalyReport::clear(address, ScoreSource::Mock));
        }

        let score = rng.gen_range(0.7..0.95);
        let kind = *AnomalyKind::SIMULATED
            .choose(&mut *rng)
            .unwrap_or(&AnomalyKind::UnusualActivity);
        let severity = *Severity::ALL.choose(&mut *rng).unwrap_or(&Severity::Low);

        Ok(AnomalyReport::flagged(
            address,
            ScoreSource::Mock,
            score,
            kind,
            severity,
            MOCK_DESCRIPTION,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use serde_json::json;

    fn trained_detector() -> AnomalyDetector {
        let rows: Vec<Vec<f64>> = (0..100)
            .map(|i| {
                let x = (i % 10) as f64;
                let y = (i / 10) as f64;
                vec![x, y, x + y, 0.01 * x, 0.01 * y]
            })
            .collect();
        let mut detector = AnomalyDetector::default();
        detector.train(&rows).unwrap();
        detector
    }

    fn features(value: serde_json::Value) -> FeatureMap {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_model_scorer_flags_outlier() {
        let scorer = ModelScorer::new(
            trained_detector(),
            FeatureSchema::basic(),
            &DetectionConfig {
                anomaly_threshold: 0.6,
                ..Default::default()
            },
        )
        .unwrap();

        let report = scorer
            .detect(
                "0xabc",
                &features(json!({
                    "value": 500, "gas_price": -400, "gas_used": 900,
                    "from_frequency": 30, "to_frequency": -30
                })),
            )
            .unwrap();

        assert!(report.anomaly_detected);
        assert_eq!(report.source, ScoreSource::Model);
        assert_eq!(report.anomaly_type, Some(AnomalyKind::MlDetected));
        assert!(report.anomaly_score.unwrap() > 0.6);
    }

    #[test]
    fn test_model_scorer_clear_below_threshold() {
        let scorer = ModelScorer::new(
            trained_detector(),
            FeatureSchema::basic(),
            &DetectionConfig {
                anomaly_threshold: 0.99,
                ..Default::default()
            },
        )
        .unwrap();

        let report = scorer
            .detect(
                "0xabc",
                &features(json!({
                    "value": 4.5, "gas_price": 4.5, "gas_used": 9,
                    "from_frequency": 0.045, "to_frequency": 0.045
                })),
            )
            .unwrap();

        assert!(!report.anomaly_detected);
        assert!(report.anomaly_score.is_some());
    }

    #[test]
    fn test_model_scorer_rejects_bad_input() {
        let scorer = ModelScorer::new(trained_detector(), FeatureSchema::basic(), &DetectionConfig::default())
            .unwrap();

        assert!(scorer.detect("0xabc", &FeatureMap::new()).is_err());
        assert!(scorer
            .detect("0xabc", &features(json!({"value": "abc"})))
            .is_err());
    }

    #[test]
    fn test_model_scorer_requires_matching_schema() {
        let schema = FeatureSchema::new(&["a", "b"]).unwrap();
        assert!(ModelScorer::new(trained_detector(), schema, &DetectionConfig::default()).is_err());
        assert!(matches!(
            ModelScorer::new(AnomalyDetector::default(), FeatureSchema::basic(), &DetectionConfig::default()),
            Err(SentinelError::NotFitted)
        ));
    }

    #[test]
    fn test_mock_probability_tracks_base_score() {
        let store = Arc::new(RiskScoreStore::new(&ScoringConfig::default()));
        store.insert("0xsafe", 0);
        store.insert("0xdoomed", 100);
        let scorer = MockScorer::new(store, Some(1), 50);

        assert_eq!(scorer.anomaly_probability("0xunknown"), 0.5);
        for _ in 0..50 {
            assert!(!scorer.detect("0xsafe", &FeatureMap::new()).unwrap().anomaly_detected);

            let report = scorer.detect("0xdoomed", &FeatureMap::new()).unwrap();
            assert!(report.anomaly_detected);
            let score = report.anomaly_score.unwrap();
            assert!((0.7..0.95).contains(&score));
            assert!(report.anomaly_type.is_some());
            assert!(report.severity.is_some());
            assert_eq!(report.source, ScoreSource::Mock);
        }
    }

    #[test]
    fn test_mock_does_not_memoize_unknown_addresses() {
        let store = Arc::new(RiskScoreStore::new(&ScoringConfig::default()));
        let scorer = MockScorer::new(store.clone(), Some(1), 50);

        scorer.detect("0xnew", &FeatureMap::new()).unwrap();
        assert_eq!(store.peek("0xnew"), None);
    }
}
