//! Anomaly verdicts returned by the scoring service

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Anomaly severity tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// Tier a model anomaly score. Bounds are strict: a score equal to a
    /// threshold falls into the lower tier.
    pub fn from_score(score: f64, thresholds: &SeverityThresholds) -> Self {
        if score > thresholds.high {
            Severity::High
        } else if score > thresholds.medium {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Configurable severity thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            medium: 0.75,
            high: 0.85,
        }
    }
}

/// Category attached to a flagged anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    MlDetected,
    PriceSpike,
    LiquidityDrop,
    UnusualActivity,
    GovernanceRisk,
}

impl AnomalyKind {
    /// Kinds the mock scorer draws from
    pub const SIMULATED: [AnomalyKind; 4] = [
        AnomalyKind::PriceSpike,
        AnomalyKind::LiquidityDrop,
        AnomalyKind::UnusualActivity,
        AnomalyKind::GovernanceRisk,
    ];
}

/// Which scorer produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Model,
    Mock,
}

/// Anomaly decision for a protocol address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// Unique report identifier
    pub report_id: String,

    /// Protocol address the decision applies to
    pub address: String,

    /// Unix timestamp (seconds) of the decision
    pub timestamp: i64,

    pub anomaly_detected: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anomaly_type: Option<AnomalyKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub source: ScoreSource,
}

impl AnomalyReport {
    /// A report with no anomaly attached
    pub fn clear(address: &str, source: ScoreSource) -> Self {
        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            address: address.to_string(),
            timestamp: Utc::now().timestamp(),
            anomaly_detected: false,
            anomaly_score: None,
            anomaly_type: None,
            severity: None,
            description: None,
            source,
        }
    }

    /// A flagged report
    pub fn flagged(
        address: &str,
        source: ScoreSource,
        score: f64,
        kind: AnomalyKind,
        severity: Severity,
        description: &str,
    ) -> Self {
        Self {
            anomaly_detected: true,
            anomaly_score: Some(score),
            anomaly_type: Some(kind),
            severity: Some(severity),
            description: Some(description.to_string()),
            ..Self::clear(address, source)
        }
    }

    /// Attach the raw score to a non-flagged report
    pub fn with_score(mut self, score: f64) -> Self {
        self.anomaly_score = Some(score);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_score() {
        let thresholds = SeverityThresholds::default();

        assert_eq!(Severity::from_score(0.72, &thresholds), Severity::Low);
        assert_eq!(Severity::from_score(0.75, &thresholds), Severity::Low);
        assert_eq!(Severity::from_score(0.8, &thresholds), Severity::Medium);
        assert_eq!(Severity::from_score(0.85, &thresholds), Severity::Medium);
        assert_eq!(Severity::from_score(0.9, &thresholds), Severity::High);
    }

    #[test]
    fn test_report_serialization() {
        let report = AnomalyReport::flagged(
            "0xabc",
            ScoreSource::Model,
            0.9,
            AnomalyKind::MlDetected,
            Severity::High,
            "unusual",
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["anomaly_detected"], true);
        assert_eq!(json["anomaly_type"], "ml_detected");
        assert_eq!(json["severity"], "high");
        assert_eq!(json["source"], "model");
    }

    #[test]
    fn test_clear_report_omits_optional_fields() {
        let report = AnomalyReport::clear("0xabc", ScoreSource::Mock);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["anomaly_detected"], false);
        assert!(json.get("anomaly_score").is_none());
        assert!(json.get("severity").is_none());
    }
}
