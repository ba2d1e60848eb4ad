//! Value-weighted aggregation of protocol risk across a portfolio

use crate::types::ScoredExposure;

/// Summary of a weighted aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRisk {
    /// Value-weighted mean risk, unrounded
    pub risk_score: f64,
    pub total_value: f64,
    pub exposure_count: usize,
    pub high_risk_count: usize,
}

/// Aggregates per-exposure risk scores into a portfolio score.
pub struct PortfolioAggregator {
    /// Protocol score at or above which an exposure counts as high risk
    high_risk_threshold: u8,
}

impl PortfolioAggregator {
    pub fn new(high_risk_threshold: u8) -> Self {
        Self { high_risk_threshold }
    }

    /// Weighted average of risk scores by amount.
    ///
    /// Exposures without an address or with a non-positive amount carry no
    /// weight but are still counted. Zero total value yields a score of 0.
    pub fn aggregate(&self, exposures: &[ScoredExposure]) -> AggregatedRisk {
        let mut weighted_sum = 0.0;
        let mut total_value = 0.0;

        for exposure in exposures
            .iter()
            .filter(|e| e.has_address && e.amount > 0.0)
        {
            weighted_sum += exposure.amount * exposure.risk_score as f64;
            total_value += exposure.amount;
        }

        let risk_score = if total_value > 0.0 {
            weighted_sum / total_value
        } else {
            0.0
        };

        AggregatedRisk {
            risk_score,
            total_value,
            exposure_count: exposures.len(),
            high_risk_count: exposures
                .iter()
                .filter(|e| e.has_address && e.table_score >= self.high_risk_threshold)
                .count(),
        }
    }

    pub fn high_risk_threshold(&self) -> u8 {
        self.high_risk_threshold
    }
}

impl Default for PortfolioAggregator {
    fn default() -> Self {
        Self::new(70)
    }
}

/// Round to two decimals for presentation
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
