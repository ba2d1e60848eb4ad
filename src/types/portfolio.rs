//! Portfolio exposure inputs and aggregated assessments

use serde::{Deserialize, Serialize};

/// A user's position in one protocol
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Exposure {
    #[serde(default)]
    pub protocol_address: Option<String>,

    #[serde(default)]
    pub amount: f64,
}

impl Exposure {
    pub fn new(protocol_address: &str, amount: f64) -> Self {
        Self {
            protocol_address: Some(protocol_address.to_string()),
            amount,
        }
    }
}

/// An exposure resolved against the risk table
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredExposure {
    pub amount: f64,
    pub risk_score: u8,
    /// Score from the risk table, 0 for protocols not in it; drives the high-risk count
    pub table_score: u8,
    /// False when the address was absent; such exposures are counted but not weighted
    pub has_address: bool,
}

/// Value-weighted risk of a user's portfolio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAssessment {
    pub user_address: String,
    /// Weighted average risk, rounded to two decimals
    pub risk_score: f64,
    pub timestamp: i64,
    pub exposure_count: usize,
    pub high_risk_exposure_count: usize,
}
