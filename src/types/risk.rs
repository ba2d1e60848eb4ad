//! Protocol risk lookups

use serde::{Deserialize, Serialize};

/// Risk score for one protocol address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskScore {
    /// Lowercased protocol address
    pub address: String,
    /// Score in 0..=100, higher is riskier
    pub risk_score: u8,
    pub timestamp: i64,
    pub confidence: f64,
}
