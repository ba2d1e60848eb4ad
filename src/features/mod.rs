//! Feature extraction from raw transaction batches.
//!
//! Three extractors are provided:
//! - basic: one 5-dim row per transaction, using address frequencies from
//!   the profile store
//! - temporal: one row per sender (frequency, mean value, gas volatility)
//! - network: one row per sender from the unique-edge transaction graph

pub mod network;
pub mod profiles;
pub mod temporal;

pub use network::NetworkFeatures;
pub use profiles::{AddressProfile, ProfileStore};
pub use temporal::TemporalFeatures;

use crate::error::{Result, SentinelError};
use crate::types::Transaction;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Basic per-transaction features
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicFeatures {
    pub value: f64,
    pub gas_price: f64,
    pub gas_used: f64,
    pub from_frequency: f64,
    pub to_frequency: f64,
}

impl BasicFeatures {
    pub const NAMES: [&'static str; 5] = [
        "value",
        "gas_price",
        "gas_used",
        "from_frequency",
        "to_frequency",
    ];

    pub fn to_vector(&self) -> Vec<f64> {
        vec![
            self.value,
            self.gas_price,
            self.gas_used,
            self.from_frequency,
            self.to_frequency,
        ]
    }
}

/// Feature extractor that turns transactions into model input rows.
///
/// Holds the address profiles across calls. Basic features are only
/// informative once profiles have been warmed with `update_address_profiles`;
/// before that both frequency slots are 0.0.
#[derive(Debug, Default)]
pub struct FeatureExtractor {
    profiles: ProfileStore,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract `[value, gasPrice, gasUsed, freq(from), freq(to)]`.
    pub fn extract_basic_features(&self, tx: &Transaction) -> BasicFeatures {
        BasicFeatures {
            value: tx.value,
            gas_price: tx.gas_price,
            gas_used: tx.gas_used,
            from_frequency: self.profiles.frequency(&tx.from),
            to_frequency: self.profiles.frequency(&tx.to),
        }
    }

    /// Basic features for an untyped record; absent keys fail with `MissingField`.
    pub fn extract_basic_features_from_record(&self, record: &Value) -> Result<BasicFeatures> {
        let tx = Transaction::from_record(record)?;
        Ok(self.extract_basic_features(&tx))
    }

    /// Basic feature matrix for a batch, one row per transaction in input order.
    pub fn extract_basic_matrix(&self, transactions: &[Transaction]) -> Vec<Vec<f64>> {
        transactions
            .iter()
            .map(|tx| self.extract_basic_features(tx).to_vector())
            .collect()
    }

    pub fn extract_temporal_features(&self, transactions: &[Transaction]) -> Vec<TemporalFeatures> {
        temporal::extract(transactions)
    }

    pub fn extract_network_features(&self, transactions: &[Transaction]) -> Vec<NetworkFeatures> {
        network::extract(transactions)
    }

    /// Count every endpoint of the batch and refresh all address frequencies.
    pub fn update_address_profiles(&mut self, transactions: &[Transaction]) {
        self.profiles.observe(transactions);
        debug!(
            batch = transactions.len(),
            tracked = self.profiles.len(),
            "Address profiles updated"
        );
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    /// Number of basic features produced per transaction
    pub fn feature_count(&self) -> usize {
        BasicFeatures::NAMES.len()
    }

    pub fn feature_names(&self) -> Vec<&'static str> {
        BasicFeatures::NAMES.to_vec()
    }
}

/// Ratio that reports a zero or non-finite denominator as `DegenerateGroup`.
pub(crate) fn checked_ratio(numerator: f64, denominator: f64, context: &str) -> Result<f64> {
    if denominator == 0.0 || !denominator.is_finite() {
        return Err(SentinelError::DegenerateGroup(context.to_string()));
    }
    Ok(numerator / denominator)
}

/// `checked_ratio` with degenerate cases resolved to 0.0
pub(crate) fn guarded_ratio(numerator: f64, denominator: f64, context: &str) -> f64 {
    checked_ratio(numerator, denominator, context).unwrap_or_else(|e| {
        debug!(error = %e, "Degenerate ratio resolved to 0.0");
        0.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tx(from: &str, to: &str, value: f64) -> Transaction {
        Transaction::new(from, to, value, 30e9, 21000.0, 1_700_000_000)
    }

    #[test]
    fn test_basic_features_copy_raw_values() {
        let extractor = FeatureExtractor::new();
        let t = Transaction::new("0xa", "0xb", 123.456, 7.25, 51234.0, 0);

        let features = extractor.extract_basic_features(&t).to_vector();

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(features[0], 123.456);
        assert_eq!(features[1], 7.25);
        assert_eq!(features[2], 51234.0);
    }

    #[test]
    fn test_cold_profiles_give_zero_frequency() {
        let extractor = FeatureExtractor::new();
        let features = extractor.extract_basic_features(&tx("0xa", "0xb", 1.0));

        assert_eq!(features.from_frequency, 0.0);
        assert_eq!(features.to_frequency, 0.0);
    }

    #[test]
    fn test_warm_profiles_feed_frequencies() {
        let mut extractor = FeatureExtractor::new();
        extractor.update_address_profiles(&[tx("0xa", "0xb", 1.0), tx("0xa", "0xc", 2.0)]);

        let features = extractor.extract_basic_features(&tx("0xa", "0xb", 1.0));
        assert!((features.from_frequency - 0.5).abs() < 1e-12);
        assert!((features.to_frequency - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_record_missing_field() {
        let extractor = FeatureExtractor::new();
        let record = json!({"from": "0xa", "to": "0xb", "gasPrice": 1, "gasUsed": 1, "timestamp": 0});

        assert!(matches!(
            extractor.extract_basic_features_from_record(&record),
            Err(SentinelError::MissingField(ref f)) if f == "value"
        ));
    }

    #[test]
    fn test_basic_matrix_preserves_order() {
        let extractor = FeatureExtractor::new();
        let matrix = extractor.extract_basic_matrix(&[tx("a", "b", 1.0), tx("c", "d", 2.0)]);

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0][0], 1.0);
        assert_eq!(matrix[1][0], 2.0);
    }

    #[test]
    fn test_checked_ratio() {
        assert_eq!(checked_ratio(6.0, 3.0, "x").unwrap(), 2.0);
        assert!(matches!(
            checked_ratio(1.0, 0.0, "x"),
            Err(SentinelError::DegenerateGroup(_))
        ));
        assert_eq!(guarded_ratio(1.0, 0.0, "x"), 0.0);
    }

    #[test]
    fn test_feature_names() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_names().len(), 5);
        assert_eq!(extractor.feature_names()[3], "from_frequency");
    }
}
