//! Per-sender temporal features

use super::guarded_ratio;
use crate::types::Transaction;
use serde::Serialize;
use std::collections::BTreeMap;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Temporal profile of one sender within a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalFeatures {
    pub address: String,
    /// Transactions per hour between the sender's first and last transaction
    pub tx_frequency: f64,
    /// Mean value per transaction
    pub mean_value: f64,
    /// Sample standard deviation of gas price
    pub gas_price_std: f64,
}

impl TemporalFeatures {
    pub const NAMES: [&'static str; 3] = ["tx_frequency", "mean_value", "gas_price_std"];

    pub fn to_vector(&self) -> Vec<f64> {
        vec![self.tx_frequency, self.mean_value, self.gas_price_std]
    }
}

/// Group by sender and compute one row per distinct sender, ordered by address.
///
/// A sender with a single transaction, or whose transactions share one
/// timestamp, gets a frequency of 0.0. Gas-price deviation is 0.0 for
/// single-transaction groups.
pub fn extract(transactions: &[Transaction]) -> Vec<TemporalFeatures> {
    let mut groups: BTreeMap<&str, Vec<&Transaction>> = BTreeMap::new();
    for tx in transactions {
        groups.entry(tx.from.as_str()).or_default().push(tx);
    }

    groups
        .into_iter()
        .map(|(address, mut group)| {
            group.sort_by_key(|tx| tx.timestamp);
            summarize(address, &group)
        })
        .collect()
}

fn summarize(address: &str, group: &[&Transaction]) -> TemporalFeatures {
    let count = group.len() as f64;
    let first = group.first().map(|tx| tx.timestamp).unwrap_or(0);
    let last = group.last().map(|tx| tx.timestamp).unwrap_or(0);
    let elapsed_hours = last.saturating_sub(first) as f64 / SECONDS_PER_HOUR;

    let tx_frequency = guarded_ratio(count, elapsed_hours, "sender group spans zero time");
    let mean_value = guarded_ratio(
        group.iter().map(|tx| tx.value).sum::<f64>(),
        count,
        "empty sender group",
    );

    TemporalFeatures {
        address: address.to_string(),
        tx_frequency,
        mean_value,
        gas_price_std: sample_std(group.iter().map(|tx| tx.gas_price)),
    }
}

fn sample_std(values: impl Iterator<Item = f64>) -> f64 {
    let values: Vec<f64> = values.collect();
    let n = values.len() as f64;
    let mean = guarded_ratio(values.iter().sum::<f64>(), n, "empty gas price series");
    let squared: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();

    guarded_ratio(squared, n - 1.0, "gas price deviation of a single transaction").sqrt()
}
