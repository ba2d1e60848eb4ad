//! Transaction-graph features

use super::guarded_ratio;
use crate::types::Transaction;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Graph position of one sender address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkFeatures {
    pub address: String,
    pub out_degree: usize,
    pub in_degree: usize,
    /// Density of the whole batch graph, identical on every row
    pub density: f64,
}

impl NetworkFeatures {
    pub const NAMES: [&'static str; 3] = ["out_degree", "in_degree", "density"];

    pub fn to_vector(&self) -> Vec<f64> {
        vec![self.out_degree as f64, self.in_degree as f64, self.density]
    }
}

/// Build the directed graph of unique (from, to) edges and emit one row per
/// sender, ordered by address. An empty batch yields no rows.
pub fn extract(transactions: &[Transaction]) -> Vec<NetworkFeatures> {
    let mut senders = BTreeSet::new();
    let mut receivers = BTreeSet::new();
    let mut edges = BTreeSet::new();

    for tx in transactions {
        senders.insert(tx.from.as_str());
        receivers.insert(tx.to.as_str());
        edges.insert((tx.from.as_str(), tx.to.as_str()));
    }

    let mut out_degree: HashMap<&str, usize> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    for (from, to) in &edges {
        *out_degree.entry(from).or_default() += 1;
        *in_degree.entry(to).or_default() += 1;
    }

    let density = guarded_ratio(
        edges.len() as f64,
        (senders.len() * receivers.len()) as f64,
        "graph without senders or receivers",
    );

    senders
        .into_iter()
        .map(|address| NetworkFeatures {
            address: address.to_string(),
            out_degree: out_degree.get(address).copied().unwrap_or(0),
            in_degree: in_degree.get(address).copied().unwrap_or(0),
            density,
        })
        .collect()
}
