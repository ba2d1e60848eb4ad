//! Per-address activity profiles

use crate::types::Transaction;
use serde::Serialize;
use std::collections::HashMap;

/// How often an address has appeared across observed transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddressProfile {
    /// Number of times the address appeared as sender or recipient
    pub count: u64,
    /// `count` divided by the total mention count across all addresses
    pub frequency: f64,
}

/// Mutable table of address profiles.
///
/// Frequencies are recomputed for every tracked address after each batch,
/// so callers should observe transactions in batches rather than one by one.
#[derive(Debug, Default)]
pub struct ProfileStore {
    profiles: HashMap<String, AddressProfile>,
    total_mentions: u64,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count both endpoints of every transaction, then refresh all frequencies.
    pub fn observe(&mut self, transactions: &[Transaction]) {
        for tx in transactions {
            for address in [&tx.from, &tx.to] {
                self.profiles.entry(address.clone()).or_default().count += 1;
                self.total_mentions += 1;
            }
        }

        if self.total_mentions == 0 {
            return;
        }

        let total = self.total_mentions as f64;
        for profile in self.profiles.values_mut() {
            profile.frequency = profile.count as f64 / total;
        }
    }

    /// Frequency of an address, 0.0 if it has never been observed
    pub fn frequency(&self, address: &str) -> f64 {
        self.profiles
            .get(address)
            .map(|p| p.frequency)
            .unwrap_or(0.0)
    }

    pub fn get(&self, address: &str) -> Option<&AddressProfile> {
        self.profiles.get(address)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn total_mentions(&self) -> u64 {
        self.total_mentions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AddressProfile)> {
        self.profiles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(from: &str, to: &str) -> Transaction {
        Transaction::new(from, to, 1.0, 1.0, 21000.0, 0)
    }

    #[test]
    fn test_frequencies_sum_to_one() {
        let mut store = ProfileStore::new();
        store.observe(&[tx("a", "b"), tx("a", "c"), tx("b", "c")]);

        let sum: f64 = store.iter().map(|(_, p)| p.frequency).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(store.len(), 3);
        assert_eq!(store.total_mentions(), 6);
    }

    #[test]
    fn test_frequency_is_count_over_total() {
        let mut store = ProfileStore::new();
        store.observe(&[tx("a", "b"), tx("a", "c")]);
        store.observe(&[tx("a", "d")]);

        let a = store.get("a").unwrap();
        assert_eq!(a.count, 3);
        assert!((a.frequency - 0.5).abs() < 1e-12);
        assert!((store.frequency("d") - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_address_has_zero_frequency() {
        let store = ProfileStore::new();
        assert_eq!(store.frequency("nobody"), 0.0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut store = ProfileStore::new();
        store.observe(&[]);
        assert!(store.is_empty());
        assert_eq!(store.total_mentions(), 0);
    }
}
