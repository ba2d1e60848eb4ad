//! Process-wide protocol risk table

use crate::config::ScoringConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::debug;

/// Protocols with a known score: (address, score, name)
pub const KNOWN_PROTOCOLS: [(&str, u8, &str); 8] = [
    ("0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9", 25, "Aave"),
    ("0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", 40, "Uniswap"),
    ("0xc00e94cb662c3520282e6f5717214004a7f26888", 35, "Compound"),
    ("0x9f8f72aa9304c8b593d555f12ef6589cc3a579a2", 30, "MakerDAO"),
    ("0x6b175474e89094c44da98b954eedeac495271d0f", 20, "DAI"),
    ("0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", 15, "Wrapped Bitcoin"),
    ("0x514910771af9ca656af840dff83e8264ecf986ca", 72, "Chainlink"),
    ("0x0bc529c00c6401aef6d220be8c6ea1667f6ad93e", 55, "Yearn Finance"),
];

/// Address -> risk score (0..=100), keyed by lowercased address.
///
/// Reads share a lock; first-time lookups of unseen addresses take the write
/// lock, draw a placeholder score and memoize it for the process lifetime.
pub struct RiskScoreStore {
    scores: RwLock<HashMap<String, u8>>,
    rng: Mutex<StdRng>,
    unknown_range: RangeInclusive<u8>,
}

impl RiskScoreStore {
    /// Store seeded with `KNOWN_PROTOCOLS`
    pub fn new(config: &ScoringConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let scores = KNOWN_PROTOCOLS
            .iter()
            .map(|(address, score, _)| (address.to_string(), *score))
            .collect();

        Self {
            scores: RwLock::new(scores),
            rng: Mutex::new(rng),
            unknown_range: config.unknown_min..=config.unknown_max,
        }
    }

    /// Score for an address, assigning and memoizing a placeholder if unseen.
    pub fn lookup(&self, address: &str) -> u8 {
        let key = address.to_lowercase();

        if let Some(score) = self.peek(&key) {
            return score;
        }

        let mut scores = self.scores.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have filled the entry between the two locks
        *scores.entry(key).or_insert_with_key(|key| {
            let score = self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .gen_range(self.unknown_range.clone());
            debug!(address = %key, score = score, "Assigned placeholder risk score");
            score
        })
    }

    /// Score for an address without assigning one
    pub fn peek(&self, address: &str) -> Option<u8> {
        self.scores
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address.to_lowercase())
            .copied()
    }

    /// Set a score explicitly, clamped to 100
    pub fn insert(&self, address: &str, score: u8) {
        self.scores
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.to_lowercase(), score.min(100));
    }

    pub fn len(&self) -> usize {
        self.scores.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RiskScoreStore {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}
