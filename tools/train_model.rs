//! Offline Model Trainer
//!
//! Generates a synthetic transaction batch, extracts basic features and
//! trains the anomaly detector, saving it where the service will load it.
//!
//! Usage: train-model [count] [anomaly_rate] [output_path]

use anyhow::{ensure, Context};
use defi_risk_sentinel::{
    config::AppConfig, models::AnomalyDetector, scoring::KNOWN_PROTOCOLS, FeatureExtractor,
    Transaction,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

const WALLET_POOL: usize = 200;
const BATCH_START: i64 = 1_700_000_000;

/// Synthetic transaction generator
struct TransactionGenerator {
    rng: StdRng,
    clock: i64,
}

impl TransactionGenerator {
    fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            clock: BATCH_START,
        }
    }

    fn tick(&mut self) -> i64 {
        self.clock += self.rng.gen_range(1..120);
        self.clock
    }

    /// A wallet interacting with a well-known protocol
    fn generate_normal(&mut self) -> Transaction {
        let wallet = format!("0x{:040x}", self.rng.gen_range(0..WALLET_POOL));
        let protocol = KNOWN_PROTOCOLS[self.rng.gen_range(0..KNOWN_PROTOCOLS.len())].0;
        let timestamp = self.tick();

        Transaction::new(
            &wallet,
            protocol,
            self.rng.gen_range(0.01..25.0),
            self.rng.gen_range(15.0..60.0) * 1e9,
            self.rng.gen_range(21_000.0..250_000.0),
            timestamp,
        )
    }

    /// A one-off address moving an outsized amount at an extreme gas price
    fn generate_extreme(&mut self) -> Transaction {
        let from = format!("0x{:040x}", self.rng.gen::<u64>());
        let to = format!("0x{:040x}", self.rng.gen::<u64>());
        let timestamp = self.tick();

        Transaction::new(
            &from,
            &to,
            self.rng.gen_range(5_000.0..100_000.0),
            self.rng.gen_range(500.0..3_000.0) * 1e9,
            self.rng.gen_range(1_000_000.0..8_000_000.0),
            timestamp,
        )
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("train_model=info".parse()?)
                .add_directive("defi_risk_sentinel=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    let args: Vec<String> = std::env::args().collect();
    let count: usize = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(5_000);
    let anomaly_rate: f64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(0.03);
    let output = args
        .get(3)
        .cloned()
        .unwrap_or_else(|| config.models.model_path.clone());

    ensure!(count >= 2, "need at least 2 transactions to train");
    ensure!(
        (0.0..1.0).contains(&anomaly_rate),
        "anomaly rate must be in [0, 1)"
    );

    info!(
        count = count,
        anomaly_rate = anomaly_rate,
        output = %output,
        "Generating training batch"
    );

    let mut generator = TransactionGenerator::new(config.models.seed);
    let mut extreme_count = 0;
    let batch: Vec<Transaction> = (0..count)
        .map(|_| {
            if generator.rng.gen_bool(anomaly_rate) {
                extreme_count += 1;
                generator.generate_extreme()
            } else {
                generator.generate_normal()
            }
        })
        .collect();

    let mut extractor = FeatureExtractor::new();
    extractor.update_address_profiles(&batch);
    let matrix = extractor.extract_basic_matrix(&batch);

    info!(
        rows = matrix.len(),
        features = extractor.feature_count(),
        extreme = extreme_count,
        tracked_addresses = extractor.profiles().len(),
        "Feature matrix ready"
    );

    let mut detector = AnomalyDetector::new(config.models.forest_params());
    detector.train(&matrix).context("Training failed")?;

    if let Some(parent) = std::path::Path::new(&output).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    detector.save(&output).context("Failed to save model")?;

    let flagged = matrix
        .iter()
        .filter_map(|row| detector.get_anomaly_score(row).ok())
        .filter(|score| *score > config.detection.anomaly_threshold)
        .count();

    info!(
        path = %output,
        flagged_in_training = flagged,
        threshold = config.detection.anomaly_threshold,
        "Model saved"
    );

    Ok(())
}
