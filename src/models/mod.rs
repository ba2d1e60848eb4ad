//! Anomaly model components

pub mod aggregator;
pub mod detector;
pub mod isolation_forest;
pub mod loader;
pub mod scaler;

pub use aggregator::PortfolioAggregator;
pub use detector::{AnomalyDetector, Prediction};
pub use isolation_forest::{ForestParams, IsolationForest};
pub use loader::{LoadedModel, ModelLoader};
pub use scaler::StandardScaler;
