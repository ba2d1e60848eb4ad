//! Startup model loading with fallback to the unfitted state

use super::detector::AnomalyDetector;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Outcome of a startup load
#[derive(Debug)]
pub enum LoadedModel {
    /// Artifact restored and ready for inference
    Fitted(AnomalyDetector),
    /// No usable artifact; scoring must stay on the mock path
    Unfitted { reason: String },
}

impl LoadedModel {
    pub fn into_detector(self) -> Option<AnomalyDetector> {
        match self {
            LoadedModel::Fitted(detector) => Some(detector),
            LoadedModel::Unfitted { .. } => None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, LoadedModel::Fitted(_))
    }
}

/// Loader for the persisted anomaly detector artifact
pub struct ModelLoader {
    model_path: PathBuf,
}

impl ModelLoader {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Load the artifact, converting a missing or corrupt file into `Unfitted`.
    pub fn load(&self) -> LoadedModel {
        let path = &self.model_path;
        info!(path = %path.display(), "Looking for anomaly detector model");

        if !path.exists() {
            warn!(path = %path.display(), "Anomaly detector model not found, using mock scoring");
            return LoadedModel::Unfitted {
                reason: format!("{} not found", path.display()),
            };
        }

        match AnomalyDetector::load(path) {
            Ok(detector) => {
                info!(
                    path = %path.display(),
                    features = detector.n_features().unwrap_or(0),
                    "Anomaly detector model loaded"
                );
                LoadedModel::Fitted(detector)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to load anomaly detector model");
                LoadedModel::Unfitted {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = ModelLoader::new(dir.path().join("absent.json")).load();

        assert!(!loaded.is_fitted());
        assert!(loaded.into_detector().is_none());
    }

    #[test]
    fn test_corrupt_artifact_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        std::fs::write(&path, "not json").unwrap();

        match ModelLoader::new(&path).load() {
            LoadedModel::Unfitted { reason } => assert!(reason.contains("failed to load model")),
            LoadedModel::Fitted(_) => panic!("corrupt artifact must not load"),
        }
    }

    #[test]
    fn test_split_on_unknown_feature_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let rows: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64, (i * 7 % 11) as f64]).collect();
        let mut detector = AnomalyDetector::default();
        detector.train(&rows).unwrap();
        detector.save(&path).unwrap();

        let artifact = std::fs::read_to_string(&path).unwrap();
        assert!(artifact.contains("\"feature\":0") || artifact.contains("\"feature\":1"));
        let edited = artifact
            .replace("\"feature\":0", "\"feature\":99")
            .replace("\"feature\":1", "\"feature\":99");
        std::fs::write(&path, edited).unwrap();

        match ModelLoader::new(&path).load() {
            LoadedModel::Unfitted { reason } => assert!(reason.contains("feature 99")),
            LoadedModel::Fitted(_) => panic!("artifact with an out-of-range split must not load"),
        }
    }

    #[test]
    fn test_valid_artifact_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut detector = AnomalyDetector::default();
        detector
            .train(&[vec![1.0, 2.0], vec![2.0, 1.0], vec![1.5, 1.5], vec![0.5, 2.5]])
            .unwrap();
        detector.save(&path).unwrap();

        let loaded = ModelLoader::new(&path).load();
        assert!(loaded.is_fitted());
        assert_eq!(loaded.into_detector().unwrap().n_features(), Some(2));
    }
}
