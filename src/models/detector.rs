//! Anomaly detector: a fitted scaler paired with an isolation forest

use super::isolation_forest::{ForestParams, IsolationForest};
use super::scaler::StandardScaler;
use crate::error::{Result, SentinelError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Binary decision for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Anomalous,
    Normal,
}

impl Prediction {
    /// Conventional outlier label: -1 anomalous, 1 normal
    pub fn label(&self) -> i8 {
        match self {
            Prediction::Anomalous => -1,
            Prediction::Normal => 1,
        }
    }
}

/// Scaler and forest fitted on the same batch; never used apart.
#[derive(Debug, Clone)]
struct FittedModel {
    scaler: StandardScaler,
    forest: IsolationForest,
}

/// On-disk artifact: exactly the two fitted components.
#[derive(Serialize)]
struct ArtifactRef<'a> {
    scaler: &'a StandardScaler,
    detector: &'a IsolationForest,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Artifact {
    scaler: StandardScaler,
    detector: IsolationForest,
}

/// Transaction anomaly detector.
///
/// The scaler is fit once in `train` and reused at inference time, so a
/// saved and reloaded detector scores identically to the original.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    params: ForestParams,
    model: Option<FittedModel>,
}

impl AnomalyDetector {
    pub fn new(params: ForestParams) -> Self {
        Self { params, model: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.model.is_some()
    }

    /// Width of the feature vectors the fitted model expects
    pub fn n_features(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.forest.n_features())
    }

    /// Scale rows with the parameters learned at training time.
    pub fn preprocess(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.fitted()?.scaler.transform(rows)
    }

    /// Fit scaler and forest together, replacing any previous state.
    pub fn train(&mut self, rows: &[Vec<f64>]) -> Result<()> {
        let scaler = StandardScaler::fit(rows)?;
        let scaled = scaler.transform(rows)?;
        let forest = IsolationForest::fit(&scaled, self.params.clone())?;

        info!(
            samples = rows.len(),
            features = scaler.width(),
            trees = forest.n_trees(),
            offset = forest.offset(),
            "Anomaly detector trained"
        );

        self.model = Some(FittedModel { scaler, forest });
        Ok(())
    }

    pub fn predict(&self, vector: &[f64]) -> Result<Prediction> {
        let model = self.fitted()?;
        let scaled = model.scaler.transform_row(vector)?;

        Ok(if model.forest.is_outlier(&scaled)? {
            Prediction::Anomalous
        } else {
            Prediction::Normal
        })
    }

    /// Anomaly score, higher meaning more anomalous (negated raw forest score).
    pub fn get_anomaly_score(&self, vector: &[f64]) -> Result<f64> {
        let model = self.fitted()?;
        let scaled = model.scaler.transform_row(vector)?;
        let score = -model.forest.score_samples(&scaled)?;

        debug!(score = score, "Anomaly score computed");
        Ok(score)
    }

    /// Write the paired artifact to `path` via a temporary sibling file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let model = self.fitted()?;
        let save_err = |reason: String| SentinelError::ModelSave {
            path: path.to_path_buf(),
            reason,
        };

        let payload = serde_json::to_vec(&ArtifactRef {
            scaler: &model.scaler,
            detector: &model.forest,
        })
        .map_err(|e| save_err(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| save_err(e.to_string()))?;
        }

        let file_name = path
            .file_name()
            .ok_or_else(|| save_err("path has no file name".to_string()))?;
        let tmp_path = path.with_file_name(format!(".{}.tmp", file_name.to_string_lossy()));

        fs::write(&tmp_path, payload).map_err(|e| save_err(e.to_string()))?;
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            save_err(e.to_string())
        })?;

        info!(path = %path.display(), "Anomaly detector saved");
        Ok(())
    }

    /// Restore a detector saved with `save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let load_err = |reason: String| SentinelError::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        let bytes = fs::read(path).map_err(|e| load_err(e.to_string()))?;
        let artifact: Artifact = serde_json::from_slice(&bytes).map_err(|e| load_err(e.to_string()))?;

        artifact
            .scaler
            .validate()
            .and_then(|_| artifact.detector.validate())
            .map_err(|e| load_err(e.to_string()))?;

        if artifact.scaler.width() != artifact.detector.n_features() {
            return Err(load_err(format!(
                "scaler width {} does not match detector width {}",
                artifact.scaler.width(),
                artifact.detector.n_features()
            )));
        }

        Ok(Self {
            params: artifact.detector.params().clone(),
            model: Some(FittedModel {
                scaler: artifact.scaler,
                forest: artifact.detector,
            }),
        })
    }

    fn fitted(&self) -> Result<&FittedModel> {
        self.model.as_ref().ok_or(SentinelError::NotFitted)
    }
}
