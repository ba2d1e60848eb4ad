//! Isolation Forest outlier detector.
//!
//! Each tree recursively partitions a random sub-sample on a random feature
//! at a random split point; outliers isolate in fewer splits. Scores follow
//! the usual convention: `score_samples` lies in [-1, 0), lower meaning more
//! abnormal, and the decision offset is the `contamination` quantile of the
//! training scores.

use super::scaler::check_matrix;
use crate::error::{Result, SentinelError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    /// Upper bound on the per-tree sub-sample
    pub max_samples: usize,
    /// Expected share of outliers in the training data
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

impl Node {
    fn validate(&self, n_features: usize) -> Result<()> {
        match self {
            Node::Leaf { .. } => Ok(()),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= n_features {
                    return Err(SentinelError::Inference(format!(
                        "split on feature {} but forest has {} features",
                        feature, n_features
                    )));
                }
                if !threshold.is_finite() {
                    return Err(SentinelError::Inference("split threshold is not finite".to_string()));
                }
                left.validate(n_features)?;
                right.validate(n_features)
            }
        }
    }

    fn path_length(&self, sample: &[f64], depth: usize) -> f64 {
        match self {
            Node::Leaf { size } => depth as f64 + average_path_length(*size),
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, depth + 1)
                } else {
                    right.path_length(sample, depth + 1)
                }
            }
        }
    }
}

/// Fitted isolation forest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    params: ForestParams,
    trees: Vec<Node>,
    sample_size: usize,
    n_features: usize,
    offset: f64,
}

impl IsolationForest {
    /// Fit on already-scaled rows. Needs at least two rows.
    pub fn fit(rows: &[Vec<f64>], params: ForestParams) -> Result<Self> {
        let n_features = check_matrix(rows)?;
        if rows.len() < 2 {
            return Err(SentinelError::InsufficientData {
                needed: 2,
                actual: rows.len(),
            });
        }
        if !(params.contamination > 0.0 && params.contamination <= 0.5) {
            return Err(SentinelError::Inference(format!(
                "contamination must be in (0, 0.5], got {}",
                params.contamination
            )));
        }
        if params.n_estimators == 0 {
            return Err(SentinelError::Inference("n_estimators must be positive".to_string()));
        }

        let sample_size = params.max_samples.clamp(2, rows.len());
        let height_limit = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(params.seed);

        let trees = (0..params.n_estimators)
            .map(|_| {
                let indices = rand::seq::index::sample(&mut rng, rows.len(), sample_size).into_vec();
                build_tree(rows, indices, 0, height_limit, &mut rng)
            })
            .collect();

        let mut forest = Self {
            params,
            trees,
            sample_size,
            n_features,
            offset: 0.0,
        };

        let mut training_scores: Vec<f64> = rows.iter().map(|r| forest.raw_score(r)).collect();
        forest.offset = percentile(&mut training_scores, forest.params.contamination);

        Ok(forest)
    }

    /// Raw per-sample score in [-1, 0); lower is more abnormal.
    pub fn score_samples(&self, sample: &[f64]) -> Result<f64> {
        self.check_sample(sample)?;
        Ok(self.raw_score(sample))
    }

    /// `score_samples` shifted by the contamination offset; negative means outlier.
    pub fn decision_function(&self, sample: &[f64]) -> Result<f64> {
        Ok(self.score_samples(sample)? - self.offset)
    }

    pub fn is_outlier(&self, sample: &[f64]) -> Result<bool> {
        Ok(self.decision_function(sample)? < 0.0)
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    /// Structural checks for a forest restored from disk rather than fit here.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(SentinelError::Inference("forest has no trees".to_string()));
        }
        if self.n_features == 0 {
            return Err(SentinelError::Inference("forest has no features".to_string()));
        }
        if self.sample_size < 2 {
            return Err(SentinelError::Inference(format!(
                "sub-sample size {} is below 2",
                self.sample_size
            )));
        }
        if !self.offset.is_finite() {
            return Err(SentinelError::Inference("decision offset is not finite".to_string()));
        }
        self.trees.iter().try_for_each(|tree| tree.validate(self.n_features))
    }

    fn raw_score(&self, sample: &[f64]) -> f64 {
        let mean_path = self
            .trees
            .iter()
            .map(|tree| tree.path_length(sample, 0))
            .sum::<f64>()
            / self.trees.len() as f64;

        -(2f64.powf(-mean_path / average_path_length(self.sample_size)))
    }

    fn check_sample(&self, sample: &[f64]) -> Result<()> {
        if sample.len() != self.n_features {
            return Err(SentinelError::Inference(format!(
                "expected {} features, got {}",
                self.n_features,
                sample.len()
            )));
        }
        if sample.iter().any(|v| !v.is_finite()) {
            return Err(SentinelError::Inference("sample contains a non-finite value".to_string()));
        }
        Ok(())
    }
}

fn build_tree(
    rows: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    height_limit: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= height_limit || indices.len() <= 1 {
        return Node::Leaf { size: indices.len() };
    }

    // Only features that still vary inside this node can split it
    let candidates: Vec<(usize, f64, f64)> = (0..rows[indices[0]].len())
        .filter_map(|feature| {
            let (min, max) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(rows[i][feature]), hi.max(rows[i][feature]))
            });
            (max > min).then_some((feature, min, max))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf { size: indices.len() };
    }

    let (feature, min, max) = candidates[rng.gen_range(0..candidates.len())];
    let threshold = rng.gen_range(min..max);

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(rows, left, depth + 1, height_limit, rng)),
        right: Box::new(build_tree(rows, right, depth + 1, height_limit, rng)),
    }
}

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile, `q` in [0, 1]
fn percentile(values: &mut [f64], q: f64) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let position = q * (values.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;
    values[lower] + (values[upper] - values[lower]) * weight
}
