//! Per-column standardization

use crate::error::{Result, SentinelError};
use serde::{Deserialize, Serialize};

/// Zero-mean, unit-variance scaler fitted on a training matrix.
///
/// Uses the population standard deviation. Constant columns keep a scale
/// of 1.0 so they map to 0.0 instead of dividing by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let width = check_matrix(rows)?;
        let n = rows.len() as f64;

        let mut mean = vec![0.0; width];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = vec![0.0; width];
        for row in rows {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *var += (v - m).powi(2);
            }
        }

        let scale = variance
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.width() {
            return Err(SentinelError::Inference(format!(
                "expected {} features, got {}",
                self.width(),
                row.len()
            )));
        }

        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Structural checks for a scaler restored from disk.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.mean.is_empty() || self.mean.len() != self.scale.len() {
            return Err(SentinelError::Inference(format!(
                "scaler has {} means and {} scales",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite()) {
            return Err(SentinelError::Inference("scaler mean is not finite".to_string()));
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(SentinelError::Inference(
                "scaler scale must be finite and positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

/// Validate a non-empty rectangular matrix of finite values; returns its width.
pub(crate) fn check_matrix(rows: &[Vec<f64>]) -> Result<usize> {
    let first = rows.first().ok_or(SentinelError::InsufficientData {
        needed: 1,
        actual: 0,
    })?;
    let width = first.len();
    if width == 0 {
        return Err(SentinelError::Inference("feature rows are empty".to_string()));
    }

    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(SentinelError::Inference(format!(
                "row {} has {} features, expected {}",
                i,
                row.len(),
                width
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(SentinelError::Inference(format!(
                "row {} contains a non-finite value",
                i
            )));
        }
    }

    Ok(width)
}
