//! Standardization of symptom features.

use serde::{Deserialize, Serialize};

use crate::error::{GravidaError, Result};

/// Fits per-feature mean and standard deviation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureScaler {
    /// Fail on zero-variance features instead of falling back to unit scale.
    pub strict: bool,
}

/// Parameters learned from the training split. Only ever applied afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
    degenerate: Vec<usize>,
}

impl FeatureScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Compute population mean and standard deviation per column.
    ///
    /// Zero-variance columns get scale 1 and are listed in
    /// [`FittedScaler::degenerate_features`]; in strict mode they are an error.
    pub fn fit(&self, rows: &[Vec<f64>], n_features: usize) -> Result<FittedScaler> {
        if rows.is_empty() {
            return Err(GravidaError::degenerate_dataset(
                "cannot fit a scaler on zero rows",
            ));
        }
        if let Some(row) = rows.iter().find(|r| r.len() != n_features) {
            return Err(GravidaError::dimension_mismatch(n_features, row.len()));
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; n_features];
        for row in rows {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut variances = vec![0.0; n_features];
        for row in rows {
            for ((v, x), m) in variances.iter_mut().zip(row).zip(&means) {
                *v += (x - m).powi(2);
            }
        }

        let mut scales = Vec::with_capacity(n_features);
        let mut degenerate = Vec::new();
        for (i, v) in variances.into_iter().enumerate() {
            let std = (v / n).sqrt();
            if std < f64::EPSILON {
                degenerate.push(i);
                scales.push(1.0);
            } else {
                scales.push(std);
            }
        }

        if !degenerate.is_empty() {
            if self.strict {
                return Err(GravidaError::degenerate_feature(format!(
                    "features {degenerate:?} have zero variance"
                )));
            }
            tracing::warn!(features = ?degenerate, "Zero-variance features scaled by 1");
        }

        Ok(FittedScaler {
            means,
            scales,
            degenerate,
        })
    }
}

impl FittedScaler {
    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn degenerate_features(&self) -> &[usize] {
        &self.degenerate
    }

    /// `(x - mean) / scale`, elementwise.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        if row.len() != self.n_features() {
            return Err(GravidaError::dimension_mismatch(self.n_features(), row.len()));
        }
        Ok(row
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .map(|((x, m), s)| (x - m) / s)
            .collect())
    }

    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}
