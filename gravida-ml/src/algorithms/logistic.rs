//! Multinomial logistic regression trained by full-batch gradient descent.

use crate::algorithms::{Classifier, Probabilities, check_training_input, softmax};
use crate::error::{GravidaError, Result};

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<u8>,
    /// One row per class: feature weights followed by the bias.
    weights: Vec<Vec<f64>>,
}

/// Softmax regression with an L2 penalty on the feature weights.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    learning_rate: f64,
    epochs: usize,
    l2: f64,
    fitted: Option<Fitted>,
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, epochs: usize, l2: f64) -> Self {
        Self {
            learning_rate,
            epochs,
            l2,
            fitted: None,
        }
    }
}

fn logits(weights: &[Vec<f64>], row: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .map(|w| {
            let bias = w.len() - 1;
            w[..bias].iter().zip(row).map(|(c, x)| c * x).sum::<f64>() + w[bias]
        })
        .collect()
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic_regression"
    }

    fn fit(&mut self, rows: &[Vec<f64>], labels: &[u8]) -> Result<()> {
        let classes = check_training_input(rows, labels)?;
        let n_features = rows[0].len();
        let n = rows.len() as f64;
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| classes.iter().position(|c| c == l).unwrap_or(0))
            .collect();

        let mut weights = vec![vec![0.0; n_features + 1]; classes.len()];
        let mut grad = vec![vec![0.0; n_features + 1]; classes.len()];

        for _ in 0..self.epochs {
            grad.iter_mut().for_each(|g| g.iter_mut().for_each(|v| *v = 0.0));

            for (row, &target) in rows.iter().zip(&targets) {
                let mut p = logits(&weights, row);
                softmax(&mut p);
                for (k, g) in grad.iter_mut().enumerate() {
                    let err = p[k] - if k == target { 1.0 } else { 0.0 };
                    for (gj, x) in g.iter_mut().zip(row) {
                        *gj += err * x;
                    }
                    g[n_features] += err;
                }
            }

            for (w, g) in weights.iter_mut().zip(&grad) {
                for j in 0..=n_features {
                    let penalty = if j < n_features { self.l2 * w[j] } else { 0.0 };
                    w[j] -= self.learning_rate * (g[j] / n + penalty);
                }
            }
        }

        tracing::debug!(
            classes = ?classes,
            epochs = self.epochs,
            "Fitted logistic regression"
        );
        self.fitted = Some(Fitted { classes, weights });
        Ok(())
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Probabilities> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| GravidaError::not_trained(self.name()))?;
        let expected = fitted.weights[0].len() - 1;
        if row.len() != expected {
            return Err(GravidaError::dimension_mismatch(expected, row.len()));
        }
        let mut p = logits(&fitted.weights, row);
        softmax(&mut p);
        Ok(Probabilities::new(fitted.classes.clone(), p))
    }
}
