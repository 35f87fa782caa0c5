//! Classification metrics over a held-out split.

use serde::{Deserialize, Serialize};

use crate::error::{GravidaError, Result};

/// Counts of actual (rows) against predicted (columns) labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<u8>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn from_predictions(actual: &[u8], predicted: &[u8]) -> Self {
        let mut labels: Vec<u8> = actual.iter().chain(predicted).copied().collect();
        labels.sort_unstable();
        labels.dedup();
        let position = |l: u8| labels.iter().position(|x| *x == l).unwrap_or(0);

        let mut counts = vec![vec![0; labels.len()]; labels.len()];
        for (&a, &p) in actual.iter().zip(predicted) {
            counts[position(a)][position(p)] += 1;
        }
        Self { labels, counts }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        (0..self.labels.len()).map(|i| self.counts[i][i]).sum()
    }

    fn column_sum(&self, j: usize) -> usize {
        self.counts.iter().map(|row| row[j]).sum()
    }
}

/// Precision, recall and F1 for one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassReport {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Scores for one predictor on the held-out split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub predictor: String,
    pub accuracy: f64,
    pub per_class: Vec<ClassReport>,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub confusion_matrix: ConfusionMatrix,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

impl EvaluationResult {
    /// Undefined ratios (no predictions or no support for a label) score 0.
    pub fn from_predictions(predictor: &str, actual: &[u8], predicted: &[u8]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(GravidaError::dimension_mismatch(actual.len(), predicted.len()));
        }
        if actual.is_empty() {
            return Err(GravidaError::degenerate_dataset(
                "cannot evaluate on an empty split",
            ));
        }

        let cm = ConfusionMatrix::from_predictions(actual, predicted);
        let per_class: Vec<ClassReport> = cm
            .labels
            .iter()
            .enumerate()
            .map(|(i, &label)| {
                let tp = cm.counts[i][i];
                let support: usize = cm.counts[i].iter().sum();
                let precision = ratio(tp, cm.column_sum(i));
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassReport {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        let k = per_class.len() as f64;
        Ok(Self {
            predictor: predictor.to_string(),
            accuracy: ratio(cm.correct(), cm.total()),
            macro_precision: per_class.iter().map(|c| c.precision).sum::<f64>() / k,
            macro_recall: per_class.iter().map(|c| c.recall).sum::<f64>() / k,
            macro_f1: per_class.iter().map(|c| c.f1).sum::<f64>() / k,
            per_class,
            confusion_matrix: cm,
        })
    }

    pub fn class(&self, label: u8) -> Option<&ClassReport> {
        self.per_class.iter().find(|c| c.label == label)
    }
}
