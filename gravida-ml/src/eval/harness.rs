//! Scores trained predictors on held-out rows and picks the winner.

use crate::algorithms::Classifier;
use crate::error::{GravidaError, Result};
use crate::eval::metrics::EvaluationResult;

/// Held-out rows (already scaled) and their true labels.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationHarness<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [u8],
}

impl<'a> EvaluationHarness<'a> {
    pub fn new(rows: &'a [Vec<f64>], labels: &'a [u8]) -> Result<Self> {
        if rows.len() != labels.len() {
            return Err(GravidaError::dimension_mismatch(rows.len(), labels.len()));
        }
        Ok(Self { rows, labels })
    }

    pub fn evaluate(&self, model: &dyn Classifier) -> Result<EvaluationResult> {
        let predicted = self
            .rows
            .iter()
            .map(|r| model.predict(r))
            .collect::<Result<Vec<_>>>()?;
        let result = EvaluationResult::from_predictions(model.name(), self.labels, &predicted)?;
        tracing::debug!(
            predictor = model.name(),
            accuracy = result.accuracy,
            macro_f1 = result.macro_f1,
            "Evaluated predictor"
        );
        Ok(result)
    }

    /// Results in registration order.
    pub fn evaluate_all(&self, models: &[Box<dyn Classifier>]) -> Result<Vec<EvaluationResult>> {
        models.iter().map(|m| self.evaluate(m.as_ref())).collect()
    }
}

/// Index of the result with the strictly highest accuracy; the first
/// registered predictor wins ties.
pub fn select_best(results: &[EvaluationResult]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, r) in results.iter().enumerate() {
        if best.is_none_or(|b| r.accuracy > results[b].accuracy) {
            best = Some(i);
        }
    }
    best
}
