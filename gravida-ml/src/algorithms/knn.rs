//! k-nearest-neighbours vote.

use crate::algorithms::{Classifier, Probabilities, check_training_input};
use crate::error::{GravidaError, Result};

/// Majority vote among the `k` closest training rows (Euclidean distance).
///
/// Equal distances are resolved by training order, so results are stable.
#[derive(Debug, Clone)]
pub struct KNearestNeighbors {
    k: usize,
    rows: Vec<Vec<f64>>,
    labels: Vec<u8>,
    classes: Vec<u8>,
}

impl KNearestNeighbors {
    pub fn new(k: usize) -> Self {
        Self {
            k: k.max(1),
            rows: Vec::new(),
            labels: Vec::new(),
            classes: Vec::new(),
        }
    }
}

impl Classifier for KNearestNeighbors {
    fn name(&self) -> &str {
        "k_nearest_neighbors"
    }

    fn fit(&mut self, rows: &[Vec<f64>], labels: &[u8]) -> Result<()> {
        self.classes = check_training_input(rows, labels)?;
        self.rows = rows.to_vec();
        self.labels = labels.to_vec();
        Ok(())
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Probabilities> {
        if self.rows.is_empty() {
            return Err(GravidaError::not_trained(self.name()));
        }
        let expected = self.rows[0].len();
        if row.len() != expected {
            return Err(GravidaError::dimension_mismatch(expected, row.len()));
        }

        let mut distances: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let d: f64 = r.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
                (d, i)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let k = self.k.min(distances.len());
        let mut votes = vec![0.0; self.classes.len()];
        for &(_, i) in &distances[..k] {
            if let Some(c) = self.classes.iter().position(|c| *c == self.labels[i]) {
                votes[c] += 1.0;
            }
        }
        votes.iter_mut().for_each(|v| *v /= k as f64);
        Ok(Probabilities::new(self.classes.clone(), votes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_votes_follow_neighbours() {
        let rows = vec![vec![0.0], vec![0.1], vec![0.2], vec![5.0], vec![5.1]];
        let labels = vec![0, 0, 1, 1, 1];
        let mut model = KNearestNeighbors::new(3);
        model.fit(&rows, &labels).unwrap();
        let p = model.predict_proba(&[0.05]).unwrap();
        assert!((p.get(0) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(model.predict(&[0.05]).unwrap(), 0);
        assert_eq!(model.predict(&[4.9]).unwrap(), 1);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let mut model = KNearestNeighbors::new(10);
        model.fit(&[vec![0.0], vec![1.0]], &[2, 3]).unwrap();
        let p = model.predict_proba(&[0.0]).unwrap();
        assert_eq!(p.values(), &[0.5, 0.5]);
        assert_eq!(p.argmax(), 2);
    }

    #[test]
    fn test_predict_before_fit() {
        assert!(matches!(
            KNearestNeighbors::new(1).predict(&[0.0]),
            Err(GravidaError::ModelNotTrained(_))
        ));
    }
}
