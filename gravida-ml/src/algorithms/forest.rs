//! Bagged decision trees (CART, Gini impurity).

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::algorithms::{Classifier, Probabilities, check_training_input};
use crate::error::{GravidaError, Result};

#[derive(Debug, Clone)]
enum Node {
    /// Class frequencies of the training rows that reached this leaf.
    Leaf(Vec<f64>),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn distribution(&self, row: &[f64]) -> &[f64] {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(dist) => return dist,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [usize],
    n_classes: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    max_features: usize,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let t = total as f64;
    1.0 - counts.iter().map(|&c| (c as f64 / t).powi(2)).sum::<f64>()
}

impl TreeBuilder<'_> {
    fn counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.targets[i]] += 1;
        }
        counts
    }

    fn leaf(counts: &[usize], total: usize) -> Node {
        Node::Leaf(counts.iter().map(|&c| c as f64 / total as f64).collect())
    }

    fn build(&self, indices: &[usize], depth: usize, rng: &mut StdRng) -> Node {
        let counts = self.counts(indices);
        let total = indices.len();
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.is_some_and(|d| depth >= d);
        if pure || depth_reached || total < self.min_samples_split {
            return Self::leaf(&counts, total);
        }

        let n_features = self.rows[indices[0]].len();
        let candidates =
            rand::seq::index::sample(rng, n_features, self.max_features.min(n_features));

        let parent = gini(&counts, total);
        let mut best = self.best_split(indices, candidates.iter(), parent);
        if best.is_none() {
            // Keep looking past the sampled subset before giving up on the node.
            let sampled: Vec<usize> = candidates.into_vec();
            let rest = (0..n_features).filter(|f| !sampled.contains(f));
            best = self.best_split(indices, rest, parent);
        }

        let Some((_, feature, threshold)) = best else {
            return Self::leaf(&counts, total);
        };
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| self.rows[i][feature] <= threshold);
        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(&left, depth + 1, rng)),
            right: Box::new(self.build(&right, depth + 1, rng)),
        }
    }

    /// `(impurity, feature, threshold)` of the best split that beats `parent`.
    fn best_split(
        &self,
        indices: &[usize],
        features: impl Iterator<Item = usize>,
        parent: f64,
    ) -> Option<(f64, usize, f64)> {
        let mut best: Option<(f64, usize, f64)> = None;
        for feature in features {
            if let Some((impurity, threshold)) = self.best_threshold(indices, feature) {
                if impurity < parent - 1e-12 && best.is_none_or(|(b, _, _)| impurity < b) {
                    best = Some((impurity, feature, threshold));
                }
            }
        }
        best
    }

    /// Lowest weighted child impurity over midpoints between distinct values.
    fn best_threshold(&self, indices: &[usize], feature: usize) -> Option<(f64, f64)> {
        let mut sorted: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (self.rows[i][feature], self.targets[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = sorted.len();
        let mut right = vec![0; self.n_classes];
        for &(_, t) in &sorted {
            right[t] += 1;
        }
        let mut left = vec![0; self.n_classes];

        let mut best: Option<(f64, f64)> = None;
        for i in 0..total - 1 {
            let (value, target) = sorted[i];
            left[target] += 1;
            right[target] -= 1;
            let next = sorted[i + 1].0;
            if next <= value {
                continue;
            }
            let n_left = i + 1;
            let n_right = total - n_left;
            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / total as f64;
            if best.is_none_or(|(b, _)| impurity < b) {
                best = Some((impurity, (value + next) / 2.0));
            }
        }
        best
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<u8>,
    n_features: usize,
    trees: Vec<Node>,
}

/// Averages the leaf class frequencies of bootstrap-trained trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    n_trees: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    seed: u64,
    fitted: Option<Fitted>,
}

impl RandomForest {
    pub fn new(n_trees: usize, max_depth: Option<usize>, min_samples_split: usize, seed: u64) -> Self {
        Self {
            n_trees: n_trees.max(1),
            max_depth,
            min_samples_split: min_samples_split.max(2),
            seed,
            fitted: None,
        }
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&mut self, rows: &[Vec<f64>], labels: &[u8]) -> Result<()> {
        let classes = check_training_input(rows, labels)?;
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| classes.iter().position(|c| c == l).unwrap_or(0))
            .collect();
        let n_features = rows[0].len();
        let builder = TreeBuilder {
            rows,
            targets: &targets,
            n_classes: classes.len(),
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: ((n_features as f64).sqrt().ceil() as usize).max(1),
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let trees = (0..self.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..rows.len())
                    .map(|_| rng.gen_range(0..rows.len()))
                    .collect();
                builder.build(&sample, 0, &mut rng)
            })
            .collect();

        tracing::debug!(trees = self.n_trees, classes = ?classes, "Fitted random forest");
        self.fitted = Some(Fitted {
            classes,
            n_features,
            trees,
        });
        Ok(())
    }

    fn predict_proba(&self, row: &[f64]) -> Result<Probabilities> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| GravidaError::not_trained(self.name()))?;
        if row.len() != fitted.n_features {
            return Err(GravidaError::dimension_mismatch(fitted.n_features, row.len()));
        }
        let mut values = vec![0.0; fitted.classes.len()];
        for tree in &fitted.trees {
            for (v, p) in values.iter_mut().zip(tree.distribution(row)) {
                *v += p;
            }
        }
        let n = fitted.trees.len() as f64;
        values.iter_mut().for_each(|v| *v /= n);
        Ok(Probabilities::new(fitted.classes.clone(), values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..10 {
            for (a, b, label) in [(0.0, 0.0, 0), (0.0, 1.0, 0), (1.0, 0.0, 1), (1.0, 1.0, 2)] {
                rows.push(vec![a, b]);
                labels.push(label);
            }
        }
        (rows, labels)
    }

    #[test]
    fn test_learns_grid() {
        let (rows, labels) = grid();
        let mut forest = RandomForest::new(25, None, 2, 7);
        forest.fit(&rows, &labels).unwrap();
        assert_eq!(forest.predict(&[0.0, 1.0]).unwrap(), 0);
        assert_eq!(forest.predict(&[1.0, 0.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[1.0, 1.0]).unwrap(), 2);
    }

    #[test]
    fn test_same_seed_same_model() {
        let (rows, labels) = grid();
        let mut a = RandomForest::new(10, Some(3), 2, 99);
        let mut b = RandomForest::new(10, Some(3), 2, 99);
        a.fit(&rows, &labels).unwrap();
        b.fit(&rows, &labels).unwrap();
        for row in &rows {
            assert_eq!(a.predict_proba(row).unwrap(), b.predict_proba(row).unwrap());
        }
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (rows, labels) = grid();
        let mut forest = RandomForest::new(5, Some(1), 2, 1);
        forest.fit(&rows, &labels).unwrap();
        let p = forest.predict_proba(&[0.5, 0.5]).unwrap();
        assert!((p.values().iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_predict_before_fit() {
        let forest = RandomForest::new(3, None, 2, 0);
        assert!(matches!(
            forest.predict_proba(&[0.0, 0.0]),
            Err(GravidaError::ModelNotTrained(_))
        ));
    }
}
