//! Classifier capability contract and the interchangeable implementations.

pub mod forest;
pub mod knn;
pub mod logistic;
pub mod mlp;

pub use forest::RandomForest;
pub use knn::KNearestNeighbors;
pub use logistic::LogisticRegression;
pub use mlp::MultilayerPerceptron;

use serde::{Deserialize, Serialize};

use crate::error::{GravidaError, Result};

/// A trainable predictor over scaled feature rows.
///
/// Implementations must be deterministic for a given construction seed and
/// immutable once fitted, so a trained model can be shared across threads.
pub trait Classifier: Send + Sync {
    /// Human-readable name used in reports and model selection.
    fn name(&self) -> &str;

    /// Train on `rows` with one label per row.
    fn fit(&mut self, rows: &[Vec<f64>], labels: &[u8]) -> Result<()>;

    /// Probability per class seen during `fit`.
    fn predict_proba(&self, row: &[f64]) -> Result<Probabilities>;

    /// Most probable class; ties go to the smallest label.
    fn predict(&self, row: &[f64]) -> Result<u8> {
        Ok(self.predict_proba(row)?.argmax())
    }
}

/// Class probabilities in ascending label order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    classes: Vec<u8>,
    values: Vec<f64>,
}

impl Probabilities {
    pub fn new(classes: Vec<u8>, values: Vec<f64>) -> Self {
        debug_assert_eq!(classes.len(), values.len());
        Self { classes, values }
    }

    pub fn classes(&self) -> &[u8] {
        &self.classes
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Probability of `class`, 0 for classes never seen in training.
    pub fn get(&self, class: u8) -> f64 {
        self.classes
            .iter()
            .position(|c| *c == class)
            .map(|i| self.values[i])
            .unwrap_or(0.0)
    }

    pub fn argmax(&self) -> u8 {
        let mut best = 0;
        for (i, v) in self.values.iter().enumerate() {
            if *v > self.values[best] {
                best = i;
            }
        }
        self.classes.get(best).copied().unwrap_or(0)
    }
}

/// Predictor family and hyperparameters, as written in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClassifierKind {
    LogisticRegression {
        #[serde(default = "default_learning_rate")]
        learning_rate: f64,
        #[serde(default = "default_epochs")]
        epochs: usize,
        #[serde(default = "default_l2")]
        l2: f64,
    },
    KNearestNeighbors {
        #[serde(default = "default_k")]
        k: usize,
    },
    Mlp {
        /// Width of each ReLU hidden layer, input side first.
        #[serde(default = "default_hidden_layers")]
        hidden_layers: Vec<usize>,
        #[serde(default = "default_mlp_learning_rate")]
        learning_rate: f64,
        #[serde(default = "default_mlp_epochs")]
        epochs: usize,
        #[serde(default = "default_batch_size")]
        batch_size: usize,
        #[serde(default = "default_l2")]
        l2: f64,
    },
    RandomForest {
        #[serde(default = "default_n_trees")]
        n_trees: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_depth: Option<usize>,
        #[serde(default = "default_min_samples_split")]
        min_samples_split: usize,
    },
}

fn default_learning_rate() -> f64 {
    0.5
}

fn default_epochs() -> usize {
    300
}

fn default_l2() -> f64 {
    1e-3
}

fn default_k() -> usize {
    5
}

fn default_hidden_layers() -> Vec<usize> {
    vec![32, 16]
}

fn default_mlp_learning_rate() -> f64 {
    0.05
}

fn default_mlp_epochs() -> usize {
    200
}

fn default_batch_size() -> usize {
    32
}

fn default_n_trees() -> usize {
    50
}

fn default_min_samples_split() -> usize {
    2
}

impl ClassifierKind {
    pub fn logistic_regression() -> Self {
        Self::LogisticRegression {
            learning_rate: default_learning_rate(),
            epochs: default_epochs(),
            l2: default_l2(),
        }
    }

    pub fn k_nearest_neighbors() -> Self {
        Self::KNearestNeighbors { k: default_k() }
    }

    pub fn mlp() -> Self {
        Self::Mlp {
            hidden_layers: default_hidden_layers(),
            learning_rate: default_mlp_learning_rate(),
            epochs: default_mlp_epochs(),
            batch_size: default_batch_size(),
            l2: default_l2(),
        }
    }

    pub fn random_forest() -> Self {
        Self::RandomForest {
            n_trees: default_n_trees(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::KNearestNeighbors { .. } => "k_nearest_neighbors",
            Self::Mlp { .. } => "mlp",
            Self::RandomForest { .. } => "random_forest",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::LogisticRegression {
                learning_rate,
                epochs,
                l2,
            } => {
                if *learning_rate <= 0.0 || *epochs == 0 || *l2 < 0.0 {
                    return Err(GravidaError::config(
                        "logistic regression needs learning_rate > 0, epochs > 0 and l2 >= 0",
                    ));
                }
            }
            Self::KNearestNeighbors { k } => {
                if *k == 0 {
                    return Err(GravidaError::config("k must be at least 1"));
                }
            }
            Self::Mlp {
                hidden_layers,
                learning_rate,
                epochs,
                batch_size,
                l2,
            } => {
                if hidden_layers.contains(&0)
                    || *learning_rate <= 0.0
                    || *epochs == 0
                    || *batch_size == 0
                    || *l2 < 0.0
                {
                    return Err(GravidaError::config(
                        "mlp needs hidden layer widths > 0, learning_rate > 0, epochs > 0, batch_size > 0 and l2 >= 0",
                    ));
                }
            }
            Self::RandomForest {
                n_trees,
                min_samples_split,
                ..
            } => {
                if *n_trees == 0 || *min_samples_split < 2 {
                    return Err(GravidaError::config(
                        "random forest needs n_trees > 0 and min_samples_split >= 2",
                    ));
                }
            }
        }
        Ok(())
    }

    /// An untrained predictor; `seed` drives any internal randomness.
    pub fn build(&self, seed: u64) -> Box<dyn Classifier> {
        match self {
            Self::LogisticRegression {
                learning_rate,
                epochs,
                l2,
            } => Box::new(LogisticRegression::new(*learning_rate, *epochs, *l2)),
            Self::KNearestNeighbors { k } => Box::new(KNearestNeighbors::new(*k)),
            Self::Mlp {
                hidden_layers,
                learning_rate,
                epochs,
                batch_size,
                l2,
            } => Box::new(MultilayerPerceptron::new(
                hidden_layers.clone(),
                *learning_rate,
                *epochs,
                *batch_size,
                *l2,
                seed,
            )),
            Self::RandomForest {
                n_trees,
                max_depth,
                min_samples_split,
            } => Box::new(RandomForest::new(
                *n_trees,
                *max_depth,
                *min_samples_split,
                seed,
            )),
        }
    }
}

/// Normalize logits into probabilities in place.
pub(crate) fn softmax(logits: &mut [f64]) {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for z in logits.iter_mut() {
        *z = (*z - max).exp();
        sum += *z;
    }
    for z in logits.iter_mut() {
        *z /= sum;
    }
}

/// Sorted distinct labels, after checking the training inputs line up.
pub(crate) fn check_training_input(rows: &[Vec<f64>], labels: &[u8]) -> Result<Vec<u8>> {
    if rows.len() != labels.len() {
        return Err(GravidaError::dimension_mismatch(rows.len(), labels.len()));
    }
    if let Some(first) = rows.first() {
        if let Some(row) = rows.iter().find(|r| r.len() != first.len()) {
            return Err(GravidaError::dimension_mismatch(first.len(), row.len()));
        }
    }
    let mut classes = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    if classes.len() < 2 {
        return Err(GravidaError::degenerate_dataset(format!(
            "training needs at least two classes, got {classes:?}"
        )));
    }
    Ok(classes)
}
