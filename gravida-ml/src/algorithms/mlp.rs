//! Feed-forward network: ReLU hidden layers, softmax output, mini-batch SGD.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::algorithms::{Classifier, Probabilities, check_training_input, softmax};
use crate::error::{GravidaError, Result};

#[derive(Debug, Clone)]
struct Layer {
    /// One row per output unit.
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl Layer {
    /// He-uniform initialization.
    fn new(inputs: usize, outputs: usize, rng: &mut StdRng) -> Self {
        let bound = (6.0 / inputs as f64).sqrt();
        Self {
            weights: (0..outputs)
                .map(|_| (0..inputs).map(|_| rng.gen_range(-bound..bound)).collect())
                .collect(),
            bias: vec![0.0; outputs],
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            weights: self.weights.iter().map(|w| vec![0.0; w.len()]).collect(),
            bias: vec![0.0; self.bias.len()],
        }
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| w.iter().zip(input).map(|(c, x)| c * x).sum::<f64>() + b)
            .collect()
    }
}

/// Activations of every layer for one row, input first; the last entry is
/// the softmax output.
fn forward(layers: &[Layer], row: &[f64]) -> Vec<Vec<f64>> {
    let mut activations = Vec::with_capacity(layers.len() + 1);
    activations.push(row.to_vec());
    for (i, layer) in layers.iter().enumerate() {
        let mut z = layer.forward(&activations[i]);
        if i + 1 == layers.len() {
            softmax(&mut z);
        } else {
            z.iter_mut().for_each(|v| *v = v.max(0.0));
        }
        activations.push(z);
    }
    activations
}

#[derive(Debug, Clone)]
struct Fitted {
    classes: Vec<u8>,
    n_features: usize,
    layers: Vec<Layer>,
}

/// Multilayer perceptron classifier trained with cross-entropy loss.
#[derive(Debug, Clone)]
pub struct MultilayerPerceptron {
    hidden_layers: Vec<usize>,
    learning_rate: f64,
    epochs: usize,
    batch_size: usize,
    l2: f64,
    seed: u64,
    fitted: Option<Fitted>,
}

impl MultilayerPerceptron {
    pub fn new(
        hidden_layers: Vec<usize>,
        learning_rate: f64,
        epochs: usize,
        batch_size: usize,
        l2: f64,
        seed: u64,
    ) -> Self {
        Self {
            hidden_layers,
            learning_rate,
            epochs,
            batch_size: batch_size.max(1),
            l2,
            seed,
            fitted: None,
        }
    }

    /// Accumulate the gradient of one example into `grads`.
    fn backprop(layers: &[Layer], grads: &mut [Layer], row: &[f64], target: usize) {
        let activations = forward(layers, row);
        let mut delta = activations[layers.len()].clone();
        delta[target] -= 1.0;

        for l in (0..layers.len()).rev() {
            let input = &activations[l];
            let grad = &mut grads[l];
            for (k, d) in delta.iter().enumerate() {
                for (g, x) in grad.weights[k].iter_mut().zip(input) {
                    *g += d * x;
                }
                grad.bias[k] += d;
            }
            if l > 0 {
                // `input` is a ReLU output here, so its derivative is 1 where positive.
                delta = (0..input.len())
                    .map(|j| {
                        if input[j] <= 0.0 {
                            0.0
                        } else {
                            layers[l]
                                .weights
                                .iter()
                                .zip(&delta)
                                .map(|(w, d)| w[j] * d)
                                .sum::<f64>()
                        }
                    })
                    .collect();
            }
        }
    }
}

impl Classifier for MultilayerPerceptron {
    fn name(&self) -> &str {
        "mlp"
    }

    fn fit(&mut self, rows: &[Vec<f64>], labels: &[u8]) -> Result<()> {
        let classes = check_training_input(rows, labels)?;
        let n_features = rows[0].len();
        let targets: Vec<usize> = labels
            .iter()
            .map(|l| classes.iter().position(|c| c == l).unwrap_or(0))
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut sizes = vec![n_features];
        sizes.extend(&self.hidden_layers);
        sizes.push(classes.len());
        let mut layers: Vec<Layer> = sizes
            .windows(2)
            .map(|w| Layer::new(w[0], w[1], &mut rng))
            .collect();

        let mut order: Vec<usize> = (0..rows.len()).collect();
        for _ in 0..self.epochs {
            order.shuffle(&mut rng);
            for batch in order.chunks(self.batch_size) {
                let mut grads: Vec<Layer> = layers.iter().map(Layer::zeros_like).collect();
                for &i in batch {
                    Self::backprop(&layers, &mut grads, &rows[i], targets[i]);
                }

                let scale = 1.0 / batch.len() as f64;
                for (layer, grad) in layers.iter_mut().zip(&grads) {
                    for (w_row, g_row) in layer.weights.iter_mut().zip(&grad.weights) {
                        for (w, g) in w_row.iter_mut().zip(g_row) {
                            *w -= self.learning_rate * (g * scale + self.l2 * *w);
                        }
                    }
                    for (b, g) in layer.bias.iter_mut().zip(&grad.bias) {
                        *b -= self.learning_rate * g * scale;
                    }
                }
            }
        }

        tracing::debug!(
            classes = ?classes,
            hidden = ?self.hidden_layers,
            epochs = self.epochs,
            "Fitted multilayer perceptron"
        );
        self.fitted = Some(Fitted {
            classes,
            n_features,
            layers,
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
        let values = forward(&fitted.layers, row).pop().unwrap_or_default();
        Ok(Probabilities::new(fitted.classes.clone(), values))
    }
}
