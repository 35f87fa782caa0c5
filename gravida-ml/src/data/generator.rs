//! Synthetic training data: symptom sampling and label derivation.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::dataset::{Dataset, LabelSet, TrainingExample};
use crate::error::{GravidaError, Result};
use crate::schema::{RuleIndices, SchemaVariant, SymptomSchema, SymptomVector};

/// A symptom count at or above this marks the example pregnant.
pub const PREGNANCY_SCORE_THRESHOLD: usize = 8;

const PREGNANT_WEIGHTS: [f64; 16] = [
    0.9, 0.85, 0.7, 0.85, 0.8, 0.6, 0.6, 0.7, 0.75, 0.65, 0.6, 0.4, 0.35, 0.7, 0.75, 0.7,
];
const NOT_PREGNANT_WEIGHTS: [f64; 16] = [
    0.1, 0.15, 0.2, 0.2, 0.2, 0.4, 0.1, 0.3, 0.3, 0.3, 0.2, 0.2, 0.15, 0.2, 0.3, 0.25,
];

/// Hand-labelled rows for the standard checklist: answers, pregnant, trimester.
const REFERENCE_ROWS: [([u8; 13], u8, u8); 5] = [
    ([1, 1, 1, 1, 1, 1, 0, 1, 1, 1, 0, 0, 1], 1, 1),
    ([1, 1, 1, 1, 0, 1, 0, 0, 1, 1, 1, 0, 0], 1, 2),
    ([1, 0, 0, 1, 1, 0, 1, 1, 0, 0, 1, 0, 0], 1, 3),
    ([1, 1, 1, 1, 1, 0, 1, 1, 1, 1, 1, 0, 1], 1, 1),
    ([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 0, 0),
];

/// How labels are attached to sampled symptoms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPolicy {
    /// Uniform symptoms, labels derived from symptom rules.
    #[default]
    RuleDerived,
    /// Label first (50/50), then symptoms from per-class Bernoulli weights.
    /// Pregnancy labels only.
    WeightedResample,
    /// The hand-labelled reference rows, repeated in order.
    Reference,
}

/// Per-class Bernoulli parameters, one per checklist question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomWeights {
    pub pregnant: Vec<f64>,
    pub not_pregnant: Vec<f64>,
}

impl SymptomWeights {
    /// Built-in tables, truncated to the schema length.
    pub fn defaults_for(schema: &SymptomSchema) -> Self {
        let n = schema.len();
        Self {
            pregnant: PREGNANT_WEIGHTS[..n].to_vec(),
            not_pregnant: NOT_PREGNANT_WEIGHTS[..n].to_vec(),
        }
    }

    pub fn validate(&self, n: usize) -> Result<()> {
        for table in [&self.pregnant, &self.not_pregnant] {
            if table.len() != n {
                return Err(GravidaError::dimension_mismatch(n, table.len()));
            }
            if let Some(w) = table.iter().find(|w| !(0.0..=1.0).contains(*w)) {
                return Err(GravidaError::config(format!(
                    "symptom weight {w} is outside [0, 1]"
                )));
            }
        }
        Ok(())
    }

    fn for_class(&self, pregnant: bool) -> &[f64] {
        if pregnant {
            &self.pregnant
        } else {
            &self.not_pregnant
        }
    }
}

/// Apply the labelling rules to one symptom vector.
///
/// Returns `(pregnant, trimester)`. When pregnant but no trimester pattern
/// matches, the trimester is drawn uniformly from 1..=3 using `rng`.
pub fn derive_labels<R: Rng + ?Sized>(
    symptoms: &SymptomVector,
    idx: &RuleIndices,
    rng: &mut R,
) -> (u8, u8) {
    let fatigue = symptoms.get(idx.fatigue);
    let breast = symptoms.get(idx.breast);
    let back_pain = symptoms.get(idx.back_pain);
    let headache = symptoms.get(idx.headache);
    let sleep = symptoms.get(idx.sleep_disturbance);

    let pregnant = symptoms.score() >= PREGNANCY_SCORE_THRESHOLD || (fatigue && breast);
    if !pregnant {
        return (0, 0);
    }

    let trimester = if fatigue && breast && !back_pain {
        1
    } else if back_pain && !headache {
        2
    } else if sleep && headache {
        3
    } else {
        // No pattern matched; the label is a coin toss.
        rng.gen_range(1..=3)
    };
    (1, trimester)
}

/// Produces labelled datasets for one schema under one policy.
#[derive(Debug, Clone)]
pub struct SyntheticDataGenerator {
    schema: SymptomSchema,
    policy: GenerationPolicy,
    weights: SymptomWeights,
    max_attempts: usize,
}

impl SyntheticDataGenerator {
    pub fn new(schema: SymptomSchema, policy: GenerationPolicy) -> Self {
        let weights = SymptomWeights::defaults_for(&schema);
        Self {
            schema,
            policy,
            weights,
            max_attempts: 5,
        }
    }

    pub fn with_weights(mut self, weights: SymptomWeights) -> Result<Self> {
        weights.validate(self.schema.len())?;
        self.weights = weights;
        Ok(self)
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn policy(&self) -> GenerationPolicy {
        self.policy
    }

    pub fn label_set(&self) -> LabelSet {
        match self.policy {
            GenerationPolicy::WeightedResample => LabelSet::PregnancyOnly,
            GenerationPolicy::RuleDerived | GenerationPolicy::Reference => {
                LabelSet::PregnancyAndTrimester
            }
        }
    }

    /// Generate `n_samples` examples that can be split by label.
    ///
    /// Random policies redraw up to `max_attempts` times when a label is
    /// missing or too rare to stratify; the last failure is returned.
    pub fn generate<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> Result<Dataset> {
        if n_samples == 0 {
            return Err(GravidaError::config("sample count must be at least 1"));
        }
        if self.policy == GenerationPolicy::Reference
            && self.schema.variant() != SchemaVariant::Standard
        {
            return Err(GravidaError::config(
                "reference rows only exist for the standard schema",
            ));
        }

        let attempts = match self.policy {
            GenerationPolicy::Reference => 1,
            _ => self.max_attempts,
        };
        let mut last_err = None;
        for attempt in 1..=attempts {
            let dataset = self.draw(n_samples, rng);
            match dataset.check_stratifiable() {
                Ok(()) => {
                    tracing::debug!(
                        policy = ?self.policy,
                        samples = n_samples,
                        attempt,
                        "Generated synthetic dataset"
                    );
                    return Ok(dataset);
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Generated dataset cannot be stratified");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| GravidaError::degenerate_dataset("no generation attempt was made")))
    }

    fn draw<R: Rng + ?Sized>(&self, n_samples: usize, rng: &mut R) -> Dataset {
        let examples = match self.policy {
            GenerationPolicy::RuleDerived => {
                let idx = self.schema.rule_indices();
                (0..n_samples)
                    .map(|_| {
                        let symptoms = self.sample_uniform(rng);
                        let (pregnant, trimester) = derive_labels(&symptoms, &idx, rng);
                        TrainingExample {
                            symptoms,
                            pregnant,
                            trimester,
                        }
                    })
                    .collect()
            }
            GenerationPolicy::WeightedResample => (0..n_samples)
                .map(|_| {
                    let pregnant = rng.gen_bool(0.5);
                    let bits = self
                        .weights
                        .for_class(pregnant)
                        .iter()
                        .map(|&w| rng.gen_bool(w))
                        .collect();
                    TrainingExample {
                        symptoms: SymptomVector::from_bits(bits),
                        pregnant: u8::from(pregnant),
                        trimester: 0,
                    }
                })
                .collect(),
            GenerationPolicy::Reference => REFERENCE_ROWS
                .iter()
                .cycle()
                .take(n_samples)
                .map(|(answers, pregnant, trimester)| TrainingExample {
                    symptoms: SymptomVector::from_bits(answers.iter().map(|&a| a == 1).collect()),
                    pregnant: *pregnant,
                    trimester: *trimester,
                })
                .collect(),
        };
        Dataset::new(examples, self.label_set())
    }

    fn sample_uniform<R: Rng + ?Sized>(&self, rng: &mut R) -> SymptomVector {
        SymptomVector::from_bits((0..self.schema.len()).map(|_| rng.gen_bool(0.5)).collect())
    }
}
