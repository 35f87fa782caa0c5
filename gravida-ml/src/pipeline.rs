//! The end-to-end run: generate -> fit scaler -> train -> evaluate -> select -> serve.
//!
//! A [`Pipeline`] owns all trained state. Nothing is process-global; callers
//! pass the pipeline (or its [`PredictionService`]) by reference.

use serde::{Deserialize, Serialize};

use crate::algorithms::Classifier;
use crate::config::PipelineConfig;
use crate::data::{DatasetStats, GenerationPolicy, SyntheticDataGenerator};
use crate::error::{GravidaError, Result};
use crate::eval::{EvaluationHarness, EvaluationResult, select_best};
use crate::features::FeatureScaler;
use crate::inference::{PredictionRecord, PredictionService};
use crate::schema::{SchemaVariant, SymptomSchema};
use crate::training::{ClassifierBank, SeedManager, TrimesterStrategy};

/// Candidate scores for one task and the predictor that was kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    pub results: Vec<EvaluationResult>,
    /// Name of the kept predictor. Not unique when a family is listed twice.
    pub selected: String,
    /// Position of the kept predictor in `results` (registration order).
    pub selected_index: usize,
}

impl TaskReport {
    pub fn selected_result(&self) -> Option<&EvaluationResult> {
        self.results.get(self.selected_index)
    }

    pub fn is_selected(&self, index: usize) -> bool {
        index == self.selected_index
    }
}

/// What a training run produced, for humans and for comparisons between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub seed: u64,
    pub schema: SchemaVariant,
    pub policy: GenerationPolicy,
    pub trimester_strategy: TrimesterStrategy,
    pub dataset: DatasetStats,
    /// Features scaled by 1 because they never varied in the training split.
    pub degenerate_features: Vec<usize>,
    pub pregnancy: TaskReport,
    /// Absent for datasets without trimester labels.
    pub trimester: Option<TaskReport>,
}

struct Trained {
    service: PredictionService,
    report: TrainingReport,
}

/// A configured pipeline, trained at most once.
pub struct Pipeline {
    config: PipelineConfig,
    schema: SymptomSchema,
    trained: Option<Trained>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let schema = config.schema();
        Ok(Self {
            config,
            schema,
            trained: None,
        })
    }

    /// Build and train in one step.
    pub fn fit(config: PipelineConfig) -> Result<Self> {
        let mut pipeline = Self::new(config)?;
        pipeline.train()?;
        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn schema(&self) -> &SymptomSchema {
        &self.schema
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    /// Run every stage in order. Training twice is an error: the scaler and
    /// predictors are fitted exactly once per pipeline.
    pub fn train(&mut self) -> Result<&TrainingReport> {
        if self.trained.is_some() {
            return Err(GravidaError::config("pipeline is already trained"));
        }

        let span = tracing::info_span!("train", seed = self.config.seed, schema = %self.schema.variant());
        let _enter = span.enter();
        let mut seeds = SeedManager::new(self.config.seed);

        // Generation
        let mut generator =
            SyntheticDataGenerator::new(self.schema.clone(), self.config.generation.policy)
                .with_max_attempts(self.config.generation.max_attempts);
        if let Some(weights) = &self.config.generation.weights {
            generator = generator.with_weights(weights.clone())?;
        }
        let dataset = generator.generate(
            self.config.generation.samples,
            &mut seeds.rng("generator"),
        )?;
        let split = dataset.stratified_split(self.config.split.test_fraction, &mut seeds.rng("split"))?;
        let stats = split.stats();
        tracing::info!(
            total = stats.total,
            train = stats.train,
            test = stats.test,
            pregnant = stats.pregnant,
            "Dataset generated"
        );

        // Scaling, fitted on the training split only
        let scaler = FeatureScaler {
            strict: self.config.training.strict_variance,
        }
        .fit(&split.train.features(), self.schema.len())?;
        let train_rows = scaler.transform_all(&split.train.features())?;
        let test_rows = scaler.transform_all(&split.test.features())?;

        // Training
        let bank = ClassifierBank::new(
            self.config.training.candidates.clone(),
            self.config.training.trimester_strategy,
        )?;
        let trained = bank.train(&split.train, &train_rows, &mut seeds)?;

        // Evaluation and selection
        let pregnancy_labels = split.test.pregnancy_labels();
        let harness = EvaluationHarness::new(&test_rows, &pregnancy_labels)?;
        let (pregnancy_model, pregnancy_report) = select("pregnancy", &harness, trained.pregnancy)?;

        let (trimester_model, trimester_report) = match trained.trimester {
            Some(models) => {
                let (rows, labels) = bank.strategy().select(&split.test, &test_rows);
                let harness = EvaluationHarness::new(&rows, &labels)?;
                let (model, report) = select("trimester", &harness, models)?;
                (Some(model), Some(report))
            }
            None => (None, None),
        };

        let report = TrainingReport {
            seed: self.config.seed,
            schema: self.schema.variant(),
            policy: self.config.generation.policy,
            trimester_strategy: bank.strategy(),
            dataset: stats,
            degenerate_features: scaler.degenerate_features().to_vec(),
            pregnancy: pregnancy_report,
            trimester: trimester_report,
        };
        let service =
            PredictionService::new(self.schema.clone(), scaler, pregnancy_model, trimester_model)?;

        let trained = self.trained.insert(Trained { service, report });
        Ok(&trained.report)
    }

    pub fn report(&self) -> Result<&TrainingReport> {
        self.trained
            .as_ref()
            .map(|t| &t.report)
            .ok_or_else(|| GravidaError::not_trained("pipeline has not been trained"))
    }

    pub fn service(&self) -> Result<&PredictionService> {
        self.trained
            .as_ref()
            .map(|t| &t.service)
            .ok_or_else(|| GravidaError::not_trained("pipeline has not been trained"))
    }

    pub fn predict(&self, answers: &[i64]) -> Result<PredictionRecord> {
        self.service()?.predict(answers)
    }
}

/// Evaluate every candidate and keep the winner.
fn select(
    task: &str,
    harness: &EvaluationHarness<'_>,
    models: Vec<Box<dyn Classifier>>,
) -> Result<(Box<dyn Classifier>, TaskReport)> {
    let results = harness.evaluate_all(&models)?;
    let best = select_best(&results)
        .ok_or_else(|| GravidaError::not_trained(format!("no {task} predictor was trained")))?;
    let selected = results[best].predictor.clone();
    tracing::info!(
        task,
        predictor = %selected,
        index = best,
        accuracy = results[best].accuracy,
        "Selected predictor"
    );
    let model = models
        .into_iter()
        .nth(best)
        .ok_or_else(|| GravidaError::not_trained(format!("no {task} predictor was trained")))?;
    Ok((
        model,
        TaskReport {
            results,
            selected,
            selected_index: best,
        },
    ))
}
