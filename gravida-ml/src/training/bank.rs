//! Trains every configured candidate for the pregnancy and trimester tasks.

use serde::{Deserialize, Serialize};

use crate::algorithms::{Classifier, ClassifierKind};
use crate::data::Dataset;
use crate::error::{GravidaError, Result};
use crate::training::reproducibility::SeedManager;

/// Which examples the trimester predictor learns from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimesterStrategy {
    /// Only pregnant examples; labels are 1..=3.
    #[default]
    PregnantOnly,
    /// Every example; trimester 0 is a fourth class.
    AllClasses,
}

impl TrimesterStrategy {
    /// Rows and labels the trimester task uses from `dataset`, where
    /// `rows[i]` is the scaled form of the dataset's i-th example.
    pub fn select(&self, dataset: &Dataset, rows: &[Vec<f64>]) -> (Vec<Vec<f64>>, Vec<u8>) {
        dataset
            .examples()
            .iter()
            .zip(rows)
            .filter(|(e, _)| *self == Self::AllClasses || e.pregnant == 1)
            .map(|(e, r)| (r.clone(), e.trimester))
            .unzip()
    }
}

/// Candidates trained for each task, in registration order.
pub struct TrainedBank {
    pub pregnancy: Vec<Box<dyn Classifier>>,
    /// Absent when the dataset carries no trimester labels.
    pub trimester: Option<Vec<Box<dyn Classifier>>>,
}

/// The ordered list of predictor families to train for each task.
#[derive(Debug, Clone)]
pub struct ClassifierBank {
    candidates: Vec<ClassifierKind>,
    strategy: TrimesterStrategy,
}

impl ClassifierBank {
    pub fn new(candidates: Vec<ClassifierKind>, strategy: TrimesterStrategy) -> Result<Self> {
        if candidates.is_empty() {
            return Err(GravidaError::config("at least one candidate predictor is required"));
        }
        for kind in &candidates {
            kind.validate()?;
        }
        Ok(Self {
            candidates,
            strategy,
        })
    }

    pub fn candidates(&self) -> &[ClassifierKind] {
        &self.candidates
    }

    pub fn strategy(&self) -> TrimesterStrategy {
        self.strategy
    }

    /// `rows` are the scaled features of `train`, in the same order.
    pub fn train(
        &self,
        train: &Dataset,
        rows: &[Vec<f64>],
        seeds: &mut SeedManager,
    ) -> Result<TrainedBank> {
        if rows.len() != train.len() {
            return Err(GravidaError::dimension_mismatch(train.len(), rows.len()));
        }

        let pregnancy = self.train_task("pregnancy", rows, &train.pregnancy_labels(), seeds)?;

        let trimester = if train.has_trimester() {
            let (t_rows, t_labels) = self.strategy.select(train, rows);
            Some(self.train_task("trimester", &t_rows, &t_labels, seeds)?)
        } else {
            tracing::info!("Dataset has no trimester labels; skipping trimester task");
            None
        };

        Ok(TrainedBank {
            pregnancy,
            trimester,
        })
    }

    fn train_task(
        &self,
        task: &str,
        rows: &[Vec<f64>],
        labels: &[u8],
        seeds: &mut SeedManager,
    ) -> Result<Vec<Box<dyn Classifier>>> {
        self.candidates
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let seed = seeds.get_seed(&format!("{task}/{}/{i}", kind.name()));
                let mut model = kind.build(seed);
                model.fit(rows, labels)?;
                tracing::debug!(task, predictor = model.name(), rows = rows.len(), "Trained predictor");
                Ok(model)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{LabelSet, TrainingExample};
    use crate::schema::SymptomVector;

    fn dataset(labels: LabelSet) -> Dataset {
        let rows = [
            ([true, true], 1, 1),
            ([true, false], 1, 2),
            ([false, true], 1, 3),
            ([false, false], 0, 0),
            ([true, true], 1, 1),
            ([true, false], 1, 2),
            ([false, true], 1, 3),
            ([false, false], 0, 0),
        ];
        Dataset::new(
            rows.iter()
                .map(|(bits, pregnant, trimester)| TrainingExample {
                    symptoms: SymptomVector::from_bits(bits.to_vec()),
                    pregnant: *pregnant,
                    trimester: if labels == LabelSet::PregnancyOnly { 0 } else { *trimester },
                })
                .collect(),
            labels,
        )
    }

    #[test]
    fn test_strategy_selects_rows() {
        let ds = dataset(LabelSet::PregnancyAndTrimester);
        let rows = ds.features();
        let (_, only) = TrimesterStrategy::PregnantOnly.select(&ds, &rows);
        assert_eq!(only, vec![1, 2, 3, 1, 2, 3]);
        let (all_rows, all) = TrimesterStrategy::AllClasses.select(&ds, &rows);
        assert_eq!(all_rows.len(), 8);
        assert!(all.contains(&0));
    }

    #[test]
    fn test_trains_every_candidate() {
        let ds = dataset(LabelSet::PregnancyAndTrimester);
        let rows = ds.features();
        let bank = ClassifierBank::new(
            vec![ClassifierKind::k_nearest_neighbors(), ClassifierKind::logistic_regression()],
            TrimesterStrategy::PregnantOnly,
        )
        .unwrap();
        let trained = bank.train(&ds, &rows, &mut SeedManager::new(1)).unwrap();
        assert_eq!(trained.pregnancy.len(), 2);
        assert_eq!(trained.pregnancy[0].name(), "k_nearest_neighbors");
        assert_eq!(trained.trimester.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_pregnancy_only_dataset_skips_trimester() {
        let ds = dataset(LabelSet::PregnancyOnly);
        let rows = ds.features();
        let bank =
            ClassifierBank::new(vec![ClassifierKind::k_nearest_neighbors()], TrimesterStrategy::AllClasses)
                .unwrap();
        let trained = bank.train(&ds, &rows, &mut SeedManager::new(1)).unwrap();
        assert!(trained.trimester.is_none());
    }

    #[test]
    fn test_training_leaves_dataset_untouched() {
        let ds = dataset(LabelSet::PregnancyAndTrimester);
        let before = ds.clone();
        let rows = ds.features();
        let bank = ClassifierBank::new(
            vec![ClassifierKind::random_forest()],
            TrimesterStrategy::AllClasses,
        )
        .unwrap();
        bank.train(&ds, &rows, &mut SeedManager::new(3)).unwrap();
        assert_eq!(ds, before);
    }

    #[test]
    fn test_empty_bank_rejected() {
        assert!(matches!(
            ClassifierBank::new(Vec::new(), TrimesterStrategy::PregnantOnly),
            Err(GravidaError::Config(_))
        ));
    }
}
