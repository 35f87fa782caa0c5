//! Labeled examples and the reproducible stratified train/test split.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{GravidaError, Result};
use crate::schema::SymptomVector;

/// One generated symptom vector with its labels.
///
/// `trimester` is 1..=3 when `pregnant == 1` and 0 otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub symptoms: SymptomVector,
    pub pregnant: u8,
    pub trimester: u8,
}

/// Which labels a dataset actually carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSet {
    /// Pregnancy labels only; trimester is always 0.
    PregnancyOnly,
    PregnancyAndTrimester,
}

/// An ordered, read-only collection of examples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    examples: Vec<TrainingExample>,
    labels: LabelSet,
}

/// Training and held-out partitions of one dataset.
#[derive(Debug, Clone)]
pub struct DatasetSplit {
    pub train: Dataset,
    pub test: Dataset,
}

/// Summary counts reported alongside training results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total: usize,
    pub train: usize,
    pub test: usize,
    pub pregnant: usize,
    pub not_pregnant: usize,
    pub trimester_counts: BTreeMap<u8, usize>,
}

impl Dataset {
    pub fn new(examples: Vec<TrainingExample>, labels: LabelSet) -> Self {
        Self { examples, labels }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn labels(&self) -> LabelSet {
        self.labels
    }

    pub fn has_trimester(&self) -> bool {
        self.labels == LabelSet::PregnancyAndTrimester
    }

    pub fn features(&self) -> Vec<Vec<f64>> {
        self.examples.iter().map(|e| e.symptoms.to_features()).collect()
    }

    pub fn pregnancy_labels(&self) -> Vec<u8> {
        self.examples.iter().map(|e| e.pregnant).collect()
    }

    pub fn trimester_labels(&self) -> Vec<u8> {
        self.examples.iter().map(|e| e.trimester).collect()
    }

    /// Examples labelled pregnant, in their original order.
    pub fn pregnant_subset(&self) -> Dataset {
        Dataset {
            examples: self
                .examples
                .iter()
                .filter(|e| e.pregnant == 1)
                .cloned()
                .collect(),
            labels: self.labels,
        }
    }

    /// Label the split is balanced on: the trimester when present (it also
    /// encodes pregnancy), otherwise the pregnancy flag.
    fn stratum(&self, example: &TrainingExample) -> u8 {
        match self.labels {
            LabelSet::PregnancyAndTrimester => example.trimester,
            LabelSet::PregnancyOnly => example.pregnant,
        }
    }

    pub fn stratum_counts(&self) -> BTreeMap<u8, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.examples {
            *counts.entry(self.stratum(e)).or_insert(0) += 1;
        }
        counts
    }

    /// A split needs both pregnancy classes and at least two examples per stratum.
    pub fn check_stratifiable(&self) -> Result<()> {
        if self.is_empty() {
            return Err(GravidaError::degenerate_dataset("dataset is empty"));
        }
        let pregnant = self.examples.iter().filter(|e| e.pregnant == 1).count();
        if pregnant == 0 || pregnant == self.len() {
            return Err(GravidaError::degenerate_dataset(format!(
                "both pregnancy classes are required, got {pregnant} pregnant of {}",
                self.len()
            )));
        }
        if self.has_trimester() {
            for trimester in 1..=3u8 {
                if !self.examples.iter().any(|e| e.trimester == trimester) {
                    return Err(GravidaError::degenerate_dataset(format!(
                        "no examples for trimester {trimester}"
                    )));
                }
            }
        }
        if let Some((label, count)) = self.stratum_counts().into_iter().find(|(_, c)| *c < 2) {
            return Err(GravidaError::degenerate_dataset(format!(
                "label {label} has {count} example(s); stratified split needs at least 2"
            )));
        }
        Ok(())
    }

    /// Partition into train/test, keeping each stratum's share of the test
    /// split close to `test_fraction`. Both partitions keep dataset order.
    pub fn stratified_split<R: Rng + ?Sized>(
        &self,
        test_fraction: f64,
        rng: &mut R,
    ) -> Result<DatasetSplit> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(GravidaError::config(format!(
                "test fraction must be in (0, 1), got {test_fraction}"
            )));
        }
        self.check_stratifiable()?;

        let mut by_stratum: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
        for (i, e) in self.examples.iter().enumerate() {
            by_stratum.entry(self.stratum(e)).or_default().push(i);
        }

        let mut is_test = vec![false; self.len()];
        for indices in by_stratum.values_mut() {
            indices.shuffle(rng);
            let count = indices.len();
            let n_test = ((count as f64) * test_fraction).round() as usize;
            let n_test = n_test.clamp(1, count - 1);
            for &i in &indices[..n_test] {
                is_test[i] = true;
            }
        }

        let (test, train): (Vec<_>, Vec<_>) = self
            .examples
            .iter()
            .zip(is_test)
            .partition(|(_, test)| *test);

        Ok(DatasetSplit {
            train: Dataset::new(train.into_iter().map(|(e, _)| e.clone()).collect(), self.labels),
            test: Dataset::new(test.into_iter().map(|(e, _)| e.clone()).collect(), self.labels),
        })
    }
}

impl DatasetSplit {
    pub fn stats(&self) -> DatasetStats {
        let all = self.train.examples.iter().chain(self.test.examples.iter());
        let mut pregnant = 0;
        let mut trimester_counts = BTreeMap::new();
        for e in all {
            if e.pregnant == 1 {
                pregnant += 1;
            }
            *trimester_counts.entry(e.trimester).or_insert(0) += 1;
        }
        let total = self.train.len() + self.test.len();
        DatasetStats {
            total,
            train: self.train.len(),
            test: self.test.len(),
            pregnant,
            not_pregnant: total - pregnant,
            trimester_counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn example(bits: &[bool], pregnant: u8, trimester: u8) -> TrainingExample {
        TrainingExample {
            symptoms: SymptomVector::from_bits(bits.to_vec()),
            pregnant,
            trimester,
        }
    }

    fn balanced(n_per_stratum: usize) -> Dataset {
        let mut examples = Vec::new();
        for trimester in 0..=3u8 {
            for i in 0..n_per_stratum {
                examples.push(example(
                    &[i % 2 == 0, trimester > 0],
                    u8::from(trimester > 0),
                    trimester,
                ));
            }
        }
        Dataset::new(examples, LabelSet::PregnancyAndTrimester)
    }

    #[test]
    fn test_split_preserves_strata() {
        let ds = balanced(10);
        let mut rng = StdRng::seed_from_u64(3);
        let split = ds.stratified_split(0.2, &mut rng).unwrap();
        assert_eq!(split.train.len() + split.test.len(), 40);
        for (label, count) in split.test.stratum_counts() {
            assert_eq!(count, 2, "stratum {label}");
        }
    }

    #[test]
    fn test_split_is_reproducible() {
        let ds = balanced(25);
        let a = ds
            .stratified_split(0.3, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = ds
            .stratified_split(0.3, &mut StdRng::seed_from_u64(9))
            .unwrap();
        assert_eq!(a.test, b.test);
        assert_eq!(a.train, b.train);
    }

    #[test]
    fn test_split_rejects_single_class() {
        let ds = Dataset::new(
            vec![example(&[true], 1, 0), example(&[false], 1, 0)],
            LabelSet::PregnancyOnly,
        );
        let err = ds
            .stratified_split(0.2, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert!(matches!(err, GravidaError::DegenerateDataset(_)));
    }

    #[test]
    fn test_split_rejects_lonely_stratum() {
        let ds = Dataset::new(
            vec![
                example(&[true], 1, 1),
                example(&[true], 1, 1),
                example(&[false], 0, 0),
            ],
            LabelSet::PregnancyOnly,
        );
        assert!(matches!(
            ds.check_stratifiable(),
            Err(GravidaError::DegenerateDataset(_))
        ));
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let ds = balanced(4);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            ds.stratified_split(1.0, &mut rng),
            Err(GravidaError::Config(_))
        ));
    }

    #[test]
    fn test_pregnant_subset() {
        let ds = balanced(3);
        let subset = ds.pregnant_subset();
        assert_eq!(subset.len(), 9);
        assert!(subset.trimester_labels().iter().all(|t| *t > 0));
    }
}
