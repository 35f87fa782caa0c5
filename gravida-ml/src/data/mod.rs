//! Synthetic data generation and dataset handling.

pub mod dataset;
pub mod generator;

pub use dataset::{Dataset, DatasetSplit, DatasetStats, LabelSet, TrainingExample};
pub use generator::{GenerationPolicy, SymptomWeights, SyntheticDataGenerator, derive_labels};
