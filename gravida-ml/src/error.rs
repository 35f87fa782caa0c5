//! Error types for the gravida-ml crate.

use thiserror::Error;

/// Top-level error type for pipeline operations.
#[derive(Debug, Error)]
pub enum GravidaError {
    #[error("Dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid symptom value {value} at position {index}: answers must be 0 or 1")]
    InvalidSymptomValue { index: usize, value: i64 },

    #[error("Degenerate feature: {0}")]
    DegenerateFeature(String),

    #[error("Degenerate dataset: {0}")]
    DegenerateDataset(String),

    #[error("Model not trained: {0}")]
    ModelNotTrained(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl GravidaError {
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    pub fn degenerate_feature(msg: impl Into<String>) -> Self {
        Self::DegenerateFeature(msg.into())
    }

    pub fn degenerate_dataset(msg: impl Into<String>) -> Self {
        Self::DegenerateDataset(msg.into())
    }

    pub fn not_trained(msg: impl Into<String>) -> Self {
        Self::ModelNotTrained(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GravidaError>;
