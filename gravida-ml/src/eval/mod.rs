//! Held-out evaluation and model selection.

pub mod harness;
pub mod metrics;

pub use harness::{EvaluationHarness, select_best};
pub use metrics::{ClassReport, ConfusionMatrix, EvaluationResult};
