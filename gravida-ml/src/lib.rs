//! # gravida-ml: symptom-based pregnancy and trimester estimation
//!
//! Turns a fixed yes/no symptom checklist into a probabilistic verdict:
//! pregnant or not, and if pregnant, which trimester. Training data is
//! synthetic, so the output is an estimate and never a diagnosis.
//!
//! ## Stages
//!
//! 1. **Schema**: the ordered checklist and the binary vector contract
//! 2. **Data**: synthetic examples from rule-derived, weighted or reference policies
//! 3. **Features**: standardization fitted once on the training split
//! 4. **Training**: every configured candidate for each task
//! 5. **Evaluation**: held-out scoring and deterministic model selection
//! 6. **Inference**: gated two-stage prediction
//!
//! [`Pipeline`] runs the stages in order and owns the trained state.

// Foundation
pub mod config;
pub mod error;
pub mod schema;

// Data & features
pub mod data;
pub mod features;

// Models
pub mod algorithms;
pub mod training;

// Evaluation & serving
pub mod eval;
pub mod inference;
pub mod pipeline;

// Re-exports
pub use algorithms::{Classifier, ClassifierKind, Probabilities};
pub use config::{ConfigLoader, PipelineConfig, load_config};
pub use error::{GravidaError, Result};
pub use inference::{PredictionRecord, PredictionService, PregnancyStatus, Trimester};
pub use pipeline::{Pipeline, TaskReport, TrainingReport};
pub use schema::{SchemaVariant, SymptomSchema, SymptomVector};
