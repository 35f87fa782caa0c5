//! Inference-time prediction.

pub mod service;

pub use service::{PredictionRecord, PredictionService, PregnancyStatus, Trimester};
