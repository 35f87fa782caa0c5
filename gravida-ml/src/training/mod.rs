//! Predictor training and run reproducibility.

pub mod bank;
pub mod reproducibility;

pub use bank::{ClassifierBank, TrainedBank, TrimesterStrategy};
pub use reproducibility::SeedManager;
