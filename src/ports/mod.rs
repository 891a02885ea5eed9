//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the assessment logic and trained model artifacts.

mod classifier;
mod predictor;

pub use classifier::{ClassProbabilities, Classifier, ModelError};
pub use predictor::{PredictionError, RiskPredictor};
