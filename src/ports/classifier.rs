//! Classifier port: a trained artifact treated as an opaque scoring function.

use serde::Serialize;

/// Errors raised while scoring a feature vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Feature count mismatch: model expects {expected}, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("Model produced invalid output: {0}")]
    InvalidOutput(String),
}

/// Per-class probabilities in the classifier's class order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassProbabilities {
    labels: Vec<i64>,
    probabilities: Vec<f64>,
}

impl ClassProbabilities {
    /// # Errors
    /// Returns `ModelError::InvalidOutput` when the two lists differ in
    /// length, are empty, or hold a non-finite probability.
    pub fn new(labels: Vec<i64>, probabilities: Vec<f64>) -> Result<Self, ModelError> {
        if labels.is_empty() || labels.len() != probabilities.len() {
            return Err(ModelError::InvalidOutput(format!(
                "{} labels for {} probabilities",
                labels.len(),
                probabilities.len()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::InvalidOutput(
                "non-finite class probability".to_string(),
            ));
        }
        Ok(Self {
            labels,
            probabilities,
        })
    }

    #[must_use]
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    /// Probability at class index `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<f64> {
        self.probabilities.get(index).copied()
    }

    /// Label with the highest probability; the first one wins ties.
    #[must_use]
    pub fn predicted_label(&self) -> i64 {
        let mut best = 0;
        for (i, p) in self.probabilities.iter().enumerate() {
            if *p > self.probabilities[best] {
                best = i;
            }
        }
        self.labels[best]
    }
}

/// A pre-fitted classifier.
///
/// Implementations are immutable after load and may be shared across
/// threads.
pub trait Classifier: Send + Sync {
    /// Number of features the classifier was fitted on.
    fn n_features(&self) -> usize;

    /// Score one feature vector.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureCount` if `features` has the wrong length.
    fn predict_proba(&self, features: &[f64]) -> Result<ClassProbabilities, ModelError>;

    /// Check the input length against [`Classifier::n_features`].
    ///
    /// # Errors
    /// Returns `ModelError::FeatureCount` on mismatch.
    fn check_features(&self, features: &[f64]) -> Result<(), ModelError> {
        if features.len() == self.n_features() {
            Ok(())
        } else {
            Err(ModelError::FeatureCount {
                expected: self.n_features(),
                got: features.len(),
            })
        }
    }
}
