//! Pre-fitted preprocessing steps.

use serde::Deserialize;

use super::ArtifactError;
use crate::ports::ModelError;

/// Standardization: `(x - mean) / scale` per column.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub(crate) fn validate(&self, name: &str) -> Result<(), ArtifactError> {
        if self.mean.is_empty() || self.mean.len() != self.scale.len() {
            return Err(ArtifactError::Shape {
                name: name.to_string(),
                reason: format!(
                    "{} means for {} scales",
                    self.mean.len(),
                    self.scale.len()
                ),
            });
        }
        if self.mean.iter().chain(&self.scale).any(|v| !v.is_finite()) {
            return Err(ArtifactError::Shape {
                name: name.to_string(),
                reason: "non-finite scaler parameter".into(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Standardize `values`. A zero scale leaves the centered value as is.
    ///
    /// # Errors
    /// `ModelError::FeatureCount` on length mismatch.
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, ModelError> {
        if values.len() != self.len() {
            return Err(ModelError::FeatureCount {
                expected: self.len(),
                got: values.len(),
            });
        }
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| {
                let s = if *s == 0.0 { 1.0 } else { *s };
                (x - m) / s
            })
            .collect())
    }
}

/// Replaces NaN entries with fitted per-column statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct SimpleImputer {
    pub statistics: Vec<f64>,
}

impl SimpleImputer {
    /// # Errors
    /// `ModelError::FeatureCount` on length mismatch.
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, ModelError> {
        if values.len() != self.statistics.len() {
            return Err(ModelError::FeatureCount {
                expected: self.statistics.len(),
                got: values.len(),
            });
        }
        Ok(values
            .iter()
            .zip(&self.statistics)
            .map(|(x, fill)| if x.is_nan() { *fill } else { *x })
            .collect())
    }
}
