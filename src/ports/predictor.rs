//! Risk predictor port: one disease, one uniform contract.

use crate::domain::{Disease, MappingError, PatientRecord, RiskResult};

use super::classifier::ModelError;

/// Errors a predictor can return for a single patient.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("Missing required fields for {schema} prediction: {}", fields.join(", "))]
    MissingRequiredFields {
        schema: &'static str,
        fields: Vec<String>,
    },

    #[error("Invalid value for {field} in {schema} prediction: {value:?}")]
    InvalidParameterValue {
        schema: &'static str,
        field: String,
        value: String,
    },

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

impl From<MappingError> for PredictionError {
    fn from(err: MappingError) -> Self {
        match err {
            MappingError::MissingRequiredFields { schema, fields } => {
                Self::MissingRequiredFields { schema, fields }
            }
            MappingError::InvalidParameterValue {
                schema,
                field,
                value,
            } => Self::InvalidParameterValue {
                schema,
                field,
                value,
            },
        }
    }
}

/// Trait for disease risk predictors.
///
/// The scoring strategy (trained artifact or rule-based) is fixed when the
/// predictor is constructed, never chosen per request.
pub trait RiskPredictor: Send + Sync {
    /// Condition this predictor assesses.
    fn disease(&self) -> Disease;

    /// Provenance string reported in results.
    fn model_type(&self) -> &str;

    /// Assess one patient.
    ///
    /// Pure with respect to its input: identical records yield identical
    /// results.
    ///
    /// # Errors
    /// `MissingRequiredFields` / `InvalidParameterValue` when the record
    /// cannot be mapped, `Model` when the classifier rejects the input,
    /// `ModelNotLoaded` when no scoring strategy is available.
    fn predict(&self, patient: &PatientRecord) -> Result<RiskResult, PredictionError>;
}
