use crate::domain::{Disease, PatientRecord, RiskResult};
use crate::ports::{PredictionError, RiskPredictor};

/// Stands in for a predictor whose artifacts could not be loaded.
///
/// Every call fails with `ModelNotLoaded`, so the assessment reports an
/// error entry for this disease while the others proceed.
pub struct UnavailablePredictor {
    disease: Disease,
    reason: String,
}

impl UnavailablePredictor {
    #[must_use]
    pub fn new(disease: Disease, reason: impl Into<String>) -> Self {
        Self {
            disease,
            reason: reason.into(),
        }
    }
}

impl RiskPredictor for UnavailablePredictor {
    fn disease(&self) -> Disease {
        self.disease
    }

    fn model_type(&self) -> &str {
        "Unavailable"
    }

    fn predict(&self, _patient: &PatientRecord) -> Result<RiskResult, PredictionError> {
        Err(PredictionError::ModelNotLoaded(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SamplePatient;

    #[test]
    fn test_always_reports_model_not_loaded() {
        let predictor = UnavailablePredictor::new(Disease::Hcc, "HCC model files not found");
        let err = predictor
            .predict(&SamplePatient::Low.record())
            .expect_err("unavailable");
        assert_eq!(err.to_string(), "Model not loaded: HCC model files not found");
        assert_eq!(predictor.disease(), Disease::Hcc);
    }
}
