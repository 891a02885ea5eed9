//! Assessment service: runs every predictor and the shared scores for one
//! patient and composes the result.

use std::io::Read;

use crate::adapters::artifact::ModelDirectory;
use crate::adapters::predictors::{
    CirrhosisPredictor, HccPredictor, NafldPredictor, UnavailablePredictor,
};
use crate::config::Settings;
use crate::domain::{
    interpret_all, scores, AssessmentResult, Disease, DiseaseEntry, FailedAssessment,
    PatientRecord, TraditionalScoreSet,
};
use crate::ports::RiskPredictor;

/// Composes per-disease predictions and traditional scores.
///
/// Predictors are built once and shared read-only across assessments. A
/// failing predictor yields an error entry for its disease; it never aborts
/// the other two.
pub struct AssessmentService {
    cirrhosis: Box<dyn RiskPredictor>,
    hcc: Box<dyn RiskPredictor>,
    nafld: Box<dyn RiskPredictor>,
}

impl AssessmentService {
    /// Create a service from already-built predictors.
    #[must_use]
    pub fn new(
        cirrhosis: Box<dyn RiskPredictor>,
        hcc: Box<dyn RiskPredictor>,
        nafld: Box<dyn RiskPredictor>,
    ) -> Self {
        Self {
            cirrhosis,
            hcc,
            nafld,
        }
    }

    /// Load all predictors from the configured model directory.
    ///
    /// Missing cirrhosis or NAFLD artifacts select the rule-based path. An
    /// HCC predictor that cannot be built is replaced by a stand-in that
    /// reports the load error on every assessment.
    ///
    /// # Errors
    /// Returns error only if the model directory itself cannot be opened,
    /// e.g. a manifest is required but absent or malformed.
    pub fn load(settings: &Settings) -> crate::Result<Self> {
        tracing::info!("Loading predictors from {}", settings.model_dir.display());

        let models = ModelDirectory::open(&settings.model_dir, settings.require_manifest)?;
        if models.is_verified() {
            tracing::info!("Model manifest present, artifacts are digest-checked");
        }

        let hcc: Box<dyn RiskPredictor> = match HccPredictor::load(&models) {
            Ok(predictor) => Box::new(predictor),
            Err(e) => {
                tracing::warn!("HCC predictor unavailable: {e}");
                Box::new(UnavailablePredictor::new(Disease::Hcc, e.to_string()))
            }
        };

        Ok(Self::new(
            Box::new(CirrhosisPredictor::load(&models)),
            hcc,
            Box::new(NafldPredictor::load(&models)),
        ))
    }

    /// Assess one patient. Never fails: every disease slot and every shared
    /// score is filled with a value or an explicit error/sentinel.
    #[must_use]
    pub fn assess(&self, patient: &PatientRecord) -> AssessmentResult {
        tracing::info!("Running assessment on {} input fields", patient.len());

        let entries = [&self.cirrhosis, &self.hcc, &self.nafld].map(|p| run(p.as_ref(), patient));

        // Child-Pugh joins the set before interpretation so it is covered too.
        let mut traditional_scores = TraditionalScoreSet::calculate(patient);
        let child_pugh = scores::child_pugh_for(patient);
        traditional_scores.insert_child_pugh(&child_pugh);
        let interpretations = interpret_all(&traditional_scores);

        let result = AssessmentResult::new(
            patient.clone(),
            entries,
            traditional_scores,
            interpretations,
            child_pugh.ok(),
        );
        tracing::info!(
            "Assessment complete ({} of 3 predictors failed)",
            result.entries().filter(|e| e.is_failed()).count()
        );
        result
    }

    /// Assess a patient given as a JSON object.
    ///
    /// # Errors
    /// Returns error if `input` is not a JSON object.
    pub fn assess_json(&self, input: &serde_json::Value) -> crate::Result<AssessmentResult> {
        let patient = PatientRecord::from_json(input)?;
        Ok(self.assess(&patient))
    }

    /// Assess a patient JSON object read from `reader`.
    ///
    /// # Errors
    /// `Io` if reading fails, `Serialization` if the text is not JSON,
    /// `Input` if it is not a JSON object.
    pub fn assess_reader<R: Read>(&self, mut reader: R) -> crate::Result<AssessmentResult> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        self.assess_json(&value)
    }

    /// Provenance of each predictor, in disease order.
    #[must_use]
    pub fn model_types(&self) -> [(Disease, &str); 3] {
        [&self.cirrhosis, &self.hcc, &self.nafld].map(|p| (p.disease(), p.model_type()))
    }
}

fn run(predictor: &dyn RiskPredictor, patient: &PatientRecord) -> DiseaseEntry {
    match predictor.predict(patient) {
        Ok(result) => DiseaseEntry::Assessed(result),
        Err(e) => {
            tracing::warn!("{} prediction failed: {e}", predictor.disease());
            DiseaseEntry::Failed(FailedAssessment::new(predictor.disease(), e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::artifact::test_support::{constant_logistic, write_json};
    use crate::domain::{ClinicalField, ColorTag, SamplePatient, ScoreName, ScoreValue};
    use crate::LiverAidError;
    use serde_json::json;

    fn settings(dir: &std::path::Path) -> Settings {
        Settings {
            model_dir: dir.to_path_buf(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_missing_hcc_artifact_yields_error_entry_only() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = AssessmentService::load(&settings(dir.path())).expect("load");

        let result = service.assess(&SamplePatient::High.record());

        assert!(!result.cirrhosis.is_failed());
        assert!(!result.nafld.is_failed());
        assert!(result.hcc.is_failed());
        assert_eq!(result.hcc.disease(), Disease::Hcc);
        assert!(result
            .hcc
            .error()
            .expect("hcc error")
            .starts_with("Model not loaded"));
        assert_eq!(result.entries().count(), 3);
    }

    #[test]
    fn test_model_types_reflect_fallbacks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = AssessmentService::load(&settings(dir.path())).expect("load");
        assert_eq!(
            service.model_types(),
            [
                (Disease::Cirrhosis, "Enhanced Rule-based Calculation"),
                (Disease::Hcc, "Unavailable"),
                (Disease::Nafld, "Rule-based Classification"),
            ]
        );
    }

    #[test]
    fn test_all_predictors_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_json(dir.path(), "hcc_model.json", &constant_logistic(13, 0.0));
        write_json(
            dir.path(),
            "hcc_scaler.json",
            &json!({"mean": vec![0.0; 11], "scale": vec![1.0; 11]}),
        );
        let service = AssessmentService::load(&settings(dir.path())).expect("load");

        let result = service.assess(&SamplePatient::Moderate.record());
        assert!(result.entries().all(|e| !e.is_failed()));
        assert_eq!(
            result.hcc.result().and_then(|r| r.risk_probability()),
            Some(0.5)
        );
    }

    #[test]
    fn test_missing_fields_contained_per_predictor() {
        let service = AssessmentService::new(
            Box::new(CirrhosisPredictor::rule_based()),
            Box::new(UnavailablePredictor::new(Disease::Hcc, "not loaded")),
            Box::new(NafldPredictor::rule_based()),
        );
        let patient = SamplePatient::Low.record().without(ClinicalField::Bmi);

        let result = service.assess(&patient);
        assert!(result.cirrhosis.is_failed());
        assert!(result.nafld.is_failed());
        assert_eq!(
            result.nafld.error(),
            Some("Missing required fields for NAFLD prediction: bmi")
        );
        assert_eq!(
            result.traditional_scores.get(ScoreName::BmiCategory),
            Some(&ScoreValue::Missing)
        );
        assert_eq!(
            result.traditional_scores.get(ScoreName::Fib4),
            TraditionalScoreSet::calculate(&patient).get(ScoreName::Fib4)
        );
    }

    #[test]
    fn test_child_pugh_added_before_interpretation() {
        let service = AssessmentService::new(
            Box::new(CirrhosisPredictor::rule_based()),
            Box::new(UnavailablePredictor::new(Disease::Hcc, "not loaded")),
            Box::new(NafldPredictor::rule_based()),
        );

        let without = service.assess(&SamplePatient::Moderate.record());
        assert!(without.child_pugh.is_none());
        assert_eq!(
            without.traditional_scores.get(ScoreName::ChildPughClass),
            Some(&ScoreValue::Missing)
        );

        let patient = SamplePatient::Moderate
            .record()
            .with(ClinicalField::Ascites, 1.0)
            .with(ClinicalField::Encephalopathy, 0.0);
        let with = service.assess(&patient);
        let cp = with.child_pugh.expect("all five inputs present");
        assert_eq!(cp.score, 8);
        assert_eq!(
            with.score_interpretations[&ScoreName::ChildPughScore].color,
            ColorTag::Warning
        );
        assert_eq!(
            with.score_interpretations.len(),
            with.traditional_scores.len()
        );
    }

    #[test]
    fn test_json_boundary() {
        let service = AssessmentService::new(
            Box::new(CirrhosisPredictor::rule_based()),
            Box::new(UnavailablePredictor::new(Disease::Hcc, "not loaded")),
            Box::new(NafldPredictor::rule_based()),
        );
        let input = json!({
            "age": "58", "gender": 2, "bmi": 33.8, "ast": 210, "alt": 185,
            "alp": 285, "platelets": 72, "albumin": 2.4, "inr": 2.8,
            "total_bilirubin": 6.2, "direct_bilirubin": 3.8, "creatinine": 2.1,
            "afp": 280
        });

        let result = service.assess_json(&input).expect("object input");
        let value = result.to_json().expect("serialize");

        assert_eq!(value["cirrhosis"]["disease"], "Cirrhosis");
        assert_eq!(value["cirrhosis"]["risk_level"], "High");
        assert_eq!(value["hcc"]["risk_level"], "Error");
        assert_eq!(value["hcc"]["risk_color"], "secondary");
        assert_eq!(value["nafld"]["classification"], "NASH");
        assert_eq!(value["traditional_scores"]["Child-Pugh Score"], "Missing Data");
        assert_eq!(value["has_afp"], true);
        assert!(value["id"].as_str().is_some_and(|id| id.len() == 36));

        assert!(matches!(
            service.assess_json(&json!([1, 2, 3])),
            Err(LiverAidError::Input(_))
        ));
    }

    #[test]
    fn test_reader_errors_are_typed() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
            }
        }

        let service = AssessmentService::new(
            Box::new(CirrhosisPredictor::rule_based()),
            Box::new(UnavailablePredictor::new(Disease::Hcc, "not loaded")),
            Box::new(NafldPredictor::rule_based()),
        );

        assert!(matches!(
            service.assess_reader(Broken),
            Err(LiverAidError::Io(_))
        ));
        assert!(matches!(
            service.assess_reader(&b"{\"age\": 58,"[..]),
            Err(LiverAidError::Serialization(_))
        ));
        assert!(matches!(
            service.assess_reader(&b"\"age\""[..]),
            Err(LiverAidError::Input(_))
        ));

        let result = service
            .assess_reader(&br#"{"age": 28, "bmi": 21.5}"#[..])
            .expect("object input");
        assert_eq!(result.patient.len(), 2);
    }
}
