//! Hepatocellular carcinoma risk predictor.
//!
//! Requires both `hcc_model.json` and `hcc_scaler.json`; there is no rule
//! table for HCC. The scaler is fitted on the numerical columns only, in
//! schema order; categorical columns reach the classifier unscaled.
//!
//! The reported risk is `1 - P(class 1)`: the artifact's positive label
//! encodes the absence of HCC.

use std::sync::Arc;

use crate::adapters::artifact::{ArtifactError, ModelDirectory, StandardScaler};
use crate::domain::{
    BinaryRisk, ClinicalField, Column, Disease, FeatureVector, FieldSchema, PatientRecord,
    RiskResult, ScoreName, TraditionalScoreSet,
};
use crate::ports::{Classifier, ModelError, PredictionError, RiskPredictor};

use super::{embedded_scores, positive_class};

pub const MODEL: &str = "hcc_model.json";
pub const SCALER: &str = "hcc_scaler.json";

const MODEL_TYPE: &str = "SVM Trained Model (Standardized)";

const CATEGORICAL: [&str; 2] = ["Gender", "Obesity"];

const EMBEDDED: [ScoreName; 4] = [
    ScoreName::Fib4,
    ScoreName::Apri,
    ScoreName::Meld,
    ScoreName::AfpRisk,
];

pub struct HccPredictor {
    classifier: Arc<dyn Classifier>,
    scaler: StandardScaler,
    schema: FieldSchema,
    numerical: Vec<usize>,
}

impl HccPredictor {
    /// # Errors
    /// `ModelError::FeatureCount` if the scaler does not cover exactly the
    /// numerical columns.
    pub fn new(classifier: Arc<dyn Classifier>, scaler: StandardScaler) -> Result<Self, ModelError> {
        let schema = schema();
        let numerical: Vec<usize> = schema
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| !CATEGORICAL.contains(&c.name))
            .map(|(i, _)| i)
            .collect();
        if scaler.len() != numerical.len() {
            return Err(ModelError::FeatureCount {
                expected: numerical.len(),
                got: scaler.len(),
            });
        }
        Ok(Self {
            classifier,
            scaler,
            schema,
            numerical,
        })
    }

    /// Load the classifier and scaler from `models`.
    ///
    /// # Errors
    /// Any artifact error; a scaler of the wrong width is reported as `Shape`.
    pub fn load(models: &ModelDirectory) -> Result<Self, ArtifactError> {
        let classifier = models.classifier(MODEL)?;
        let scaler = models.scaler(SCALER)?;
        let predictor =
            Self::new(Arc::new(classifier), scaler).map_err(|e| ArtifactError::Shape {
                name: SCALER.to_string(),
                reason: e.to_string(),
            })?;
        tracing::info!("HCC predictor ready: {MODEL_TYPE}");
        Ok(predictor)
    }

    #[must_use]
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Standardize the numerical columns in place.
    fn preprocess(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError> {
        let mut values = features.as_slice().to_vec();
        let numeric: Vec<f64> = self.numerical.iter().map(|&i| values[i]).collect();
        let scaled = self.scaler.transform(&numeric)?;
        for (&i, v) in self.numerical.iter().zip(scaled) {
            values[i] = v;
        }
        Ok(values)
    }
}

impl RiskPredictor for HccPredictor {
    fn disease(&self) -> Disease {
        Disease::Hcc
    }

    fn model_type(&self) -> &str {
        MODEL_TYPE
    }

    fn predict(&self, patient: &PatientRecord) -> Result<RiskResult, PredictionError> {
        let features = self.schema.map(patient)?;
        tracing::debug!("HCC feature vector mapped ({} columns)", features.len());

        let input = self.preprocess(&features)?;
        let probs = self.classifier.predict_proba(&input)?;
        let probability = 1.0 - positive_class(&probs)?;

        let scores = embedded_scores(patient, &EMBEDDED);
        let interpretation = narrative(&features, &scores, probability);
        let risk = BinaryRisk::new(probability, probs.predicted_label()).with_afp(patient.has_afp());

        Ok(RiskResult::binary(
            Disease::Hcc,
            risk,
            MODEL_TYPE,
            interpretation,
            scores,
        ))
    }
}

fn schema() -> FieldSchema {
    use ClinicalField::*;
    FieldSchema::new(
        "HCC",
        vec![
            Column::required(Age, "Age"),
            Column::required(Gender, "Gender"),
            Column::required(Ast, "AST"),
            Column::required(Alt, "ALT"),
            Column::required(Albumin, "Albumin"),
            Column::required(Creatinine, "Creatinine"),
            Column::required(Inr, "INR"),
            // Fitted on absolute counts, not x10^3/uL.
            Column::required(PlateletCount, "Trombosit").scaled(1000.0),
            Column::required(TotalBilirubin, "Total_Bil"),
            Column::required(DirectBilirubin, "Dir_Bil"),
            Column::optional(Obesity, "Obesity", 0.0),
            Column::required(Alp, "ALP"),
            Column::optional(Afp, "AFP", 0.0),
        ],
    )
}

fn narrative(features: &FeatureVector, scores: &TraditionalScoreSet, probability: f64) -> String {
    use ClinicalField::*;
    let get = |f| features.value(f).unwrap_or_default();

    let mut parts = Vec::new();
    if get(Age) > 60.0 {
        parts.push("Advanced age increases HCC risk.");
    }
    if get(Gender) == 2.0 {
        parts.push("Male gender is associated with higher HCC risk.");
    }
    if get(Ast) > 80.0 || get(Alt) > 80.0 {
        parts.push("Significantly elevated liver enzymes suggest hepatocellular injury.");
    }
    if get(PlateletCount) < 150_000.0 {
        parts.push("Thrombocytopenia may indicate advanced liver disease.");
    }

    let afp = get(Afp);
    if afp > 400.0 {
        parts.push("Very high AFP strongly suggests HCC.");
    } else if afp > 200.0 {
        parts.push("Elevated AFP is concerning for HCC.");
    } else if afp > 20.0 {
        parts.push("Mildly elevated AFP warrants monitoring.");
    }

    if scores.number(ScoreName::Fib4).is_some_and(|v| v > 3.25) {
        parts.push("High FIB-4 suggests advanced fibrosis.");
    }

    parts.push(if probability > 0.7 {
        "High risk warrants immediate hepatology evaluation and imaging."
    } else if probability > 0.3 {
        "Moderate risk requires close monitoring and follow-up."
    } else {
        "Low risk but continue surveillance if risk factors present."
    });

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::artifact::test_support::{constant_logistic, write_json};
    use crate::adapters::artifact::{ClassifierArtifact, LinearModel};
    use crate::domain::{RiskLevel, RiskOutcome, SamplePatient, ScoreValue};
    use serde_json::json;

    fn identity_scaler() -> StandardScaler {
        StandardScaler {
            mean: vec![0.0; 11],
            scale: vec![1.0; 11],
        }
    }

    fn constant(logit: f64) -> Arc<dyn Classifier> {
        let artifact: ClassifierArtifact =
            serde_json::from_value(constant_logistic(13, logit)).expect("parse");
        Arc::new(artifact)
    }

    fn binary(result: &RiskResult) -> BinaryRisk {
        match &result.outcome {
            RiskOutcome::Binary(b) => *b,
            other => panic!("expected binary outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_risk_is_complement_of_positive_class() {
        let predictor = HccPredictor::new(constant(-1.0), identity_scaler()).expect("build");
        let result = predictor
            .predict(&SamplePatient::High.record())
            .expect("complete record");
        let risk = binary(&result);

        let p1 = 1.0 / (1.0 + 1.0_f64.exp());
        assert!((risk.risk_probability - (1.0 - p1)).abs() < 1e-12);
        assert_eq!(risk.risk_class, 0);
        assert_eq!(risk.risk_level, RiskLevel::High);
        assert_eq!(risk.has_afp, Some(true));
        assert_eq!(result.model_type, "SVM Trained Model (Standardized)");
        assert_eq!(
            result.traditional_scores.get(ScoreName::AfpRisk),
            Some(&ScoreValue::Category("High".into()))
        );
        assert!(result
            .interpretation
            .contains("Male gender is associated with higher HCC risk."));
        assert!(result.interpretation.contains("Thrombocytopenia"));
        assert!(result.interpretation.contains("Elevated AFP is concerning for HCC."));
        assert!(result
            .interpretation
            .ends_with("High risk warrants immediate hepatology evaluation and imaging."));
    }

    #[test]
    fn test_optional_fields_default_to_zero() {
        let predictor = HccPredictor::new(constant(1.0), identity_scaler()).expect("build");
        let patient = SamplePatient::Moderate
            .record()
            .without(ClinicalField::Afp)
            .without(ClinicalField::Obesity);

        let features = predictor.schema().map(&patient).expect("optional only");
        assert_eq!(features.get("AFP"), Some(0.0));
        assert_eq!(features.get("Obesity"), Some(0.0));
        assert_eq!(features.get("Trombosit"), Some(135_000.0));

        let result = predictor.predict(&patient).expect("predict");
        assert_eq!(binary(&result).has_afp, Some(false));
        assert_eq!(binary(&result).risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_missing_required_fields() {
        let predictor = HccPredictor::new(constant(0.0), identity_scaler()).expect("build");
        let patient = SamplePatient::Low
            .record()
            .without(ClinicalField::Ast)
            .without(ClinicalField::PlateletCount);
        assert_eq!(
            predictor.predict(&patient).expect_err("missing"),
            PredictionError::MissingRequiredFields {
                schema: "HCC",
                fields: vec!["ast".into(), "platelet_count".into()],
            }
        );
    }

    #[test]
    fn test_only_numerical_columns_are_scaled() {
        // Logit = scaled age + gender - 2.
        let mut weights = vec![0.0; 13];
        weights[0] = 1.0;
        weights[1] = 1.0;
        let model = ClassifierArtifact::Logistic(LinearModel {
            feature_names: Vec::new(),
            classes: vec![0, 1],
            coefficients: vec![weights],
            intercepts: vec![-2.0],
        });
        let mut scaler = identity_scaler();
        scaler.mean[0] = 58.0;

        let predictor = HccPredictor::new(Arc::new(model), scaler).expect("build");
        let result = predictor
            .predict(&SamplePatient::High.record())
            .expect("predict");
        assert!((binary(&result).risk_probability - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scaler_width_checked() {
        let scaler = StandardScaler {
            mean: vec![0.0; 13],
            scale: vec![1.0; 13],
        };
        assert!(HccPredictor::new(constant(0.0), scaler).is_err());
    }

    #[test]
    fn test_load_requires_both_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_json(dir.path(), MODEL, &constant_logistic(13, 0.0));
        let models = ModelDirectory::open(dir.path(), false).expect("open");
        assert!(matches!(
            HccPredictor::load(&models),
            Err(ArtifactError::NotFound(_))
        ));

        write_json(
            dir.path(),
            SCALER,
            &json!({"mean": vec![0.0; 11], "scale": vec![1.0; 11]}),
        );
        let predictor = HccPredictor::load(&models).expect("both present");
        assert_eq!(predictor.model_type(), MODEL_TYPE);
    }
}
