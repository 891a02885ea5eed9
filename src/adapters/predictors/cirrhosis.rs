//! Cirrhosis risk predictor.
//!
//! Artifact generations are probed in order at load time:
//! 1. current: `cirrhosis_model_xgb.json` applied to raw features
//! 2. legacy: `cirrhosis_model.json` behind a fitted imputer and scaler
//! 3. the additive rule table in [`rule_probability`]

use std::sync::Arc;

use crate::adapters::artifact::{ModelDirectory, SimpleImputer, StandardScaler};
use crate::domain::{
    BinaryRisk, ClinicalField, Column, Disease, FeatureVector, FieldSchema, PatientRecord,
    RiskLevel, RiskResult, ScoreName, TraditionalScoreSet,
};
use crate::ports::{Classifier, PredictionError, RiskPredictor};

use super::{above, below, embedded_scores, positive_class, ratio};

pub const CURRENT_MODEL: &str = "cirrhosis_model_xgb.json";
pub const CURRENT_SCALER: &str = "cirrhosis_scaler_xgb.json";
pub const CURRENT_IMPUTER: &str = "cirrhosis_imputer_xgb.json";
pub const LEGACY_MODEL: &str = "cirrhosis_model.json";
pub const LEGACY_SCALER: &str = "cirrhosis_scaler.json";
pub const LEGACY_IMPUTER: &str = "cirrhosis_imputer.json";

const RAW_MODEL_TYPE: &str = "Raw XGBoost Model (No Preprocessing)";
const LEGACY_MODEL_TYPE: &str = "Enhanced Legacy Trained Model";
const RULE_MODEL_TYPE: &str = "Enhanced Rule-based Calculation";

const EMBEDDED: [ScoreName; 3] = [ScoreName::Fib4, ScoreName::Apri, ScoreName::Meld];

/// Scoring strategy chosen at load time.
pub enum CirrhosisEngine {
    Raw(Arc<dyn Classifier>),
    Pipeline {
        classifier: Arc<dyn Classifier>,
        imputer: SimpleImputer,
        scaler: StandardScaler,
    },
    RuleBased,
}

pub struct CirrhosisPredictor {
    engine: CirrhosisEngine,
    schema: FieldSchema,
    model_type: &'static str,
}

impl CirrhosisPredictor {
    #[must_use]
    pub fn new(engine: CirrhosisEngine) -> Self {
        let (schema, model_type) = match &engine {
            CirrhosisEngine::Raw(_) => (current_schema(), RAW_MODEL_TYPE),
            CirrhosisEngine::Pipeline { .. } => (legacy_schema(), LEGACY_MODEL_TYPE),
            CirrhosisEngine::RuleBased => (legacy_schema(), RULE_MODEL_TYPE),
        };
        Self {
            engine,
            schema,
            model_type,
        }
    }

    #[must_use]
    pub fn rule_based() -> Self {
        Self::new(CirrhosisEngine::RuleBased)
    }

    /// Probe `models` for an artifact generation, falling back to rules.
    #[must_use]
    pub fn load(models: &ModelDirectory) -> Self {
        let predictor = match Self::probe(models) {
            Ok(Some(engine)) => Self::new(engine),
            Ok(None) => {
                tracing::info!("No cirrhosis artifacts found, using rule-based calculation");
                Self::rule_based()
            }
            Err(e) => {
                tracing::warn!("Cirrhosis artifacts unusable ({e}), using rule-based calculation");
                Self::rule_based()
            }
        };
        tracing::info!("Cirrhosis predictor ready: {}", predictor.model_type);
        predictor
    }

    fn probe(
        models: &ModelDirectory,
    ) -> Result<Option<CirrhosisEngine>, crate::adapters::artifact::ArtifactError> {
        if models.all_exist(&[CURRENT_MODEL, CURRENT_SCALER, CURRENT_IMPUTER]) {
            let classifier = models.classifier(CURRENT_MODEL)?;
            return Ok(Some(CirrhosisEngine::Raw(Arc::new(classifier))));
        }
        if models.all_exist(&[LEGACY_MODEL, LEGACY_SCALER, LEGACY_IMPUTER]) {
            return Ok(Some(CirrhosisEngine::Pipeline {
                classifier: Arc::new(models.classifier(LEGACY_MODEL)?),
                imputer: models.imputer(LEGACY_IMPUTER)?,
                scaler: models.scaler(LEGACY_SCALER)?,
            }));
        }
        Ok(None)
    }

    #[must_use]
    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    fn score(&self, features: &FeatureVector) -> Result<(f64, i64), PredictionError> {
        match &self.engine {
            CirrhosisEngine::Raw(classifier) => {
                let probs = classifier.predict_proba(features.as_slice())?;
                Ok((positive_class(&probs)?, probs.predicted_label()))
            }
            CirrhosisEngine::Pipeline {
                classifier,
                imputer,
                scaler,
            } => {
                let imputed = imputer.transform(features.as_slice())?;
                let scaled = scaler.transform(&imputed)?;
                let probs = classifier.predict_proba(&scaled)?;
                Ok((positive_class(&probs)?, probs.predicted_label()))
            }
            CirrhosisEngine::RuleBased => {
                let p = rule_probability(features);
                Ok((p, i64::from(p > 0.5)))
            }
        }
    }
}

impl RiskPredictor for CirrhosisPredictor {
    fn disease(&self) -> Disease {
        Disease::Cirrhosis
    }

    fn model_type(&self) -> &str {
        self.model_type
    }

    fn predict(&self, patient: &PatientRecord) -> Result<RiskResult, PredictionError> {
        let features = self.schema.map(patient)?;
        tracing::debug!(
            "Cirrhosis feature vector mapped ({} columns, schema {})",
            features.len(),
            features.schema()
        );

        let (probability, class) = self.score(&features)?;
        let scores = embedded_scores(patient, &EMBEDDED);
        let interpretation = narrative(&features, &scores, probability);
        let risk = BinaryRisk::new(probability, class)
            .with_confidence((probability - 0.5).abs() * 2.0);

        Ok(RiskResult::binary(
            Disease::Cirrhosis,
            risk,
            self.model_type,
            interpretation,
            scores,
        ))
    }
}

fn columns(names: [&'static str; 12]) -> Vec<Column> {
    use ClinicalField::*;
    let fields = [
        Age,
        Gender,
        Ast,
        Alt,
        PlateletCount,
        Albumin,
        Bmi,
        Inr,
        TotalBilirubin,
        Creatinine,
        DirectBilirubin,
        Alp,
    ];
    fields
        .into_iter()
        .zip(names)
        .map(|(field, name)| Column::required(field, name))
        .collect()
}

fn current_schema() -> FieldSchema {
    FieldSchema::new(
        "Cirrhosis",
        columns([
            "age",
            "gender",
            "ast",
            "alt",
            "platelet",
            "albumin",
            "bmi",
            "inr",
            "total_bilirubin",
            "creatin",
            "direct_bilirubin",
            "alp",
        ]),
    )
}

fn legacy_schema() -> FieldSchema {
    FieldSchema::new("Cirrhosis", legacy_columns())
}

/// Column table of the legacy training set, also used by NAFLD.
pub(super) fn legacy_columns() -> Vec<Column> {
    columns([
        "Age",
        "Gender (Female=1, Male=2)",
        "AST",
        "ALT",
        "Trombosit",
        "Albumin",
        "Body Mass Index",
        "INR",
        "Total Bilirubin",
        "Creatinine",
        "Direct Bilirubin",
        "ALP",
    ])
}

/// Additive clinical rule score, clamped to [0.05, 0.95].
#[must_use]
pub fn rule_probability(features: &FeatureVector) -> f64 {
    use ClinicalField::*;
    let get = |f| features.value(f).unwrap_or_default();

    let mut score = above(get(Age), &[(60.0, 0.15), (50.0, 0.10), (40.0, 0.05)]);
    if let Some(r) = ratio(features.value(Ast), features.value(Alt)) {
        score += above(r, &[(2.0, 0.20), (1.5, 0.15), (1.0, 0.10)]);
    }
    score += below(get(PlateletCount), &[(100.0, 0.25), (150.0, 0.15), (200.0, 0.10)]);
    score += below(get(Albumin), &[(3.0, 0.20), (3.5, 0.15), (4.0, 0.10)]);
    score += above(get(Inr), &[(1.5, 0.20), (1.3, 0.15), (1.1, 0.10)]);
    score += above(get(TotalBilirubin), &[(2.0, 0.15), (1.5, 0.10), (1.2, 0.05)]);
    score += above(get(Bmi), &[(35.0, 0.10), (30.0, 0.05)]);
    score += above(get(Alp), &[(200.0, 0.10), (150.0, 0.05)]);

    score.clamp(0.05, 0.95)
}

fn narrative(features: &FeatureVector, scores: &TraditionalScoreSet, probability: f64) -> String {
    use ClinicalField::*;

    let mut parts = vec![match RiskLevel::from_probability(probability) {
        RiskLevel::Low => "Low cirrhosis risk based on current laboratory values.".to_string(),
        RiskLevel::Moderate => {
            "Moderate cirrhosis risk detected. Enhanced monitoring recommended.".to_string()
        }
        RiskLevel::High => {
            "High cirrhosis risk indicated. Immediate clinical evaluation advised.".to_string()
        }
    }];

    let mut findings = Vec::new();
    if let Some(r) = ratio(features.value(Ast), features.value(Alt)).filter(|r| *r > 1.0) {
        findings.push(format!("AST/ALT ratio of {r:.2} suggests possible liver damage"));
    }
    if let Some(plt) = features.value(PlateletCount).filter(|v| *v < 150.0) {
        findings.push(format!(
            "Low platelet count ({plt}) may indicate portal hypertension"
        ));
    }
    if let Some(alb) = features.value(Albumin).filter(|v| *v < 3.5) {
        findings.push(format!("Low albumin ({alb}) suggests impaired liver synthesis"));
    }
    if let Some(inr) = features.value(Inr).filter(|v| *v > 1.3) {
        findings.push(format!("Elevated INR ({inr}) indicates coagulopathy"));
    }
    if !findings.is_empty() {
        parts.push(format!("Key findings: {}", findings.join("; ")));
    }

    if let Some(fib4) = scores.number(ScoreName::Fib4) {
        let reading = if fib4 < 1.45 {
            "Low probability of advanced fibrosis"
        } else if fib4 < 3.25 {
            "Intermediate probability - further evaluation needed"
        } else {
            "High probability of advanced fibrosis"
        };
        parts.push(format!("FIB-4 score: {fib4:.2} - {reading}"));
    }

    parts.join(" ")
}
