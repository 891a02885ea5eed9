//! Fatty-liver (NAFL vs NASH) classifier.
//!
//! The trained branch reports label 1 as "NAFL" with the steatohepatitis
//! description and every other label as "NASH" with the simple-steatosis
//! description. This mirrors the deployed artifact's label encoding and is
//! kept as is until the training labels are confirmed.

use std::sync::Arc;

use crate::adapters::artifact::ModelDirectory;
use crate::domain::{
    Classification, ClinicalField, ColorTag, Disease, FattyLiverClass, FeatureVector,
    FieldSchema, PatientRecord, RiskResult, ScoreName, TraditionalScoreSet,
};
use crate::ports::{Classifier, PredictionError, RiskPredictor};

use super::cirrhosis::legacy_columns;
use super::{above, below, embedded_scores, positive_class, ratio};

pub const MODEL: &str = "nafld/catboost_model.json";

const TRAINED_MODEL_TYPE: &str = "CatBoost Trained Model";
const RULE_MODEL_TYPE: &str = "Rule-based Classification";

const STEATOHEPATITIS: &str = "Non-Alcoholic Steatohepatitis (Inflammatory)";
const SIMPLE_STEATOSIS: &str = "Non-Alcoholic Fatty Liver (Simple Steatosis)";

/// Rule scores above this are classified NASH.
const RULE_THRESHOLD: f64 = 0.6;
const RULE_MAX_CONFIDENCE: f64 = 95.0;

const EMBEDDED: [ScoreName; 4] = [
    ScoreName::Nfs,
    ScoreName::Fib4,
    ScoreName::Apri,
    ScoreName::BmiCategory,
];

pub enum NafldEngine {
    Trained(Arc<dyn Classifier>),
    RuleBased,
}

pub struct NafldPredictor {
    engine: NafldEngine,
    schema: FieldSchema,
}

impl NafldPredictor {
    #[must_use]
    pub fn new(engine: NafldEngine) -> Self {
        Self {
            engine,
            schema: schema(),
        }
    }

    #[must_use]
    pub fn rule_based() -> Self {
        Self::new(NafldEngine::RuleBased)
    }

    /// Use the trained artifact if present and readable, else the rules.
    #[must_use]
    pub fn load(models: &ModelDirectory) -> Self {
        let engine = if models.exists(MODEL) {
            match models.classifier(MODEL) {
                Ok(classifier) => NafldEngine::Trained(Arc::new(classifier)),
                Err(e) => {
                    tracing::warn!("NAFLD artifact unusable ({e}), using rule-based classification");
                    NafldEngine::RuleBased
                }
            }
        } else {
            NafldEngine::RuleBased
        };
        let predictor = Self::new(engine);
        tracing::info!("NAFLD predictor ready: {}", predictor.model_type());
        predictor
    }

    fn classify(
        &self,
        features: &FeatureVector,
    ) -> Result<(Classification, ColorTag), PredictionError> {
        match &self.engine {
            NafldEngine::Trained(classifier) => {
                let probs = classifier.predict_proba(features.as_slice())?;
                let label = probs.predicted_label();
                let outcome = if label == 1 {
                    let p0 = probs.at(0).unwrap_or_default();
                    (
                        Classification {
                            classification: FattyLiverClass::Nafl,
                            classification_description: STEATOHEPATITIS,
                            confidence: p0 * 100.0,
                            prediction_class: label,
                        },
                        ColorTag::Warning,
                    )
                } else {
                    (
                        Classification {
                            classification: FattyLiverClass::Nash,
                            classification_description: SIMPLE_STEATOSIS,
                            confidence: positive_class(&probs)? * 100.0,
                            prediction_class: label,
                        },
                        ColorTag::Danger,
                    )
                };
                Ok(outcome)
            }
            NafldEngine::RuleBased => {
                let score = rule_score(features);
                let outcome = if score > RULE_THRESHOLD {
                    (
                        Classification {
                            classification: FattyLiverClass::Nash,
                            classification_description: STEATOHEPATITIS,
                            confidence: (score * 100.0).min(RULE_MAX_CONFIDENCE),
                            prediction_class: 1,
                        },
                        ColorTag::Danger,
                    )
                } else {
                    (
                        Classification {
                            classification: FattyLiverClass::Nafl,
                            classification_description: SIMPLE_STEATOSIS,
                            confidence: ((1.0 - score) * 100.0).min(RULE_MAX_CONFIDENCE),
                            prediction_class: 1,
                        },
                        ColorTag::Warning,
                    )
                };
                Ok(outcome)
            }
        }
    }
}

impl RiskPredictor for NafldPredictor {
    fn disease(&self) -> Disease {
        Disease::Nafld
    }

    fn model_type(&self) -> &str {
        match self.engine {
            NafldEngine::Trained(_) => TRAINED_MODEL_TYPE,
            NafldEngine::RuleBased => RULE_MODEL_TYPE,
        }
    }

    fn predict(&self, patient: &PatientRecord) -> Result<RiskResult, PredictionError> {
        let features = self.schema.map(patient)?;
        tracing::debug!("NAFLD feature vector mapped ({} columns)", features.len());

        let (classification, color) = self.classify(&features)?;
        let scores = embedded_scores(patient, &EMBEDDED);
        let interpretation = narrative(&features, &scores, classification.classification);

        Ok(RiskResult::classification(
            Disease::Nafld,
            classification,
            color,
            self.model_type(),
            interpretation,
            scores,
        ))
    }
}

fn schema() -> FieldSchema {
    FieldSchema::new("NAFLD", legacy_columns())
}

/// Additive steatohepatitis score. Unbounded above; only the 0.6 cut matters.
#[must_use]
pub fn rule_score(features: &FeatureVector) -> f64 {
    use ClinicalField::*;
    let get = |f| features.value(f).unwrap_or_default();

    let enzymes = get(Ast).max(get(Alt));

    let mut score = above(get(Age), &[(50.0, 0.3), (40.0, 0.2)]);
    score += above(get(Bmi), &[(35.0, 0.4), (30.0, 0.3), (25.0, 0.2)]);
    score += above(enzymes, &[(80.0, 0.4), (40.0, 0.3), (30.0, 0.2)]);
    if let Some(r) = ratio(features.value(Ast), features.value(Alt)) {
        score += above(r, &[(1.5, 0.3), (1.0, 0.2)]);
    }
    score += below(get(PlateletCount), &[(150.0, 0.2)]);
    score += below(get(Albumin), &[(3.5, 0.2), (4.0, 0.1)]);
    score += above(get(Inr), &[(1.3, 0.2), (1.1, 0.1)]);
    score
}

fn narrative(
    features: &FeatureVector,
    scores: &TraditionalScoreSet,
    classification: FattyLiverClass,
) -> String {
    use ClinicalField::*;
    let get = |f| features.value(f).unwrap_or_default();

    let mut parts: Vec<&str> = match classification {
        FattyLiverClass::Nash => vec![
            "NASH (Non-Alcoholic Steatohepatitis) is characterized by liver inflammation and may progress to fibrosis.",
            "This condition requires active monitoring and intervention.",
        ],
        FattyLiverClass::Nafl => vec![
            "NAFL (Non-Alcoholic Fatty Liver) is simple steatosis without significant inflammation.",
            "This is a milder form but still requires lifestyle modifications.",
        ],
    };

    let bmi = get(Bmi);
    if bmi >= 30.0 {
        parts.push("Obesity (BMI >=30) significantly increases progression risk.");
    } else if bmi >= 25.0 {
        parts.push("Overweight status (BMI 25-29.9) is a moderate risk factor.");
    }

    if get(Ast) > 40.0 || get(Alt) > 40.0 {
        parts.push("Elevated liver enzymes suggest hepatic inflammation.");
    }
    if ratio(features.value(Ast), features.value(Alt)).is_some_and(|r| r > 1.5) {
        parts.push("AST/ALT ratio >1.5 may indicate more advanced disease.");
    }

    if let Some(nfs) = scores.number(ScoreName::Nfs) {
        parts.push(if nfs < -1.455 {
            "NFS <-1.455 suggests low probability of advanced fibrosis."
        } else if nfs > 0.676 {
            "NFS >0.676 suggests high probability of advanced fibrosis."
        } else {
            "NFS in intermediate range - further evaluation may be needed."
        });
    }
    match scores.number(ScoreName::Fib4) {
        Some(v) if v < 1.30 => parts.push("FIB-4 <1.30 suggests low risk of advanced fibrosis."),
        Some(v) if v > 2.67 => parts.push("FIB-4 >2.67 suggests high risk of advanced fibrosis."),
        _ => {}
    }

    parts.push(match classification {
        FattyLiverClass::Nash => {
            "NASH requires lifestyle intervention, regular monitoring, and possible medical treatment."
        }
        FattyLiverClass::Nafl => {
            "NAFL management focuses on lifestyle modifications and monitoring for progression."
        }
    });

    parts.join(" ")
}
