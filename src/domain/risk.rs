//! Risk result types.
//!
//! Represents the output of the three disease predictors and the aggregate
//! assessment built from them.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use super::interpretation::{ColorTag, ScoreInterpretation};
use super::patient::PatientRecord;
use super::scores::{ChildPugh, ScoreName, TraditionalScoreSet};

/// Conditions assessed by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disease {
    Cirrhosis,
    Hcc,
    Nafld,
}

impl Disease {
    pub const ALL: [Disease; 3] = [Self::Cirrhosis, Self::Hcc, Self::Nafld];

    /// Label shown to clinicians.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cirrhosis => "Cirrhosis",
            Self::Hcc => "HCC (Hepatocellular Carcinoma)",
            Self::Nafld => "MAFLD Classification",
        }
    }

}

impl std::fmt::Display for Disease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Disease {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Risk level classification for a binary predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    /// p < 0.3
    Low,
    /// 0.3 <= p < 0.7
    Moderate,
    /// p >= 0.7
    High,
}

impl RiskLevel {
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.3 {
            Self::Low
        } else if probability < 0.7 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    #[must_use]
    pub fn color(&self) -> ColorTag {
        match self {
            Self::Low => ColorTag::Success,
            Self::Moderate => ColorTag::Warning,
            Self::High => ColorTag::Danger,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Moderate => write!(f, "Moderate"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Outcome of a binary risk predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BinaryRisk {
    /// Probability of the condition (0.0 to 1.0)
    pub risk_probability: f64,

    pub risk_percentage: f64,

    /// Class label reported by the classifier (or rule set)
    pub risk_class: i64,

    pub risk_level: RiskLevel,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_afp: Option<bool>,
}

impl BinaryRisk {
    #[must_use]
    pub fn new(risk_probability: f64, risk_class: i64) -> Self {
        Self {
            risk_probability,
            risk_percentage: risk_probability * 100.0,
            risk_class,
            risk_level: RiskLevel::from_probability(risk_probability),
            confidence: None,
            has_afp: None,
        }
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn with_afp(mut self, has_afp: bool) -> Self {
        self.has_afp = Some(has_afp);
        self
    }
}

/// Fatty-liver classification labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FattyLiverClass {
    #[serde(rename = "NAFL")]
    Nafl,
    #[serde(rename = "NASH")]
    Nash,
}

impl FattyLiverClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nafl => "NAFL",
            Self::Nash => "NASH",
        }
    }
}

/// Outcome of the fatty-liver classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub classification: FattyLiverClass,
    pub classification_description: &'static str,
    /// Percentage, 0 to 100
    pub confidence: f64,
    pub prediction_class: i64,
}

/// Either a binary risk or a classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RiskOutcome {
    Binary(BinaryRisk),
    Classification(Classification),
}

/// Result of one predictor invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskResult {
    pub disease: Disease,

    #[serde(flatten)]
    pub outcome: RiskOutcome,

    pub risk_color: ColorTag,

    /// Provenance: which artifact generation or fallback produced this
    pub model_type: String,

    pub interpretation: String,

    /// Scores this predictor reports alongside its outcome
    pub traditional_scores: TraditionalScoreSet,
}

impl RiskResult {
    /// Build a binary result; the color follows the risk level.
    #[must_use]
    pub fn binary(
        disease: Disease,
        risk: BinaryRisk,
        model_type: impl Into<String>,
        interpretation: String,
        traditional_scores: TraditionalScoreSet,
    ) -> Self {
        Self {
            disease,
            risk_color: risk.risk_level.color(),
            outcome: RiskOutcome::Binary(risk),
            model_type: model_type.into(),
            interpretation,
            traditional_scores,
        }
    }

    #[must_use]
    pub fn classification(
        disease: Disease,
        classification: Classification,
        risk_color: ColorTag,
        model_type: impl Into<String>,
        interpretation: String,
        traditional_scores: TraditionalScoreSet,
    ) -> Self {
        Self {
            disease,
            outcome: RiskOutcome::Classification(classification),
            risk_color,
            model_type: model_type.into(),
            interpretation,
            traditional_scores,
        }
    }

    /// Risk probability for binary outcomes.
    #[must_use]
    pub fn risk_probability(&self) -> Option<f64> {
        match &self.outcome {
            RiskOutcome::Binary(b) => Some(b.risk_probability),
            RiskOutcome::Classification(_) => None,
        }
    }
}

/// Stand-in for a predictor that failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAssessment {
    pub disease: Disease,
    pub risk_level: &'static str,
    pub risk_color: ColorTag,
    pub error: String,
}

impl FailedAssessment {
    #[must_use]
    pub fn new(disease: Disease, error: impl ToString) -> Self {
        Self {
            disease,
            risk_level: "Error",
            risk_color: ColorTag::Secondary,
            error: error.to_string(),
        }
    }
}

/// One disease slot of an assessment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DiseaseEntry {
    Assessed(RiskResult),
    Failed(FailedAssessment),
}

impl DiseaseEntry {
    #[must_use]
    pub fn disease(&self) -> Disease {
        match self {
            Self::Assessed(r) => r.disease,
            Self::Failed(f) => f.disease,
        }
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[must_use]
    pub fn result(&self) -> Option<&RiskResult> {
        match self {
            Self::Assessed(r) => Some(r),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Assessed(_) => None,
            Self::Failed(f) => Some(&f.error),
        }
    }
}

/// Complete assessment for one patient.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentResult {
    /// Unique identifier
    pub id: String,

    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Snapshot of the input, for later reuse by narrative tooling
    pub patient: PatientRecord,

    pub cirrhosis: DiseaseEntry,
    pub hcc: DiseaseEntry,
    pub nafld: DiseaseEntry,

    /// Shared scores, Child-Pugh included
    pub traditional_scores: TraditionalScoreSet,

    pub score_interpretations: BTreeMap<ScoreName, ScoreInterpretation>,

    /// Component breakdown, when all five inputs were usable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_pugh: Option<ChildPugh>,

    pub has_afp: bool,
}

impl AssessmentResult {
    #[must_use]
    pub fn new(
        patient: PatientRecord,
        [cirrhosis, hcc, nafld]: [DiseaseEntry; 3],
        traditional_scores: TraditionalScoreSet,
        score_interpretations: BTreeMap<ScoreName, ScoreInterpretation>,
        child_pugh: Option<ChildPugh>,
    ) -> Self {
        Self {
            id: uuid_v4(),
            created_at: chrono::Utc::now(),
            has_afp: patient.has_afp(),
            patient,
            cirrhosis,
            hcc,
            nafld,
            traditional_scores,
            score_interpretations,
            child_pugh,
        }
    }

    #[must_use]
    pub fn entry(&self, disease: Disease) -> &DiseaseEntry {
        match disease {
            Disease::Cirrhosis => &self.cirrhosis,
            Disease::Hcc => &self.hcc,
            Disease::Nafld => &self.nafld,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &DiseaseEntry> {
        Disease::ALL.into_iter().map(|d| self.entry(d))
    }

    /// Plain JSON (numbers and strings only) for the caller boundary.
    ///
    /// # Errors
    /// Returns an error only if serialization itself fails.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Generate a UUID v4 (random) using CSPRNG.
///
/// Uses ChaCha20Rng seeded from OS entropy.
pub(crate) fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scores::ScoreValue;

    #[test]
    fn test_risk_level_from_probability() {
        assert_eq!(RiskLevel::from_probability(0.1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.3), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.69), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.7), RiskLevel::High);
        assert_eq!(RiskLevel::High.color(), ColorTag::Danger);
    }

    #[test]
    fn test_binary_result_serializes_flat() {
        let mut scores = TraditionalScoreSet::default();
        scores.insert(ScoreName::Meld, ScoreValue::Missing);

        let result = RiskResult::binary(
            Disease::Hcc,
            BinaryRisk::new(0.42, 1).with_afp(true),
            "SVM Trained Model (Standardized)",
            "Moderate risk.".to_string(),
            scores,
        );
        let json = serde_json::to_value(&result).expect("serialize");

        assert_eq!(json["disease"], "HCC (Hepatocellular Carcinoma)");
        assert_eq!(json["risk_level"], "Moderate");
        assert_eq!(json["risk_color"], "warning");
        assert_eq!(json["risk_percentage"], 42.0);
        assert_eq!(json["has_afp"], true);
        assert!(json.get("confidence").is_none());
        assert_eq!(json["traditional_scores"]["MELD"], "Missing Data");
    }

    #[test]
    fn test_classification_result() {
        let result = RiskResult::classification(
            Disease::Nafld,
            Classification {
                classification: FattyLiverClass::Nash,
                classification_description: "Non-Alcoholic Steatohepatitis (Inflammatory)",
                confidence: 80.0,
                prediction_class: 1,
            },
            ColorTag::Danger,
            "Rule-based Classification",
            String::new(),
            TraditionalScoreSet::default(),
        );
        assert_eq!(result.risk_probability(), None);
        assert!(matches!(
            &result.outcome,
            RiskOutcome::Classification(c) if c.classification == FattyLiverClass::Nash
        ));

        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["classification"], "NASH");
        assert_eq!(json["prediction_class"], 1);
    }

    #[test]
    fn test_failed_entry() {
        let entry = DiseaseEntry::Failed(FailedAssessment::new(Disease::Hcc, "model not loaded"));
        assert!(entry.is_failed());
        assert_eq!(entry.disease(), Disease::Hcc);
        assert_eq!(entry.error(), Some("model not loaded"));

        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["risk_level"], "Error");
        assert_eq!(json["risk_color"], "secondary");
    }

    #[test]
    fn test_uuid_generation() {
        let id1 = uuid_v4();
        let id2 = uuid_v4();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
        assert_eq!(id1.as_bytes()[14], b'4');
    }
}
