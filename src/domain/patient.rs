//! Patient input types for liver risk assessment.
//!
//! Form fields and JSON bodies name the same clinical attribute in several
//! ways (`trombosit`, `Trombosit`, `platelet`, ...). Everything is resolved to
//! a [`ClinicalField`] once, when the record is built.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical clinical attributes understood by the scoring core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClinicalField {
    /// Age in years
    Age,
    /// Categorical code; the convention differs per predictor (0/1 or 1/2)
    Gender,
    /// Aspartate aminotransferase, IU/L
    Ast,
    /// Alanine aminotransferase, IU/L
    Alt,
    /// Alkaline phosphatase, IU/L
    Alp,
    /// Serum albumin, g/dL
    Albumin,
    /// Total bilirubin, mg/dL
    TotalBilirubin,
    /// Direct bilirubin, mg/dL
    DirectBilirubin,
    /// International normalized ratio
    Inr,
    /// Serum creatinine, mg/dL
    Creatinine,
    /// Platelet count, x10^3/uL
    PlateletCount,
    /// Body mass index, kg/m^2
    Bmi,
    /// 0 = not obese, 1 = obese
    Obesity,
    /// Alpha-fetoprotein, ng/mL
    Afp,
    /// 0 = none, 1 = mild, 2 = moderate/severe
    Ascites,
    /// 0 = none, 1 = grade 1-2, 2 = grade 3-4
    Encephalopathy,
}

impl ClinicalField {
    pub const ALL: [ClinicalField; 16] = [
        Self::Age,
        Self::Gender,
        Self::Ast,
        Self::Alt,
        Self::Alp,
        Self::Albumin,
        Self::TotalBilirubin,
        Self::DirectBilirubin,
        Self::Inr,
        Self::Creatinine,
        Self::PlateletCount,
        Self::Bmi,
        Self::Obesity,
        Self::Afp,
        Self::Ascites,
        Self::Encephalopathy,
    ];

    /// Canonical snake_case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Gender => "gender",
            Self::Ast => "ast",
            Self::Alt => "alt",
            Self::Alp => "alp",
            Self::Albumin => "albumin",
            Self::TotalBilirubin => "total_bilirubin",
            Self::DirectBilirubin => "direct_bilirubin",
            Self::Inr => "inr",
            Self::Creatinine => "creatinine",
            Self::PlateletCount => "platelet_count",
            Self::Bmi => "bmi",
            Self::Obesity => "obesity",
            Self::Afp => "afp",
            Self::Ascites => "ascites",
            Self::Encephalopathy => "encephalopathy",
        }
    }

    /// Additional spellings, already in normalized form (see [`normalize_key`]).
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Gender => &["gender_(female=1,_male=2)", "sex"],
            Self::TotalBilirubin => &["total_bil", "bilirubin"],
            Self::DirectBilirubin => &["dir_bil"],
            Self::Creatinine => &["creatin"],
            Self::PlateletCount => &["trombosit", "platelet", "platelets", "plt"],
            Self::Bmi => &["body_mass_index"],
            _ => &[],
        }
    }

    /// Resolve a raw form/API key to a canonical field.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        let key = normalize_key(key);
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == key || f.aliases().contains(&key.as_str()))
    }
}

impl fmt::Display for ClinicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase, trim, and treat spaces and hyphens as underscores.
fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// A single attribute value as received from the caller.
///
/// Values that fail numeric coercion are kept verbatim so that downstream
/// scoring can report them as invalid instead of losing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Coerce a raw string. Blank input yields `None`.
    #[must_use]
    pub fn coerce(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(Self::Number(v)),
            _ => Some(Self::Text(trimmed.to_string())),
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Errors raised while reading patient input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("Patient input must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Unknown sample patient: {0}")]
    UnknownSample(String),
}

/// One patient's attributes for a single assessment.
///
/// Built once per request and never mutated afterwards. Keys that do not
/// name a clinical attribute are retained in `other` so the snapshot handed
/// back to callers is complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientRecord {
    #[serde(flatten)]
    fields: BTreeMap<ClinicalField, FieldValue>,
    #[serde(flatten)]
    other: BTreeMap<String, FieldValue>,
}

impl PatientRecord {
    /// Build a record from raw string pairs (e.g. an HTML form).
    ///
    /// When two keys alias the same field, the later one wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut record = Self::default();
        for (key, raw) in pairs {
            if let Some(value) = FieldValue::coerce(raw.as_ref()) {
                record.insert(key.as_ref(), value);
            }
        }
        record
    }

    /// Build a record from a JSON object body.
    ///
    /// # Errors
    /// Returns `InputError::NotAnObject` when `value` is not an object.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, InputError> {
        use serde_json::Value;

        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Err(InputError::NotAnObject("null")),
            Value::Bool(_) => return Err(InputError::NotAnObject("boolean")),
            Value::Number(_) => return Err(InputError::NotAnObject("number")),
            Value::String(_) => return Err(InputError::NotAnObject("string")),
            Value::Array(_) => return Err(InputError::NotAnObject("array")),
        };

        let mut record = Self::default();
        for (key, v) in map {
            let value = match v {
                Value::Null => None,
                Value::Number(n) => n.as_f64().map(FieldValue::Number),
                Value::Bool(b) => Some(FieldValue::Number(if *b { 1.0 } else { 0.0 })),
                Value::String(s) => FieldValue::coerce(s),
                other => Some(FieldValue::Text(other.to_string())),
            };
            if let Some(value) = value {
                record.insert(key, value);
            }
        }
        Ok(record)
    }

    fn insert(&mut self, key: &str, value: FieldValue) {
        match ClinicalField::from_key(key) {
            Some(field) => {
                self.fields.insert(field, value);
            }
            None => {
                self.other.insert(key.trim().to_string(), value);
            }
        }
    }

    /// Return a copy with `field` set. Used to build records programmatically.
    #[must_use]
    pub fn with(mut self, field: ClinicalField, value: f64) -> Self {
        self.fields.insert(field, FieldValue::Number(value));
        self
    }

    /// Return a copy with `field` removed.
    #[must_use]
    pub fn without(mut self, field: ClinicalField) -> Self {
        self.fields.remove(&field);
        self
    }

    #[must_use]
    pub fn get(&self, field: ClinicalField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Numeric value of `field`, if present and numeric.
    #[must_use]
    pub fn number(&self, field: ClinicalField) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    #[must_use]
    pub fn contains(&self, field: ClinicalField) -> bool {
        self.fields.contains_key(&field)
    }

    /// Whether a positive AFP value was supplied.
    #[must_use]
    pub fn has_afp(&self) -> bool {
        self.number(ClinicalField::Afp).is_some_and(|v| v > 0.0)
    }

    /// Number of recognized clinical fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Reference patients for demos and smoke tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplePatient {
    Low,
    Moderate,
    High,
}

impl SamplePatient {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low Risk Patient - Healthy Young Adult",
            Self::Moderate => "Moderate Risk Patient - MAFLD with Fibrosis",
            Self::High => "High Risk Patient - Advanced Liver Disease",
        }
    }

    /// Build the sample's patient record.
    #[must_use]
    pub fn record(&self) -> PatientRecord {
        use ClinicalField::*;

        // age, gender, bmi, obesity, ast, alt, alp, platelets, albumin, inr,
        // total bilirubin, direct bilirubin, creatinine, afp
        let values: [f64; 14] = match self {
            Self::Low => [
                28.0, 1.0, 21.5, 0.0, 18.0, 22.0, 65.0, 320.0, 4.7, 0.9, 0.5, 0.12, 0.7, 1.8,
            ],
            Self::Moderate => [
                52.0, 2.0, 29.2, 0.0, 78.0, 92.0, 145.0, 135.0, 3.4, 1.4, 2.1, 0.8, 1.3, 18.5,
            ],
            Self::High => [
                58.0, 2.0, 33.8, 1.0, 210.0, 185.0, 285.0, 72.0, 2.4, 2.8, 6.2, 3.8, 2.1, 280.0,
            ],
        };
        let fields = [
            Age,
            Gender,
            Bmi,
            Obesity,
            Ast,
            Alt,
            Alp,
            PlateletCount,
            Albumin,
            Inr,
            TotalBilirubin,
            DirectBilirubin,
            Creatinine,
            Afp,
        ];

        fields
            .into_iter()
            .zip(values)
            .fold(PatientRecord::default(), |record, (field, value)| {
                record.with(field, value)
            })
    }
}

impl FromStr for SamplePatient {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            other => Err(InputError::UnknownSample(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_resolution_is_case_insensitive() {
        assert_eq!(ClinicalField::from_key("Trombosit"), Some(ClinicalField::PlateletCount));
        assert_eq!(ClinicalField::from_key("platelet"), Some(ClinicalField::PlateletCount));
        assert_eq!(ClinicalField::from_key(" AST "), Some(ClinicalField::Ast));
        assert_eq!(ClinicalField::from_key("Total Bilirubin"), Some(ClinicalField::TotalBilirubin));
        assert_eq!(ClinicalField::from_key("Total_Bil"), Some(ClinicalField::TotalBilirubin));
        assert_eq!(ClinicalField::from_key("Body Mass Index"), Some(ClinicalField::Bmi));
        assert_eq!(
            ClinicalField::from_key("Gender (Female=1, Male=2)"),
            Some(ClinicalField::Gender)
        );
        assert_eq!(ClinicalField::from_key("ggt"), None);
    }

    #[test]
    fn test_form_coercion_keeps_unparseable_text() {
        let record = PatientRecord::from_pairs([
            ("age", "54"),
            ("AST", " 80.5 "),
            ("alt", "abc"),
            ("albumin", "   "),
            ("name", "Jane"),
        ]);

        assert_eq!(record.number(ClinicalField::Age), Some(54.0));
        assert_eq!(record.number(ClinicalField::Ast), Some(80.5));
        assert_eq!(
            record.get(ClinicalField::Alt),
            Some(&FieldValue::Text("abc".to_string()))
        );
        assert_eq!(record.number(ClinicalField::Alt), None);
        assert!(!record.contains(ClinicalField::Albumin));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_nan_text_is_not_a_number() {
        assert_eq!(
            FieldValue::coerce("NaN"),
            Some(FieldValue::Text("NaN".to_string()))
        );
    }

    #[test]
    fn test_from_json() {
        let record = PatientRecord::from_json(&json!({
            "age": 61,
            "trombosit": "120",
            "obesity": true,
            "afp": null,
            "notes": "follow-up"
        }))
        .expect("object input");

        assert_eq!(record.number(ClinicalField::Age), Some(61.0));
        assert_eq!(record.number(ClinicalField::PlateletCount), Some(120.0));
        assert_eq!(record.number(ClinicalField::Obesity), Some(1.0));
        assert!(!record.contains(ClinicalField::Afp));
        assert!(!record.has_afp());

        let snapshot = serde_json::to_value(&record).expect("serialize");
        assert_eq!(snapshot["platelet_count"], json!(120.0));
        assert_eq!(snapshot["notes"], json!("follow-up"));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert_eq!(
            PatientRecord::from_json(&json!([1, 2])),
            Err(InputError::NotAnObject("array"))
        );
    }

    #[test]
    fn test_sample_patients() {
        let high = SamplePatient::High.record();
        assert_eq!(high.number(ClinicalField::PlateletCount), Some(72.0));
        assert!(high.has_afp());
        assert_eq!(high.len(), 14);
        assert_eq!("Moderate".parse::<SamplePatient>(), Ok(SamplePatient::Moderate));
        assert!("extreme".parse::<SamplePatient>().is_err());
    }
}
