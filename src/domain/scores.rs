//! Traditional liver scores: FIB-4, APRI, MELD, Child-Pugh, NFS, BMI category.
//!
//! Every score is computed independently. When inputs are absent or out of
//! domain the score takes a sentinel value instead of a number, so a set is
//! never missing an entry silently.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use super::patient::{ClinicalField, FieldValue, PatientRecord};

/// Sentinel label for absent inputs.
pub const MISSING_DATA: &str = "Missing Data";

/// Sentinel label for present but unusable inputs.
pub const INVALID_DATA: &str = "Invalid Data";

/// ULN used by APRI for AST.
const AST_UPPER_LIMIT: f64 = 40.0;

const MELD_MIN: f64 = 6.0;
const MELD_MAX: f64 = 40.0;

/// Names of the scores this crate knows how to compute and interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScoreName {
    Fib4,
    Apri,
    Meld,
    ChildPughScore,
    ChildPughClass,
    BmiCategory,
    Nfs,
    AfpRisk,
}

impl ScoreName {
    pub const ALL: [ScoreName; 8] = [
        Self::Fib4,
        Self::Apri,
        Self::Meld,
        Self::ChildPughScore,
        Self::ChildPughClass,
        Self::BmiCategory,
        Self::Nfs,
        Self::AfpRisk,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fib4 => "FIB-4",
            Self::Apri => "APRI",
            Self::Meld => "MELD",
            Self::ChildPughScore => "Child-Pugh Score",
            Self::ChildPughClass => "Child-Pugh Class",
            Self::BmiCategory => "BMI Category",
            Self::Nfs => "NFS",
            Self::AfpRisk => "AFP Risk",
        }
    }
}

impl fmt::Display for ScoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown score: {wanted}"))
    }
}

impl Serialize for ScoreName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Value of a single score.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreValue {
    Number(f64),
    Category(String),
    Missing,
    Invalid,
}

impl ScoreValue {
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_category(&self) -> Option<&str> {
        match self {
            Self::Category(c) => Some(c),
            _ => None,
        }
    }

    fn category(label: &str) -> Self {
        Self::Category(label.to_string())
    }

    /// Non-finite results cannot be serialized as plain numbers.
    fn finite(v: f64) -> Self {
        if v.is_finite() {
            Self::Number(v)
        } else {
            Self::Invalid
        }
    }
}

impl fmt::Display for ScoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v:.2}"),
            Self::Category(c) => f.write_str(c),
            Self::Missing => f.write_str(MISSING_DATA),
            Self::Invalid => f.write_str(INVALID_DATA),
        }
    }
}

impl Serialize for ScoreValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(v) => serializer.serialize_f64(*v),
            Self::Category(c) => serializer.serialize_str(c),
            Self::Missing => serializer.serialize_str(MISSING_DATA),
            Self::Invalid => serializer.serialize_str(INVALID_DATA),
        }
    }
}

/// Set of named scores, one value (or sentinel) per name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TraditionalScoreSet {
    scores: BTreeMap<ScoreName, ScoreValue>,
}

impl TraditionalScoreSet {
    /// Compute FIB-4, APRI, MELD, BMI category and NFS for `patient`.
    #[must_use]
    pub fn calculate(patient: &PatientRecord) -> Self {
        use ClinicalField::*;

        let mut set = Self::default();

        set.insert(
            ScoreName::Fib4,
            positive_inputs(patient, [Age, Ast, Alt, PlateletCount])
                .map_or_else(|s| s, |[age, ast, alt, plt]| fib4(age, ast, alt, plt)),
        );
        set.insert(
            ScoreName::Apri,
            positive_inputs(patient, [Ast, PlateletCount])
                .map_or_else(|s| s, |[ast, plt]| apri(ast, plt)),
        );
        set.insert(
            ScoreName::Meld,
            positive_inputs(patient, [TotalBilirubin, Inr, Creatinine])
                .map_or_else(|s| s, |[bil, inr, cr]| meld(bil, inr, cr)),
        );
        set.insert(
            ScoreName::BmiCategory,
            positive_inputs(patient, [Bmi]).map_or_else(|s| s, |[bmi]| bmi_category(bmi)),
        );
        set.insert(
            ScoreName::Nfs,
            positive_inputs(patient, [Age, Bmi, Ast, Alt, PlateletCount, Albumin]).map_or_else(
                |s| s,
                |[age, bmi, ast, alt, plt, alb]| nfs(age, bmi, ast, alt, plt, alb),
            ),
        );

        set
    }

    pub fn insert(&mut self, name: ScoreName, value: ScoreValue) {
        self.scores.insert(name, value);
    }

    #[must_use]
    pub fn get(&self, name: ScoreName) -> Option<&ScoreValue> {
        self.scores.get(&name)
    }

    /// Numeric value of `name`, if it was computed.
    #[must_use]
    pub fn number(&self, name: ScoreName) -> Option<f64> {
        self.get(name).and_then(ScoreValue::as_number)
    }

    /// A copy restricted to `names`, in set order.
    #[must_use]
    pub fn subset(&self, names: &[ScoreName]) -> Self {
        Self {
            scores: self
                .scores
                .iter()
                .filter(|(k, _)| names.contains(k))
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
        }
    }

    /// Record a Child-Pugh outcome: the numeric score and class, or the
    /// same sentinel for both.
    pub fn insert_child_pugh(&mut self, outcome: &Result<ChildPugh, ScoreValue>) {
        match outcome {
            Ok(cp) => {
                self.insert(ScoreName::ChildPughScore, ScoreValue::Number(f64::from(cp.score)));
                self.insert(ScoreName::ChildPughClass, ScoreValue::category(cp.class.as_str()));
            }
            Err(sentinel) => {
                self.insert(ScoreName::ChildPughScore, sentinel.clone());
                self.insert(ScoreName::ChildPughClass, sentinel.clone());
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ScoreName, &ScoreValue)> {
        self.scores.iter().map(|(k, v)| (*k, v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Read `fields` from `patient`, each required to be a finite number > 0.
///
/// Absence of any input yields `Missing`; otherwise any unusable input
/// yields `Invalid`.
fn positive_inputs<const N: usize>(
    patient: &PatientRecord,
    fields: [ClinicalField; N],
) -> Result<[f64; N], ScoreValue> {
    let mut out = [0.0; N];
    let mut missing = false;
    let mut invalid = false;

    for (slot, field) in out.iter_mut().zip(fields) {
        match patient.get(field).map(FieldValue::as_number) {
            None => missing = true,
            Some(Some(v)) if v.is_finite() && v > 0.0 => *slot = v,
            Some(_) => invalid = true,
        }
    }

    if missing {
        Err(ScoreValue::Missing)
    } else if invalid {
        Err(ScoreValue::Invalid)
    } else {
        Ok(out)
    }
}

fn all_positive(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite() && *v > 0.0)
}

/// FIB-4 = (age x AST) / (platelets x sqrt(ALT)).
#[must_use]
pub fn fib4(age: f64, ast: f64, alt: f64, platelets: f64) -> ScoreValue {
    if !all_positive(&[age, ast, alt, platelets]) {
        return ScoreValue::Invalid;
    }
    ScoreValue::finite((age * ast) / (platelets * alt.sqrt()))
}

/// APRI = (AST / 40) / platelets x 100.
#[must_use]
pub fn apri(ast: f64, platelets: f64) -> ScoreValue {
    if !all_positive(&[ast, platelets]) {
        return ScoreValue::Invalid;
    }
    ScoreValue::finite((ast / AST_UPPER_LIMIT) / platelets * 100.0)
}

/// MELD with each input floored at 1.0 before the logarithm, clamped to [6, 40].
#[must_use]
pub fn meld(bilirubin: f64, inr: f64, creatinine: f64) -> ScoreValue {
    if !all_positive(&[bilirubin, inr, creatinine]) {
        return ScoreValue::Invalid;
    }
    let raw = 3.78 * bilirubin.max(1.0).ln()
        + 11.2 * inr.max(1.0).ln()
        + 9.57 * creatinine.max(1.0).ln()
        + 6.43;
    ScoreValue::finite(raw.clamp(MELD_MIN, MELD_MAX))
}

/// BMI category with half-open bands.
#[must_use]
pub fn bmi_category(bmi: f64) -> ScoreValue {
    if !all_positive(&[bmi]) {
        return ScoreValue::Invalid;
    }
    let label = if bmi < 18.5 {
        "Underweight"
    } else if bmi < 25.0 {
        "Normal"
    } else if bmi < 30.0 {
        "Overweight"
    } else {
        "Obese"
    };
    ScoreValue::category(label)
}

/// NAFLD fibrosis score. No diabetes input is modeled, so that term is 0.
#[must_use]
pub fn nfs(age: f64, bmi: f64, ast: f64, alt: f64, platelets: f64, albumin: f64) -> ScoreValue {
    if !all_positive(&[age, bmi, ast, alt, platelets, albumin]) {
        return ScoreValue::Invalid;
    }
    let diabetes = 0.0;
    ScoreValue::finite(
        -1.675 + 0.037 * age + 0.094 * bmi + 1.13 * diabetes + 0.99 * (ast / alt)
            - 0.013 * platelets
            - 0.66 * albumin,
    )
}

/// AFP risk band: <10 Low, <200 Moderate, otherwise High.
#[must_use]
pub fn afp_risk(afp: f64) -> ScoreValue {
    if !afp.is_finite() || afp < 0.0 {
        return ScoreValue::Invalid;
    }
    let label = if afp < 10.0 {
        "Low"
    } else if afp < 200.0 {
        "Moderate"
    } else {
        "High"
    };
    ScoreValue::category(label)
}

/// AFP band for `patient`; an absent AFP counts as 0.
#[must_use]
pub fn afp_risk_for(patient: &PatientRecord) -> ScoreValue {
    match patient.get(ClinicalField::Afp) {
        None => afp_risk(0.0),
        Some(v) => v.as_number().map_or(ScoreValue::Invalid, afp_risk),
    }
}

/// Child-Pugh class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChildPughClass {
    A,
    B,
    C,
}

impl ChildPughClass {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=6 => Self::A,
            7..=9 => Self::B,
            _ => Self::C,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

/// Child-Pugh component points, total and class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChildPugh {
    pub albumin_points: u8,
    pub bilirubin_points: u8,
    pub inr_points: u8,
    pub ascites_points: u8,
    pub encephalopathy_points: u8,
    pub score: u8,
    pub class: ChildPughClass,
}

impl ChildPugh {
    /// Score validated inputs. Ascites and encephalopathy are ordinals 0..=2.
    #[must_use]
    pub fn from_components(
        albumin: f64,
        bilirubin: f64,
        inr: f64,
        ascites: u8,
        encephalopathy: u8,
    ) -> Self {
        let albumin_points = if albumin > 3.5 {
            1
        } else if albumin >= 2.8 {
            2
        } else {
            3
        };
        let bilirubin_points = if bilirubin < 2.0 {
            1
        } else if bilirubin <= 3.0 {
            2
        } else {
            3
        };
        let inr_points = if inr < 1.7 {
            1
        } else if inr <= 2.3 {
            2
        } else {
            3
        };
        let ascites_points = ascites.min(2) + 1;
        let encephalopathy_points = encephalopathy.min(2) + 1;

        let score =
            albumin_points + bilirubin_points + inr_points + ascites_points + encephalopathy_points;

        Self {
            albumin_points,
            bilirubin_points,
            inr_points,
            ascites_points,
            encephalopathy_points,
            score,
            class: ChildPughClass::from_score(score),
        }
    }
}

/// Child-Pugh from raw values, or `Invalid` when any is out of domain.
///
/// # Errors
/// `ScoreValue::Invalid` if albumin, bilirubin or INR is not > 0, or if
/// ascites/encephalopathy is not an integer in 0..=2.
pub fn child_pugh(
    albumin: f64,
    bilirubin: f64,
    inr: f64,
    ascites: f64,
    encephalopathy: f64,
) -> Result<ChildPugh, ScoreValue> {
    if !all_positive(&[albumin, bilirubin, inr]) {
        return Err(ScoreValue::Invalid);
    }
    let ascites = ordinal_grade(ascites).ok_or(ScoreValue::Invalid)?;
    let encephalopathy = ordinal_grade(encephalopathy).ok_or(ScoreValue::Invalid)?;
    Ok(ChildPugh::from_components(
        albumin,
        bilirubin,
        inr,
        ascites,
        encephalopathy,
    ))
}

/// Child-Pugh for `patient`. All five inputs must be present; nothing is
/// defaulted.
///
/// # Errors
/// `ScoreValue::Missing` if any input is absent, `ScoreValue::Invalid` if
/// any is out of domain.
pub fn child_pugh_for(patient: &PatientRecord) -> Result<ChildPugh, ScoreValue> {
    use ClinicalField::*;

    let fields = [Albumin, TotalBilirubin, Inr, Ascites, Encephalopathy];
    if fields.iter().any(|f| !patient.contains(*f)) {
        return Err(ScoreValue::Missing);
    }

    let mut values = [0.0; 5];
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = patient.number(field).ok_or(ScoreValue::Invalid)?;
    }
    let [albumin, bilirubin, inr, ascites, encephalopathy] = values;
    child_pugh(albumin, bilirubin, inr, ascites, encephalopathy)
}

fn ordinal_grade(value: f64) -> Option<u8> {
    if value.is_finite() && value.fract() == 0.0 && (0.0..=2.0).contains(&value) {
        // Exact: value is one of 0.0, 1.0, 2.0.
        Some(value as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ClinicalField::*;

    fn approx(value: &ScoreValue, expected: f64, tol: f64) -> bool {
        value.as_number().is_some_and(|v| (v - expected).abs() < tol)
    }

    #[test]
    fn test_fib4() {
        let v = fib4(50.0, 80.0, 40.0, 150.0);
        assert!(approx(&v, 4.216, 0.001), "got {v:?}");
        assert_eq!(fib4(50.0, 80.0, 0.0, 150.0), ScoreValue::Invalid);
    }

    #[test]
    fn test_apri() {
        let v = apri(80.0, 150.0);
        assert!(approx(&v, 1.333, 0.001), "got {v:?}");
    }

    #[test]
    fn test_meld() {
        // 3.78 ln 2 + 11.2 ln 1.5 + 9.57 ln 1.2 + 6.43
        let v = meld(2.0, 1.5, 1.2);
        assert!(approx(&v, 15.336, 0.001), "got {v:?}");

        // Inputs below 1.0 are floored, leaving only the constant term.
        assert_eq!(meld(0.5, 0.9, 0.8), ScoreValue::Number(6.43));
        assert_eq!(meld(40.0, 9.0, 12.0), ScoreValue::Number(40.0));
    }

    #[test]
    fn test_bmi_bands_are_half_open() {
        assert_eq!(bmi_category(18.4), ScoreValue::category("Underweight"));
        assert_eq!(bmi_category(18.5), ScoreValue::category("Normal"));
        assert_eq!(bmi_category(25.0), ScoreValue::category("Overweight"));
        assert_eq!(bmi_category(30.0), ScoreValue::category("Obese"));
        assert_eq!(bmi_category(0.0), ScoreValue::Invalid);
    }

    #[test]
    fn test_nfs() {
        // -1.675 + 1.85 + 2.82 + 0.99 - 1.95 - 2.64
        let v = nfs(50.0, 30.0, 40.0, 40.0, 150.0, 4.0);
        assert!(approx(&v, -0.605, 1e-9), "got {v:?}");
    }

    #[test]
    fn test_afp_bands() {
        assert_eq!(afp_risk(0.0), ScoreValue::category("Low"));
        assert_eq!(afp_risk(10.0), ScoreValue::category("Moderate"));
        assert_eq!(afp_risk(200.0), ScoreValue::category("High"));
        assert_eq!(afp_risk_for(&PatientRecord::default()), ScoreValue::category("Low"));
    }

    #[test]
    fn test_child_pugh_class_b() {
        let cp = child_pugh(3.0, 2.5, 1.8, 1.0, 0.0).expect("valid inputs");
        assert_eq!(
            [
                cp.albumin_points,
                cp.bilirubin_points,
                cp.inr_points,
                cp.ascites_points,
                cp.encephalopathy_points
            ],
            [2, 2, 2, 2, 1]
        );
        assert_eq!(cp.score, 9);
        assert_eq!(cp.class, ChildPughClass::B);
    }

    #[test]
    fn test_child_pugh_boundaries() {
        let a = child_pugh(3.6, 1.0, 1.0, 0.0, 0.0).expect("valid");
        assert_eq!((a.score, a.class), (5, ChildPughClass::A));

        let c = child_pugh(2.0, 4.0, 2.5, 2.0, 2.0).expect("valid");
        assert_eq!((c.score, c.class), (15, ChildPughClass::C));

        assert_eq!(ChildPughClass::from_score(6), ChildPughClass::A);
        assert_eq!(ChildPughClass::from_score(7), ChildPughClass::B);
        assert_eq!(ChildPughClass::from_score(10), ChildPughClass::C);
    }

    #[test]
    fn test_child_pugh_never_defaults_grades() {
        let base = PatientRecord::default()
            .with(Albumin, 3.0)
            .with(TotalBilirubin, 2.5)
            .with(Inr, 1.8)
            .with(Ascites, 1.0);
        assert_eq!(child_pugh_for(&base), Err(ScoreValue::Missing));

        let full = base.clone().with(Encephalopathy, 0.0);
        assert_eq!(child_pugh_for(&full).map(|cp| cp.score), Ok(9));

        let out_of_range = base.clone().with(Encephalopathy, 3.0);
        assert_eq!(child_pugh_for(&out_of_range), Err(ScoreValue::Invalid));

        let fractional = base.with(Encephalopathy, 0.5);
        assert_eq!(child_pugh_for(&fractional), Err(ScoreValue::Invalid));
    }

    #[test]
    fn test_child_pugh_rejects_non_positive_labs() {
        assert_eq!(child_pugh(0.0, 2.5, 1.8, 1.0, 0.0), Err(ScoreValue::Invalid));
    }

    #[test]
    fn test_score_set_sentinels() {
        let patient = PatientRecord::from_pairs([
            ("age", "50"),
            ("ast", "80"),
            ("alt", "40"),
            ("trombosit", "0"),
            ("bmi", "25"),
        ]);
        let set = TraditionalScoreSet::calculate(&patient);

        assert_eq!(set.get(ScoreName::Fib4), Some(&ScoreValue::Invalid));
        assert_eq!(set.get(ScoreName::Apri), Some(&ScoreValue::Invalid));
        assert_eq!(set.get(ScoreName::Meld), Some(&ScoreValue::Missing));
        assert_eq!(
            set.get(ScoreName::BmiCategory),
            Some(&ScoreValue::category("Overweight"))
        );
        // Albumin is absent, so missing takes precedence over the invalid platelets.
        assert_eq!(set.get(ScoreName::Nfs), Some(&ScoreValue::Missing));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_score_set_serializes_sentinels_as_labels() {
        let mut set = TraditionalScoreSet::default();
        set.insert(ScoreName::Meld, ScoreValue::Missing);
        set.insert(ScoreName::Fib4, ScoreValue::Number(1.5));
        set.insert_child_pugh(&Err(ScoreValue::Invalid));

        let json = serde_json::to_value(&set).expect("serialize");
        assert_eq!(json["MELD"], "Missing Data");
        assert_eq!(json["FIB-4"], 1.5);
        assert_eq!(json["Child-Pugh Score"], "Invalid Data");
        assert_eq!(json["Child-Pugh Class"], "Invalid Data");
    }

    #[test]
    fn test_score_name_parsing() {
        assert_eq!("fib-4".parse::<ScoreName>(), Ok(ScoreName::Fib4));
        assert_eq!("Child-Pugh Class".parse::<ScoreName>(), Ok(ScoreName::ChildPughClass));
        assert!("GGT".parse::<ScoreName>().is_err());
    }
}
