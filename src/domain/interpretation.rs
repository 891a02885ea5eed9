//! Score interpretation: severity level, color tag and explanation per score.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::scores::{ScoreName, ScoreValue, TraditionalScoreSet};

/// Qualitative color used by result views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    Success,
    Warning,
    Danger,
    Info,
    Secondary,
}

impl ColorTag {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
            Self::Info => "info",
            Self::Secondary => "secondary",
        }
    }
}

/// Interpretation of one score value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreInterpretation {
    pub color: ColorTag,
    pub level: &'static str,
    pub interpretation: &'static str,
}

const fn entry(
    color: ColorTag,
    level: &'static str,
    interpretation: &'static str,
) -> ScoreInterpretation {
    ScoreInterpretation {
        color,
        level,
        interpretation,
    }
}

const MISSING: ScoreInterpretation = entry(
    ColorTag::Secondary,
    "Missing",
    "Required parameters not provided",
);
const INVALID: ScoreInterpretation = entry(
    ColorTag::Secondary,
    "Invalid",
    "Invalid parameter values",
);
const UNABLE: ScoreInterpretation = entry(
    ColorTag::Secondary,
    "Unknown",
    "Unable to calculate",
);
const WRONG_KIND: ScoreInterpretation = entry(
    ColorTag::Secondary,
    "Invalid",
    "Unable to calculate",
);
const NO_TABLE: ScoreInterpretation = entry(
    ColorTag::Secondary,
    "Unknown",
    "No interpretation available",
);

const CHILD_PUGH_A: ScoreInterpretation = entry(
    ColorTag::Success,
    "Class A",
    "Well-compensated liver disease",
);
const CHILD_PUGH_B: ScoreInterpretation = entry(
    ColorTag::Warning,
    "Class B",
    "Significant functional compromise",
);
const CHILD_PUGH_C: ScoreInterpretation = entry(
    ColorTag::Danger,
    "Class C",
    "Decompensated liver disease",
);

/// Interpret `value` as the score called `score_name`.
///
/// Never fails: sentinels, mismatched value kinds and unknown names all map
/// to a neutral `secondary` result.
#[must_use]
pub fn interpret(score_name: &str, value: &ScoreValue) -> ScoreInterpretation {
    match value {
        ScoreValue::Missing => return MISSING,
        ScoreValue::Invalid => return INVALID,
        ScoreValue::Category(c) if c.trim().is_empty() => return UNABLE,
        _ => {}
    }

    match score_name.parse::<ScoreName>() {
        Ok(name) => interpret_score(name, value),
        Err(_) => NO_TABLE,
    }
}

/// Interpret a known score.
#[must_use]
pub fn interpret_score(name: ScoreName, value: &ScoreValue) -> ScoreInterpretation {
    match (name, value) {
        (_, ScoreValue::Missing) => MISSING,
        (_, ScoreValue::Invalid) => INVALID,

        (ScoreName::Fib4, ScoreValue::Number(v)) => fib4_band(*v),
        (ScoreName::Apri, ScoreValue::Number(v)) => apri_band(*v),
        (ScoreName::Meld, ScoreValue::Number(v)) => meld_band(*v),
        (ScoreName::ChildPughScore, ScoreValue::Number(v)) => child_pugh_band(*v),
        (ScoreName::Nfs, ScoreValue::Number(v)) => nfs_band(*v),
        (
            ScoreName::Fib4
            | ScoreName::Apri
            | ScoreName::Meld
            | ScoreName::ChildPughScore
            | ScoreName::Nfs,
            ScoreValue::Category(_),
        ) => WRONG_KIND,

        (ScoreName::ChildPughClass, v) => match v.as_category() {
            Some("A") => CHILD_PUGH_A,
            Some("B") => CHILD_PUGH_B,
            Some("C") => CHILD_PUGH_C,
            _ => UNABLE,
        },
        (ScoreName::BmiCategory, v) => match v.as_category() {
            Some("Underweight") => entry(ColorTag::Info, "Underweight", "Below normal weight"),
            Some("Normal") => entry(ColorTag::Success, "Normal", "Healthy weight"),
            Some("Overweight") => entry(ColorTag::Warning, "Overweight", "Above normal weight"),
            Some("Obese") => entry(ColorTag::Danger, "Obese", "Significantly above normal weight"),
            _ => entry(
                ColorTag::Secondary,
                "Unknown",
                "Unable to determine BMI category",
            ),
        },
        (ScoreName::AfpRisk, v) => match v.as_category() {
            Some("Low") => entry(ColorTag::Success, "Low", "AFP within expected range"),
            Some("Moderate") => entry(
                ColorTag::Warning,
                "Moderate",
                "Mildly elevated AFP, monitoring advised",
            ),
            Some("High") => entry(ColorTag::Danger, "High", "Markedly elevated AFP"),
            _ => UNABLE,
        },
    }
}

fn fib4_band(v: f64) -> ScoreInterpretation {
    if v < 1.30 {
        entry(
            ColorTag::Success,
            "Low",
            "Low probability of advanced fibrosis",
        )
    } else if v <= 2.67 {
        entry(
            ColorTag::Warning,
            "Intermediate",
            "Intermediate probability - further evaluation needed",
        )
    } else {
        entry(
            ColorTag::Danger,
            "High",
            "High probability of advanced fibrosis",
        )
    }
}

fn apri_band(v: f64) -> ScoreInterpretation {
    if v < 0.5 {
        entry(
            ColorTag::Success,
            "Low",
            "Low probability of significant fibrosis",
        )
    } else if v <= 1.5 {
        entry(
            ColorTag::Warning,
            "Intermediate",
            "Intermediate probability - further evaluation needed",
        )
    } else {
        entry(
            ColorTag::Danger,
            "High",
            "High probability of significant fibrosis",
        )
    }
}

fn meld_band(v: f64) -> ScoreInterpretation {
    if v < 10.0 {
        entry(ColorTag::Success, "Low", "Low mortality risk")
    } else if v <= 15.0 {
        entry(ColorTag::Warning, "Moderate", "Moderate mortality risk")
    } else if v <= 20.0 {
        entry(ColorTag::Warning, "High", "High mortality risk")
    } else {
        entry(ColorTag::Danger, "Very High", "Very high mortality risk")
    }
}

fn child_pugh_band(v: f64) -> ScoreInterpretation {
    if v <= 6.0 {
        CHILD_PUGH_A
    } else if v <= 9.0 {
        CHILD_PUGH_B
    } else if v <= 15.0 {
        CHILD_PUGH_C
    } else {
        entry(ColorTag::Danger, "Severe", "Critical liver function")
    }
}

fn nfs_band(v: f64) -> ScoreInterpretation {
    if v < -1.455 {
        entry(
            ColorTag::Success,
            "Low",
            "Advanced fibrosis can be excluded with high confidence",
        )
    } else if v <= 0.676 {
        entry(
            ColorTag::Warning,
            "Intermediate",
            "Indeterminate - further evaluation may be needed",
        )
    } else {
        entry(
            ColorTag::Danger,
            "High",
            "High probability of advanced fibrosis",
        )
    }
}

/// Interpret every score in `scores`.
#[must_use]
pub fn interpret_all(scores: &TraditionalScoreSet) -> BTreeMap<ScoreName, ScoreInterpretation> {
    scores
        .iter()
        .map(|(name, value)| (name, interpret_score(name, value)))
        .collect()
}
