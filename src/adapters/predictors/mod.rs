//! Disease risk predictors.
//!
//! Each predictor fixes its scoring strategy (trained artifact or rule
//! table) when it is built. Loading never fails outright: a predictor that
//! cannot score anything is represented by [`UnavailablePredictor`].

mod cirrhosis;
mod hcc;
mod nafld;
mod unavailable;

pub use cirrhosis::{CirrhosisEngine, CirrhosisPredictor};
pub use hcc::HccPredictor;
pub use nafld::{NafldEngine, NafldPredictor};
pub use unavailable::UnavailablePredictor;

use crate::domain::{scores, PatientRecord, ScoreName, TraditionalScoreSet};
use crate::ports::{ClassProbabilities, ModelError};

/// Every artifact file name a predictor may load, relative to the model
/// directory.
pub const ARTIFACT_FILES: [&str; 9] = [
    cirrhosis::CURRENT_MODEL,
    cirrhosis::CURRENT_SCALER,
    cirrhosis::CURRENT_IMPUTER,
    cirrhosis::LEGACY_MODEL,
    cirrhosis::LEGACY_SCALER,
    cirrhosis::LEGACY_IMPUTER,
    hcc::MODEL,
    hcc::SCALER,
    nafld::MODEL,
];

/// Probability at class index 1.
fn positive_class(probs: &ClassProbabilities) -> Result<f64, ModelError> {
    probs.at(1).ok_or_else(|| {
        ModelError::InvalidOutput(format!(
            "expected two classes, got {}",
            probs.probabilities().len()
        ))
    })
}

/// The shared scores a predictor reports, computed on the canonical record.
fn embedded_scores(patient: &PatientRecord, names: &[ScoreName]) -> TraditionalScoreSet {
    let mut set = TraditionalScoreSet::calculate(patient);
    if names.contains(&ScoreName::AfpRisk) {
        set.insert(ScoreName::AfpRisk, scores::afp_risk_for(patient));
    }
    set.subset(names)
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

/// Weight of the first threshold `value` exceeds. Bands run most severe first.
fn above(value: f64, bands: &[(f64, f64)]) -> f64 {
    bands
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map_or(0.0, |(_, weight)| *weight)
}

/// Weight of the first threshold `value` falls under.
fn below(value: f64, bands: &[(f64, f64)]) -> f64 {
    bands
        .iter()
        .find(|(threshold, _)| value < *threshold)
        .map_or(0.0, |(_, weight)| *weight)
}
