//! Domain layer: patient input, scores and risk results.
//!
//! Pure types and functions with no I/O. Everything the predictors and the
//! composer exchange is defined here.

pub mod features;
pub mod interpretation;
mod patient;
mod risk;
pub mod scores;

pub use features::{Column, FeatureVector, FieldSchema, MappingError, Requirement};
pub use interpretation::{interpret, interpret_all, ColorTag, ScoreInterpretation};
pub use patient::{ClinicalField, FieldValue, InputError, PatientRecord, SamplePatient};
pub use risk::{
    AssessmentResult, BinaryRisk, Classification, Disease, DiseaseEntry, FailedAssessment,
    FattyLiverClass, RiskLevel, RiskOutcome, RiskResult,
};
pub use scores::{ChildPugh, ChildPughClass, ScoreName, ScoreValue, TraditionalScoreSet};
