//! # LiverAid
//!
//! Liver-disease risk assessment from routine clinical laboratory values.
//!
//! This crate provides:
//! - Traditional non-invasive scores (FIB-4, APRI, MELD, Child-Pugh, NFS,
//!   BMI category, AFP risk band) with clinical interpretation
//! - Cirrhosis, HCC and NAFLD predictors backed by trained JSON artifacts,
//!   with rule-based fallbacks where the artifact is absent
//! - A composed assessment that always reports every disease and score
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types and pure calculators (patient, features, scores)
//! - `ports`: Trait definitions for classifiers and predictors
//! - `adapters`: Artifact loading, concrete predictors, log sanitization
//! - `application`: The assessment service
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::AssessmentService;
pub use config::Settings;
pub use domain::{AssessmentResult, PatientRecord, RiskLevel};

/// Result type for LiverAid operations
pub type Result<T> = std::result::Result<T, LiverAidError>;

/// Main error type for LiverAid
#[derive(Debug, thiserror::Error)]
pub enum LiverAidError {
    #[error("Artifact error: {0}")]
    Artifact(#[from] adapters::ArtifactError),

    #[error("Invalid patient input: {0}")]
    Input(#[from] domain::InputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
