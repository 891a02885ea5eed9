//! Adapters layer: concrete implementations of ports.
//!
//! - `artifact`: JSON model artifacts (classifiers, scalers, imputers) and
//!   the optional SHA-256 manifest
//! - `predictors`: cirrhosis, HCC and NAFLD risk predictors
//! - `sanitize`: patient-data filtering for logs

pub mod artifact;
pub mod predictors;
pub mod sanitize;

pub use artifact::ArtifactError;
