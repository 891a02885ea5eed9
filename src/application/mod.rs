//! Application layer: use cases and services.
//!
//! Orchestrates the domain calculators and the risk predictors behind the
//! port traits.

mod assessment;

pub use assessment::AssessmentService;
