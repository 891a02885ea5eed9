//! Field mapping: patient record to a predictor's ordered feature vector.
//!
//! Each predictor declares a [`FieldSchema`] once, at construction. The schema
//! is the only place where a canonical field is tied to the column name the
//! trained artifact was fitted with.

use serde::Serialize;

use super::patient::{ClinicalField, FieldValue, PatientRecord};

/// Whether a column must be supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Requirement {
    Required,
    /// Absent values are replaced by `default` and never reported as missing.
    Optional { default: f64 },
}

/// One column of a predictor's input.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub field: ClinicalField,
    /// Column name in the trained artifact.
    pub name: &'static str,
    pub requirement: Requirement,
    /// Unit conversion applied after lookup.
    pub scale: f64,
}

impl Column {
    #[must_use]
    pub const fn required(field: ClinicalField, name: &'static str) -> Self {
        Self {
            field,
            name,
            requirement: Requirement::Required,
            scale: 1.0,
        }
    }

    #[must_use]
    pub const fn optional(field: ClinicalField, name: &'static str, default: f64) -> Self {
        Self {
            field,
            name,
            requirement: Requirement::Optional { default },
            scale: 1.0,
        }
    }

    #[must_use]
    pub const fn scaled(mut self, factor: f64) -> Self {
        self.scale = factor;
        self
    }
}

/// Errors produced while building a feature vector.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("Missing required fields for {schema} prediction: {}", fields.join(", "))]
    MissingRequiredFields {
        schema: &'static str,
        fields: Vec<String>,
    },

    #[error("Invalid value for {field} in {schema} prediction: {value:?}")]
    InvalidParameterValue {
        schema: &'static str,
        field: String,
        value: String,
    },
}

/// Ordered column table for one predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    name: &'static str,
    columns: Vec<Column>,
}

impl FieldSchema {
    #[must_use]
    pub fn new(name: &'static str, columns: Vec<Column>) -> Self {
        Self { name, columns }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Index of the column named `name`.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Map `patient` onto this schema.
    ///
    /// All missing required fields are reported together. Defaults are only
    /// applied to columns declared optional.
    ///
    /// # Errors
    /// `MissingRequiredFields` when any required field is absent,
    /// `InvalidParameterValue` when a present field is not numeric.
    pub fn map(&self, patient: &PatientRecord) -> Result<FeatureVector, MappingError> {
        let mut values = Vec::with_capacity(self.columns.len());
        let mut missing = Vec::new();
        let mut invalid = None;

        for column in &self.columns {
            match (patient.get(column.field), column.requirement) {
                (Some(FieldValue::Number(v)), _) => values.push(v * column.scale),
                (Some(FieldValue::Text(raw)), _) => {
                    if invalid.is_none() {
                        invalid = Some((column.field, raw.clone()));
                    }
                }
                (None, Requirement::Optional { default }) => values.push(default * column.scale),
                (None, Requirement::Required) => missing.push(column.field.as_str().to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(MappingError::MissingRequiredFields {
                schema: self.name,
                fields: missing,
            });
        }
        if let Some((field, value)) = invalid {
            return Err(MappingError::InvalidParameterValue {
                schema: self.name,
                field: field.as_str().to_string(),
                value,
            });
        }

        Ok(FeatureVector {
            schema: self.name,
            fields: self.columns.iter().map(|c| c.field).collect(),
            names: self.columns.iter().map(|c| c.name).collect(),
            values,
        })
    }
}

/// Free-function form of [`FieldSchema::map`].
///
/// # Errors
/// See [`FieldSchema::map`].
pub fn map(patient: &PatientRecord, schema: &FieldSchema) -> Result<FeatureVector, MappingError> {
    schema.map(patient)
}

/// Feature values in exactly the order of the schema that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    schema: &'static str,
    #[serde(skip)]
    fields: Vec<ClinicalField>,
    names: Vec<&'static str>,
    values: Vec<f64>,
}

impl FeatureVector {
    #[must_use]
    pub fn schema(&self) -> &'static str {
        self.schema
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the column named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| *n == name)
            .map(|i| self.values[i])
    }

    /// Value of the column backed by `field`, after unit scaling.
    #[must_use]
    pub fn value(&self, field: ClinicalField) -> Option<f64> {
        self.fields
            .iter()
            .position(|f| *f == field)
            .map(|i| self.values[i])
    }
}
