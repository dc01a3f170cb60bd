//! Structural checks applied whenever data crosses a boundary: storage reads,
//! analyzer responses and user-edited markdown.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::{
    AnalysisResult, ChecklistAnalysisResult, ChecklistItem, ChecklistResult, Guideline,
    GuidelineViolation,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("unexpected shape: {0}")]
    Shape(String),

    #[error("{path}: {message}")]
    Constraint { path: String, message: String },
}

impl SchemaError {
    fn constraint(path: impl Into<String>, message: impl Into<String>) -> Self {
        SchemaError::Constraint {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Prefix the failing path with the position of the enclosing record.
    fn at(self, index: usize, field: &str) -> Self {
        match self {
            SchemaError::Constraint { path, message } => SchemaError::Constraint {
                path: format!("{field}[{index}].{path}"),
                message,
            },
            other => other,
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), SchemaError>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), SchemaError> {
        for (i, item) in self.iter().enumerate() {
            item.validate().map_err(|e| e.at(i, ""))?;
        }
        Ok(())
    }
}

/// Deserialize an untrusted value and check its constraints.
pub fn parse_value<T: DeserializeOwned + Validate>(value: Value) -> Result<T, SchemaError> {
    let parsed: T = serde_json::from_value(value).map_err(|e| SchemaError::Shape(e.to_string()))?;
    parsed.validate()?;
    Ok(parsed)
}

/// Parse a JSON array record by record, keeping the valid entries.
/// Returns the kept records and the number dropped.
pub fn parse_records<T: DeserializeOwned + Validate>(value: Value) -> Result<(Vec<T>, usize), SchemaError> {
    let Value::Array(entries) = value else {
        return Err(SchemaError::Shape("expected an array".to_string()));
    };
    let mut kept = Vec::with_capacity(entries.len());
    let mut dropped = 0;
    for (i, entry) in entries.into_iter().enumerate() {
        match parse_value::<T>(entry) {
            Ok(record) => kept.push(record),
            Err(e) => {
                tracing::warn!(index = i, error = %e, "dropping invalid record");
                dropped += 1;
            }
        }
    }
    Ok((kept, dropped))
}

fn positive_id(path: &str, id: u32) -> Result<(), SchemaError> {
    if id == 0 {
        return Err(SchemaError::constraint(path, "must be at least 1"));
    }
    Ok(())
}

fn non_empty(path: &str, s: &str) -> Result<(), SchemaError> {
    if s.is_empty() {
        return Err(SchemaError::constraint(path, "must not be empty"));
    }
    Ok(())
}

fn iso_timestamp(path: &str, s: &str) -> Result<(), SchemaError> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|_| ())
        .map_err(|e| SchemaError::constraint(path, format!("not an ISO timestamp ({e})")))
}

impl Validate for Guideline {
    fn validate(&self) -> Result<(), SchemaError> {
        positive_id("id", self.id)?;
        non_empty("title", &self.title)
    }
}

impl Validate for ChecklistItem {
    fn validate(&self) -> Result<(), SchemaError> {
        positive_id("id", self.id)?;
        non_empty("text", &self.text)
    }
}

impl Validate for GuidelineViolation {
    fn validate(&self) -> Result<(), SchemaError> {
        positive_id("guidelineId", self.guideline_id)?;
        if let Some(spans) = &self.text_verbatim {
            for (i, span) in spans.iter().enumerate() {
                non_empty(&format!("textVerbatim[{i}]"), span)?;
            }
        }
        Ok(())
    }
}

impl Validate for ChecklistResult {
    fn validate(&self) -> Result<(), SchemaError> {
        positive_id("id", self.id)
    }
}

impl Validate for AnalysisResult {
    fn validate(&self) -> Result<(), SchemaError> {
        for (i, v) in self.violations.iter().enumerate() {
            v.validate().map_err(|e| e.at(i, "violations"))?;
        }
        iso_timestamp("analyzedAt", &self.analyzed_at)
    }
}

impl Validate for ChecklistAnalysisResult {
    fn validate(&self) -> Result<(), SchemaError> {
        for (i, r) in self.results.iter().enumerate() {
            r.validate().map_err(|e| e.at(i, "results"))?;
        }
        iso_timestamp("analyzedAt", &self.analyzed_at)
    }
}
