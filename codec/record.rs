use super::schema::{AttributeKind, AttributeSchema, AttributeSpec};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single form selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Numeric(f64),
    Label(String),
}

impl AttributeValue {
    /// Interprets raw text the way the attribute's widget would have produced it.
    /// Slider input that parses as a number becomes numeric; everything else is
    /// kept as a label and checked later during encoding.
    pub fn parse_for(spec: &AttributeSpec, raw: &str) -> Self {
        let trimmed = raw.trim();
        match spec.kind {
            AttributeKind::Slider { .. } => match trimmed.parse::<f64>() {
                Ok(value) => AttributeValue::Numeric(value),
                Err(_) => AttributeValue::Label(trimmed.to_string()),
            },
            AttributeKind::Selectbox { .. } => AttributeValue::Label(trimmed.to_string()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Numeric(value) => write!(f, "{value}"),
            AttributeValue::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RecordParseError {
    #[error("Expected an assignment of the form NAME=VALUE, got '{0}'.")]
    MalformedAssignment(String),
    #[error("'{0}' is not an attribute of this model.")]
    UnknownAttribute(String),
}

/// The attribute values submitted for one patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    values: AHashMap<String, AttributeValue>,
}

impl PatientRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// The record an untouched form holds: every attribute at its default.
    pub fn defaults(schema: &AttributeSchema) -> Self {
        let values = schema
            .iter()
            .filter_map(|(name, spec)| {
                spec.default_value()
                    .map(|value| (name.to_string(), value))
            })
            .collect();
        Self { values }
    }

    /// Stores `value` under `name`, returning the previous selection if any.
    pub fn set(&mut self, name: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        self.values.insert(name.into(), value)
    }

    pub fn with(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_label(self, name: impl Into<String>, label: &str) -> Self {
        self.with(name, AttributeValue::Label(label.to_string()))
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sets an attribute from raw text, e.g. a TSV cell.
    pub fn set_raw(
        &mut self,
        schema: &AttributeSchema,
        name: &str,
        raw: &str,
    ) -> Result<(), RecordParseError> {
        let spec = schema
            .get(name)
            .ok_or_else(|| RecordParseError::UnknownAttribute(name.to_string()))?;
        self.set(name, AttributeValue::parse_for(spec, raw));
        Ok(())
    }

    /// Applies a `NAME=VALUE` assignment. The name is everything before the
    /// first `=`, so labels such as `>60` survive intact.
    pub fn apply_assignment(
        &mut self,
        schema: &AttributeSchema,
        assignment: &str,
    ) -> Result<(), RecordParseError> {
        let (name, raw) = assignment
            .split_once('=')
            .ok_or_else(|| RecordParseError::MalformedAssignment(assignment.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(RecordParseError::MalformedAssignment(assignment.to_string()));
        }
        self.set_raw(schema, name, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::schema::FeatureLayout;

    #[test]
    fn defaults_cover_every_attribute() {
        let layout = FeatureLayout::ovarian_clear_cell().expect("builtin layout");
        let record = PatientRecord::defaults(layout.schema());
        assert_eq!(record.len(), layout.schema().len());
        assert_eq!(
            record.get("Marriage"),
            Some(&AttributeValue::Label("Married".to_string()))
        );
        assert_eq!(
            record.get("Surgery"),
            Some(&AttributeValue::Label("Oophorectomy + omentectomy".to_string()))
        );
    }

    #[test]
    fn assignment_overrides_default() {
        let layout = FeatureLayout::ovarian_clear_cell().expect("builtin layout");
        let mut record = PatientRecord::defaults(layout.schema());
        record
            .apply_assignment(layout.schema(), "Age=>60")
            .expect("valid assignment");
        record
            .apply_assignment(layout.schema(), "CA 125 = Elevated")
            .expect("valid assignment");
        assert_eq!(record.get("Age"), Some(&AttributeValue::Label(">60".to_string())));
        assert_eq!(
            record.get("CA 125"),
            Some(&AttributeValue::Label("Elevated".to_string()))
        );
    }

    #[test]
    fn assignment_errors_are_reported() {
        let layout = FeatureLayout::ovarian_clear_cell().expect("builtin layout");
        let mut record = PatientRecord::new();
        assert_eq!(
            record.apply_assignment(layout.schema(), "Stage"),
            Err(RecordParseError::MalformedAssignment("Stage".to_string()))
        );
        assert_eq!(
            record.apply_assignment(layout.schema(), "Grade=3"),
            Err(RecordParseError::UnknownAttribute("Grade".to_string()))
        );
        assert!(record.is_empty());
    }

    #[test]
    fn slider_text_parses_as_number() {
        let spec = AttributeSpec::slider(18.0, 90.0, 55.0, ", year");
        assert_eq!(AttributeValue::parse_for(&spec, " 47 "), AttributeValue::Numeric(47.0));
        assert_eq!(
            AttributeValue::parse_for(&spec, "old"),
            AttributeValue::Label("old".to_string())
        );
        let select = AttributeSpec::selectbox(&["1-10", ">10"], 0, "");
        assert_eq!(
            AttributeValue::parse_for(&select, "1-10"),
            AttributeValue::Label("1-10".to_string())
        );
    }

    #[test]
    fn values_round_trip_through_json() {
        let record = PatientRecord::new()
            .with_label("Stage", "III")
            .with("Tumor size", AttributeValue::Numeric(4.5));
        let json = serde_json::to_string(&record).expect("serialize");
        let back: PatientRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, record);
    }
}
