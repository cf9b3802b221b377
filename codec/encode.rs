use super::record::{AttributeValue, PatientRecord};
use super::schema::AttributeSchema;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error(
        "'{label}' is not a permitted value for '{attribute}'. Permitted values: {permitted:?}"
    )]
    UnknownLabel {
        attribute: String,
        label: String,
        permitted: Vec<String>,
    },
    #[error("The patient record has no value for the required attribute '{0}'.")]
    MissingAttribute(String),
    #[error("The model input order names '{0}', which the schema does not define.")]
    UnknownAttribute(String),
    #[error("Attribute '{attribute}' has the non-finite value {value}.")]
    NonFiniteValue { attribute: String, value: f64 },
}

/// Model input in the exact column order the model was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Array1<f64>);

impl FeatureVector {
    #[inline]
    pub fn view(&self) -> ArrayView1<'_, f64> {
        self.0.view()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        Self(Array1::from(values))
    }
}

/// Encodes `record` column by column following `required_order`.
///
/// Numeric values pass through unchanged. Labels are replaced by their
/// zero-based position in the attribute's permitted values; a label that is not
/// permitted is an error and is never mapped to a default code.
pub fn encode<S: AsRef<str>>(
    record: &PatientRecord,
    schema: &AttributeSchema,
    required_order: &[S],
) -> Result<FeatureVector, CodecError> {
    let mut values = Vec::with_capacity(required_order.len());
    for name in required_order {
        let name = name.as_ref();
        let spec = schema
            .get(name)
            .ok_or_else(|| CodecError::UnknownAttribute(name.to_string()))?;
        let value = record
            .get(name)
            .ok_or_else(|| CodecError::MissingAttribute(name.to_string()))?;
        let code = match value {
            AttributeValue::Numeric(number) => {
                if !number.is_finite() {
                    return Err(CodecError::NonFiniteValue {
                        attribute: name.to_string(),
                        value: *number,
                    });
                }
                *number
            }
            AttributeValue::Label(label) => {
                spec.label_index(label)
                    .ok_or_else(|| CodecError::UnknownLabel {
                        attribute: name.to_string(),
                        label: label.clone(),
                        permitted: spec.labels().to_vec(),
                    })? as f64
            }
        };
        values.push(code);
    }
    Ok(FeatureVector(Array1::from(values)))
}
