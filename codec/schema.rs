use super::record::AttributeValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How an attribute is collected on the form, and therefore how it encodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "widget", rename_all = "snake_case")]
pub enum AttributeKind {
    /// A categorical attribute. The position of a label in `values` is its
    /// numeric code, so this order is part of the model contract.
    Selectbox {
        values: Vec<String>,
        default_index: usize,
    },
    /// A numeric attribute passed to the model unchanged.
    Slider { min: f64, max: f64, default: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub kind: AttributeKind,
    /// Appended to the attribute name when it is shown to the user.
    #[serde(default)]
    pub display_suffix: String,
}

impl AttributeSpec {
    pub fn selectbox(values: &[&str], default_index: usize, display_suffix: &str) -> Self {
        Self {
            kind: AttributeKind::Selectbox {
                values: values.iter().map(|value| value.to_string()).collect(),
                default_index,
            },
            display_suffix: display_suffix.to_string(),
        }
    }

    pub fn slider(min: f64, max: f64, default: f64, display_suffix: &str) -> Self {
        Self {
            kind: AttributeKind::Slider { min, max, default },
            display_suffix: display_suffix.to_string(),
        }
    }

    /// Permitted labels in encoding order. Sliders have none.
    pub fn labels(&self) -> &[String] {
        match &self.kind {
            AttributeKind::Selectbox { values, .. } => values,
            AttributeKind::Slider { .. } => &[],
        }
    }

    #[inline]
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels().iter().position(|candidate| candidate == label)
    }

    /// The value an untouched widget holds. `None` when the default index
    /// points past the labels, which a validated schema never allows.
    pub fn default_value(&self) -> Option<AttributeValue> {
        match &self.kind {
            AttributeKind::Selectbox {
                values,
                default_index,
            } => values.get(*default_index).cloned().map(AttributeValue::Label),
            AttributeKind::Slider { default, .. } => Some(AttributeValue::Numeric(*default)),
        }
    }

    fn validate(&self, name: &str) -> Result<(), SchemaError> {
        match &self.kind {
            AttributeKind::Selectbox {
                values,
                default_index,
            } => {
                if values.is_empty() {
                    return Err(SchemaError::EmptyLabels(name.to_string()));
                }
                if *default_index >= values.len() {
                    return Err(SchemaError::DefaultOutOfRange {
                        attribute: name.to_string(),
                        default_index: *default_index,
                        count: values.len(),
                    });
                }
                for (idx, value) in values.iter().enumerate() {
                    if values[..idx].contains(value) {
                        return Err(SchemaError::DuplicateLabel {
                            attribute: name.to_string(),
                            label: value.clone(),
                        });
                    }
                }
                Ok(())
            }
            AttributeKind::Slider { min, max, default } => {
                if !(min.is_finite() && max.is_finite() && min < max) {
                    return Err(SchemaError::InvalidSliderRange {
                        attribute: name.to_string(),
                        min: *min,
                        max: *max,
                    });
                }
                if !(*min..=*max).contains(default) {
                    return Err(SchemaError::InvalidSliderRange {
                        attribute: name.to_string(),
                        min: *min,
                        max: *max,
                    });
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Attribute '{0}' is declared more than once.")]
    DuplicateAttribute(String),
    #[error("Attribute '{0}' has no permitted labels.")]
    EmptyLabels(String),
    #[error("Attribute '{attribute}' lists the label '{label}' more than once.")]
    DuplicateLabel { attribute: String, label: String },
    #[error(
        "Attribute '{attribute}' has default index {default_index}, but only {count} labels are defined."
    )]
    DefaultOutOfRange {
        attribute: String,
        default_index: usize,
        count: usize,
    },
    #[error("Slider '{attribute}' has an invalid range [{min}, {max}] or a default outside it.")]
    InvalidSliderRange {
        attribute: String,
        min: f64,
        max: f64,
    },
    #[error("The model input order names '{0}', which the schema does not define.")]
    UnknownAttribute(String),
    #[error("The model input order lists '{0}' more than once.")]
    DuplicateInputName(String),
}

/// Ordered attribute configuration. Declaration order is the form order.
/// Only [`AttributeSchema::new`] builds one, so every instance is validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeSchema {
    attributes: Vec<(String, AttributeSpec)>,
}

impl AttributeSchema {
    pub fn new(attributes: Vec<(String, AttributeSpec)>) -> Result<Self, SchemaError> {
        for (idx, (name, spec)) in attributes.iter().enumerate() {
            if attributes[..idx].iter().any(|(seen, _)| seen == name) {
                return Err(SchemaError::DuplicateAttribute(name.clone()));
            }
            spec.validate(name)?;
        }
        Ok(Self { attributes })
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes
            .iter()
            .find(|(candidate, _)| candidate == name)
            .map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeSpec)> {
        self.attributes
            .iter()
            .map(|(name, spec)| (name.as_str(), spec))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// The schema together with the exact column order the model was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureLayout {
    schema: AttributeSchema,
    required_order: Vec<String>,
}

impl FeatureLayout {
    pub fn new(schema: AttributeSchema, required_order: Vec<String>) -> Result<Self, SchemaError> {
        for (idx, name) in required_order.iter().enumerate() {
            if schema.get(name).is_none() {
                return Err(SchemaError::UnknownAttribute(name.clone()));
            }
            if required_order[..idx].contains(name) {
                return Err(SchemaError::DuplicateInputName(name.clone()));
            }
        }
        Ok(Self {
            schema,
            required_order,
        })
    }

    /// Configuration of the ovarian clear cell carcinoma survival model.
    pub fn ovarian_clear_cell() -> Result<Self, SchemaError> {
        let attributes = vec![
            ("Age", AttributeSpec::selectbox(&["<50", "50-60", ">60"], 1, ", year")),
            (
                "Marriage",
                AttributeSpec::selectbox(&["Single", "Married", "Divorced", "Widowed"], 1, ""),
            ),
            (
                "Laterality",
                AttributeSpec::selectbox(&["Unilateral", "Bilateral"], 0, ""),
            ),
            ("Stage", AttributeSpec::selectbox(&["I", "II", "III", "IV"], 1, "")),
            ("CA 125", AttributeSpec::selectbox(&["Normal", "Elevated"], 0, "")),
            (
                "Chemotherapy",
                AttributeSpec::selectbox(&["None/unknown", "Yes"], 0, ""),
            ),
            (
                "Residual tumor",
                AttributeSpec::selectbox(
                    &[
                        "No surgery",
                        "Macroscopic residual tumor or residual tumor greater than 1 cm",
                        "Optimal debulking surgery or no gross residual tumor or residual tumor less than 1 cm",
                    ],
                    1,
                    "",
                ),
            ),
            ("LN examined", AttributeSpec::selectbox(&["No", "1-10", ">10"], 1, "")),
            (
                "LN positive",
                AttributeSpec::selectbox(&["No dissection", "Negative", "Positive"], 1, ""),
            ),
            ("Metastasis", AttributeSpec::selectbox(&["No", "Yes"], 0, "")),
            (
                "Surgery",
                AttributeSpec::selectbox(
                    &[
                        "Oophorectomy",
                        "Oophorectomy + omentectomy",
                        "Debulking surgery",
                        "Pelvic exenteration",
                    ],
                    1,
                    "",
                ),
            ),
        ];
        let required_order = [
            "Age",
            "Marriage",
            "Laterality",
            "Stage",
            "CA 125",
            "Chemotherapy",
            "Metastasis",
            "Residual tumor",
            "Surgery",
            "LN examined",
            "LN positive",
        ];

        let schema = AttributeSchema::new(
            attributes
                .into_iter()
                .map(|(name, spec)| (name.to_string(), spec))
                .collect(),
        )?;
        Self::new(
            schema,
            required_order.iter().map(|name| name.to_string()).collect(),
        )
    }

    #[inline]
    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    #[inline]
    pub fn required_order(&self) -> &[String] {
        &self.required_order
    }

    #[inline]
    pub fn num_features(&self) -> usize {
        self.required_order.len()
    }
}
