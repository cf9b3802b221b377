use crate::codec::{AttributeKind, AttributeSchema};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Control {
    Select {
        options: Vec<String>,
        default_index: usize,
    },
    Slider {
        min: f64,
        max: f64,
        default: f64,
    },
}

/// One input widget on the patient form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    /// Attribute name, used as the record key.
    pub key: String,
    /// Attribute name followed by its display suffix.
    pub label: String,
    pub control: Control,
}

/// Describes the form in schema order, one field per attribute.
pub fn build_form(schema: &AttributeSchema) -> Vec<FormField> {
    schema
        .iter()
        .map(|(name, spec)| {
            let control = match &spec.kind {
                AttributeKind::Selectbox {
                    values,
                    default_index,
                } => Control::Select {
                    options: values.clone(),
                    default_index: *default_index,
                },
                AttributeKind::Slider { min, max, default } => Control::Slider {
                    min: *min,
                    max: *max,
                    default: *default,
                },
            };
            FormField {
                key: name.to_string(),
                label: format!("{name}{}", spec.display_suffix),
                control,
            }
        })
        .collect()
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.control {
            Control::Select {
                options,
                default_index,
            } => {
                writeln!(f, "{}", self.label)?;
                for (idx, option) in options.iter().enumerate() {
                    let marker = if idx == *default_index { "*" } else { " " };
                    writeln!(f, "  {marker} {idx}: {option}")?;
                }
                Ok(())
            }
            Control::Slider { min, max, default } => {
                writeln!(f, "{} [{min} .. {max}], default {default}", self.label)
            }
        }
    }
}
