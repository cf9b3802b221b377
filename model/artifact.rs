use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

// --- On-disk model format ---
// A model file is plain TOML so that a fitted model can be inspected and
// reviewed by hand. Scalars and arrays come first, tables last.

/// Nonlinearity applied after a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Selu,
    Tanh,
    Sigmoid,
    Identity,
}

/// One fully connected layer. `weights` has one row per output unit and one
/// column per input unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayerSpec {
    pub activation: Activation,
    pub bias: Vec<f64>,
    pub weights: Vec<Vec<f64>>,
}

/// Maps a feature vector to a log hazard ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family")]
pub enum RiskSpec {
    /// Linear predictor of a Cox proportional hazards fit.
    CoxPH { coefficients: Vec<f64> },
    /// Feed-forward network ending in a single output unit.
    DeepSurv { layers: Vec<DenseLayerSpec> },
}

impl RiskSpec {
    pub fn family(&self) -> &'static str {
        match self {
            RiskSpec::CoxPH { .. } => "CoxPH",
            RiskSpec::DeepSurv { .. } => "DeepSurv",
        }
    }
}

/// Standardization applied to the encoded features before the risk function:
/// `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputScaling {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// The complete, self-contained fitted model as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub num_features: usize,
    /// Column names in the order the model was fitted on. When present, the
    /// loader checks them against the feature layout before any prediction.
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Survival of a patient with zero risk, one entry per month from month 0.
    pub baseline_survival: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_scaling: Option<InputScaling>,
    pub risk: RiskSpec,
}

/// Errors raised while reading, writing or validating a model artifact.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("No model named '{name}' was found at {path}.")]
    ModelNotFound { name: String, path: String },
    #[error("'{0}' is not a valid model name. Names may not contain path separators.")]
    InvalidModelName(String),
    #[error("Invalid baseline survival curve: {0}")]
    InvalidBaseline(String),
    #[error("The model declares {expected} features but has {found} coefficients.")]
    CoefficientCount { expected: usize, found: usize },
    #[error("Layer {layer} is malformed: {reason}")]
    LayerShape { layer: usize, reason: String },
    #[error("Invalid input scaling: {0}")]
    InvalidScaling(String),
    #[error("Model parameter '{0}' is not finite.")]
    NonFiniteParameter(String),
    #[error(
        "The model was fitted on features {expected:?}, but the form supplies {found:?}. Refusing to predict with a reordered feature vector."
    )]
    FeatureOrderMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

impl ModelArtifact {
    /// Saves the model in a human-readable TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// Loads a model from a TOML file. Structural validation happens when the
    /// artifact is turned into a [`super::LoadedModel`].
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path)?;
        let model = toml::from_str(&toml_string)?;
        Ok(model)
    }
}
