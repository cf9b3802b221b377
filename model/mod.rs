//! Survival models consumed by the codec.
//!
//! The codec only needs the [`SurvivalModel`] capability. The rest of this
//! module provides a native implementation: a risk function (linear Cox or a
//! DeepSurv-style dense network) applied to a baseline survival curve, stored
//! as a human-readable TOML artifact and loaded once per process.

use ndarray::{Array1, ArrayView1};
use thiserror::Error;

pub mod artifact;
pub mod network;
pub mod store;

pub use artifact::{Activation, DenseLayerSpec, InputScaling, ModelArtifact, ModelError, RiskSpec};
pub use network::LoadedModel;
pub use store::ModelStore;

/// Failures raised while evaluating a model on one feature vector.
#[derive(Debug, Error, PartialEq)]
pub enum ModelInferenceError {
    #[error("The model expects {expected} features, but the feature vector has {found}.")]
    FeatureCount { expected: usize, found: usize },
    #[error("Feature {index} has the non-finite value {value}.")]
    NonFiniteFeature { index: usize, value: f64 },
    #[error("Time index {time_index} is beyond the model horizon of {horizon} time steps.")]
    TimeOutOfRange { time_index: usize, horizon: usize },
    #[error("The model produced a non-finite survival probability at time index {time_index}.")]
    NonFiniteSurvival { time_index: usize },
    #[error("The model returned an invalid survival curve: {0}")]
    InvalidCurve(String),
}

/// A fitted survival estimator.
///
/// Implementations hold no per-call state, so one instance can serve any
/// number of predictions, including from several threads.
pub trait SurvivalModel: Send + Sync {
    fn name(&self) -> &str;

    fn num_features(&self) -> usize;

    /// Number of monthly time steps in the model's native horizon.
    fn num_time_steps(&self) -> usize;

    /// Survival probabilities for one feature vector.
    ///
    /// With `requested_times = None` the full native horizon is returned,
    /// indexed by time step. Otherwise one probability per requested index.
    fn predict_survival(
        &self,
        features: ArrayView1<'_, f64>,
        requested_times: Option<&[usize]>,
    ) -> Result<Array1<f64>, ModelInferenceError>;
}
