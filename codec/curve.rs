use super::encode::FeatureVector;
use crate::model::{ModelInferenceError, SurvivalModel};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Slack allowed between consecutive survival probabilities before a curve
/// counts as increasing. Accepted rises are flattened before storage.
const MONOTONE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurvivalPoint {
    pub time_index: usize,
    pub probability: f64,
}

/// Survival probability per elapsed month, starting at month 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalCurve {
    probabilities: Array1<f64>,
}

impl SurvivalCurve {
    /// Wraps raw model output, checking that it is a proper survival function:
    /// non-empty, finite, within [0, 1] and non-increasing. The stored curve is
    /// the running minimum of the input, so it never increases.
    pub fn from_probabilities(
        mut probabilities: Array1<f64>,
    ) -> Result<Self, ModelInferenceError> {
        if probabilities.is_empty() {
            return Err(ModelInferenceError::InvalidCurve(
                "the model returned no time steps".to_string(),
            ));
        }
        for (time_index, &probability) in probabilities.iter().enumerate() {
            if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
                return Err(ModelInferenceError::InvalidCurve(format!(
                    "probability {probability} at time index {time_index} is outside [0, 1]"
                )));
            }
        }
        for (time_index, pair) in probabilities.windows(2).into_iter().enumerate() {
            if pair[1] > pair[0] + MONOTONE_TOLERANCE {
                return Err(ModelInferenceError::InvalidCurve(format!(
                    "survival increases from {} to {} at time index {}",
                    pair[0],
                    pair[1],
                    time_index + 1
                )));
            }
        }

        let mut floor = f64::INFINITY;
        for probability in probabilities.iter_mut() {
            floor = floor.min(*probability);
            *probability = floor;
        }
        Ok(Self { probabilities })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    #[inline]
    pub fn probability_at(&self, time_index: usize) -> Option<f64> {
        self.probabilities.get(time_index).copied()
    }

    #[inline]
    pub fn probabilities(&self) -> ArrayView1<'_, f64> {
        self.probabilities.view()
    }

    pub fn points(&self) -> impl Iterator<Item = SurvivalPoint> + '_ {
        self.probabilities
            .iter()
            .enumerate()
            .map(|(time_index, &probability)| SurvivalPoint {
                time_index,
                probability,
            })
    }
}

/// Runs the model over its full native time horizon.
pub fn predict(
    vector: &FeatureVector,
    model: &dyn SurvivalModel,
) -> Result<SurvivalCurve, ModelInferenceError> {
    let probabilities = model.predict_survival(vector.view(), None)?;
    log::debug!(
        "Model '{}' returned {} time steps",
        model.name(),
        probabilities.len()
    );
    SurvivalCurve::from_probabilities(probabilities)
}
