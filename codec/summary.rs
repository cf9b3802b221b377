use super::curve::SurvivalCurve;
use super::record::PatientRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A reporting time point on the survival curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    pub label: String,
    /// Months since diagnosis, i.e. the index into the curve.
    pub time_index: usize,
}

impl Horizon {
    pub fn new(label: &str, time_index: usize) -> Self {
        Self {
            label: label.to_string(),
            time_index,
        }
    }

    /// 1, 3 and 5 years.
    pub fn standard() -> Vec<Horizon> {
        vec![
            Horizon::new("1-Year", 12),
            Horizon::new("3-Year", 36),
            Horizon::new("5-Year", 60),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonProbability {
    pub label: String,
    pub time_index: usize,
    pub probability: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum SummaryError {
    #[error(
        "The {label} horizon needs time index {time_index}, but the model curve only has {curve_len} time steps."
    )]
    HorizonOutOfRange {
        label: String,
        time_index: usize,
        curve_len: usize,
    },
}

/// Everything reported for one submitted patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// 1-based position of the patient within the session.
    pub sequence_id: usize,
    pub curve: SurvivalCurve,
    pub horizons: Vec<HorizonProbability>,
    pub record: PatientRecord,
}

impl OutcomeSummary {
    pub fn probability_for(&self, label: &str) -> Option<f64> {
        self.horizons
            .iter()
            .find(|horizon| horizon.label == label)
            .map(|horizon| horizon.probability)
    }
}

/// Samples `curve` at every horizon and packages the result with its inputs.
///
/// Fails without producing anything if any horizon lies beyond the curve, so a
/// summary never carries a partial set of horizon probabilities.
pub fn summarize(
    curve: SurvivalCurve,
    horizons: &[Horizon],
    record: PatientRecord,
    sequence_id: usize,
) -> Result<OutcomeSummary, SummaryError> {
    let sampled = horizons
        .iter()
        .map(|horizon| {
            curve
                .probability_at(horizon.time_index)
                .map(|probability| HorizonProbability {
                    label: horizon.label.clone(),
                    time_index: horizon.time_index,
                    probability,
                })
                .ok_or_else(|| SummaryError::HorizonOutOfRange {
                    label: horizon.label.clone(),
                    time_index: horizon.time_index,
                    curve_len: curve.len(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(OutcomeSummary {
        sequence_id,
        curve,
        horizons: sampled,
        record,
    })
}
