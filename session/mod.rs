//! Per-session accumulation of patient outcomes.
//!
//! A [`Session`] is created when a user starts working and dropped when they
//! leave. It owns the ordered list of submitted patients together with the
//! display preferences, and is passed explicitly to every operation that
//! reads or extends it.

use crate::codec::{
    CodecError, FeatureLayout, Horizon, OutcomeSummary, PatientRecord, SummaryError, encode,
    predict, summarize,
};
use crate::model::{ModelInferenceError, SurvivalModel};
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL_NAME: &str = "DeepSurv";

/// Whether the chart shows every accumulated patient or only the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    Single,
    #[default]
    Multiple,
}

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Encoding failed: {0}")]
    Codec(#[from] CodecError),
    #[error("Model inference failed: {0}")]
    Inference(#[from] ModelInferenceError),
    #[error("Summarizing the survival curve failed: {0}")]
    Summary(#[from] SummaryError),
    #[error("Patient {position} of the batch could not be processed. {source}")]
    Batch {
        position: usize,
        source: Box<PipelineError>,
    },
}

/// Runs encode, predict and summarize for one record without touching any
/// session state.
pub fn evaluate(
    record: PatientRecord,
    layout: &FeatureLayout,
    model: &dyn SurvivalModel,
    horizons: &[Horizon],
    sequence_id: usize,
) -> Result<OutcomeSummary, PipelineError> {
    let vector = encode(&record, layout.schema(), layout.required_order())?;
    let curve = predict(&vector, model)?;
    let summary = summarize(curve, horizons, record, sequence_id)?;
    Ok(summary)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    patients: Vec<OutcomeSummary>,
    display: DisplayMode,
    model_name: String,
    horizons: Vec<Horizon>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_NAME)
    }
}

impl Session {
    pub fn new(model_name: &str) -> Self {
        Self {
            patients: Vec::new(),
            display: DisplayMode::default(),
            model_name: model_name.to_string(),
            horizons: Horizon::standard(),
        }
    }

    /// Evaluates one patient and appends the outcome.
    ///
    /// Either the whole pipeline succeeds and exactly one summary is appended
    /// with `sequence_id = len + 1`, or nothing changes.
    pub fn submit(
        &mut self,
        record: PatientRecord,
        layout: &FeatureLayout,
        model: &dyn SurvivalModel,
    ) -> Result<&OutcomeSummary, PipelineError> {
        let sequence_id = self.patients.len() + 1;
        let summary = match evaluate(record, layout, model, &self.horizons, sequence_id) {
            Ok(summary) => summary,
            Err(err) => {
                log::debug!("Submission for patient {sequence_id} failed: {err}");
                return Err(err);
            }
        };
        log::info!(
            "Patient {sequence_id}: {}",
            summary
                .horizons
                .iter()
                .map(|h| format!("{}={:.4}", h.label, h.probability))
                .join(", ")
        );
        self.patients.push(summary);
        Ok(&self.patients[sequence_id - 1])
    }

    /// Evaluates several patients in parallel and appends them in input order.
    ///
    /// All records must succeed; otherwise the error of the first failing
    /// record (1-based `position`) is returned and the session is unchanged.
    /// Returns the number of summaries appended.
    pub fn submit_batch(
        &mut self,
        records: Vec<PatientRecord>,
        layout: &FeatureLayout,
        model: &dyn SurvivalModel,
    ) -> Result<usize, PipelineError> {
        let first_id = self.patients.len() + 1;
        let count = records.len();
        log::info!("Evaluating a batch of {count} patients");

        let horizons = &self.horizons;
        let results: Vec<Result<OutcomeSummary, PipelineError>> = records
            .into_par_iter()
            .enumerate()
            .map(|(offset, record)| evaluate(record, layout, model, horizons, first_id + offset))
            .collect();

        let mut summaries = Vec::with_capacity(count);
        for (offset, result) in results.into_iter().enumerate() {
            match result {
                Ok(summary) => summaries.push(summary),
                Err(err) => {
                    log::debug!("Batch rejected: patient {} failed: {err}", offset + 1);
                    return Err(PipelineError::Batch {
                        position: offset + 1,
                        source: Box::new(err),
                    });
                }
            }
        }
        self.patients.extend(summaries);
        Ok(count)
    }

    #[inline]
    pub fn patients(&self) -> &[OutcomeSummary] {
        &self.patients
    }

    #[inline]
    pub fn latest(&self) -> Option<&OutcomeSummary> {
        self.patients.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patients.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }

    #[inline]
    pub fn display(&self) -> DisplayMode {
        self.display
    }

    pub fn set_display(&mut self, display: DisplayMode) {
        self.display = display;
    }

    #[inline]
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn set_model_name(&mut self, model_name: &str) {
        self.model_name = model_name.to_string();
    }

    #[inline]
    pub fn horizons(&self) -> &[Horizon] {
        &self.horizons
    }
}
