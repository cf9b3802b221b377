//! Feature/outcome codec.
//!
//! Turns a clinician's categorical selections into the fixed-order numeric
//! vector a survival model was fitted on, runs the model, and reduces the
//! returned curve to the headline horizon probabilities.

pub mod curve;
pub mod encode;
pub mod record;
pub mod schema;
pub mod summary;

pub use curve::{SurvivalCurve, SurvivalPoint, predict};
pub use encode::{CodecError, FeatureVector, encode};
pub use record::{AttributeValue, PatientRecord, RecordParseError};
pub use schema::{AttributeKind, AttributeSchema, AttributeSpec, FeatureLayout, SchemaError};
pub use summary::{Horizon, HorizonProbability, OutcomeSummary, SummaryError, summarize};
