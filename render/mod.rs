//! Presentation data built from the schema and the session.
//!
//! Nothing here draws; the builders produce plain values that a front end
//! (the CLI, or any widget toolkit) lays out however it likes.

pub mod chart;
pub mod form;
pub mod io;
pub mod table;

pub use chart::{ChartSeries, ChartSpec, chart_series};
pub use form::{Control, FormField, build_form};
pub use io::{TableIoError, read_patients, write_curves_tsv, write_summary_tsv};
pub use table::{Metric, SummaryRow, SummaryTable, format_percent, headline_metrics, summary_table};
