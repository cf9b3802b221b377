use crate::codec::{AttributeValue, FeatureLayout};
use crate::session::Session;
use itertools::Itertools;
use serde::Serialize;

/// Formats a probability as a percentage with two decimals, e.g. `87.50%`.
#[inline]
pub fn format_percent(probability: f64) -> String {
    format!("{:.2}%", probability * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub patient: usize,
    /// One formatted percentage per session horizon.
    pub horizon_cells: Vec<String>,
    /// Selected values in model input order; empty when a value is missing.
    pub attributes: Vec<String>,
}

impl SummaryRow {
    pub fn cells(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(self.patient.to_string())
            .chain(self.horizon_cells.iter().cloned())
            .chain(self.attributes.iter().cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTable {
    pub headers: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

impl SummaryTable {
    /// Renders the table with space-padded columns for terminal output.
    pub fn to_text(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row.cells()) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let pad = |cells: Vec<String>| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(pad(self.headers.clone()));
        for row in &self.rows {
            lines.push(pad(row.cells().collect()));
        }
        lines.join("\n")
    }
}

/// One row per accumulated patient: identifier, horizon percentages and the
/// attribute values that produced them.
pub fn summary_table(session: &Session, layout: &FeatureLayout) -> SummaryTable {
    let headers = std::iter::once("Patients".to_string())
        .chain(session.horizons().iter().map(|h| h.label.clone()))
        .chain(layout.required_order().iter().cloned())
        .collect();

    let rows = session
        .patients()
        .iter()
        .map(|summary| SummaryRow {
            patient: summary.sequence_id,
            horizon_cells: summary
                .horizons
                .iter()
                .map(|h| format_percent(h.probability))
                .collect(),
            attributes: layout
                .required_order()
                .iter()
                .map(|name| {
                    summary
                        .record
                        .get(name)
                        .map(AttributeValue::to_string)
                        .unwrap_or_default()
                })
                .collect(),
        })
        .collect();

    SummaryTable { headers, rows }
}

/// A headline figure for the most recent patient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

/// `"<horizon> survival probability"` for the latest patient, or nothing when
/// no patient has been submitted.
pub fn headline_metrics(session: &Session) -> Vec<Metric> {
    session
        .latest()
        .map(|latest| {
            latest
                .horizons
                .iter()
                .map(|h| Metric {
                    label: format!("{} survival probability", h.label),
                    value: format_percent(h.probability),
                })
                .collect()
        })
        .unwrap_or_default()
}
