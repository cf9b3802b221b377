use crate::codec::SurvivalPoint;
use crate::session::{DisplayMode, Session};
use serde::Serialize;

/// Fixed chart labelling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: &'static str,
    pub x_label: &'static str,
    pub y_label: &'static str,
    pub y_range: (f64, f64),
}

impl ChartSpec {
    pub const SURVIVAL: ChartSpec = ChartSpec {
        title: "Estimated Survival Probability",
        x_label: "Time, month",
        y_label: "Survival probability",
        y_range: (0.0, 1.0),
    };
}

/// One line on the survival chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub patient: usize,
    pub points: Vec<SurvivalPoint>,
}

/// Lines to draw for the session's display mode: every patient in
/// `Multiple` mode, only the latest in `Single` mode.
pub fn chart_series(session: &Session) -> Vec<ChartSeries> {
    let shown = match session.display() {
        DisplayMode::Multiple => session.patients(),
        DisplayMode::Single => {
            let len = session.len();
            &session.patients()[len.saturating_sub(1)..]
        }
    };
    shown
        .iter()
        .map(|summary| ChartSeries {
            patient: summary.sequence_id,
            points: summary.curve.points().collect(),
        })
        .collect()
}
