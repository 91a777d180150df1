//! Finish-time prediction table.

use crate::state::RaceState;

/// Number of prediction rows shown by default.
pub const DEFAULT_PREDICTION_ROWS: usize = 10;

/// One line of the prediction table.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    /// 1-based place in the server's order.
    pub rank: usize,
    /// Driver code.
    pub driver: String,
    /// Predicted finish time in seconds.
    pub predicted_seconds: f64,
}

/// The first `limit` predictions in server order.
pub fn prediction_rows(state: &RaceState, limit: usize) -> Vec<PredictionRow> {
    state
        .predictions()
        .unwrap_or_default()
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, p)| PredictionRow {
            rank: i + 1,
            driver: p.driver.clone(),
            predicted_seconds: p.predicted_seconds,
        })
        .collect()
}
