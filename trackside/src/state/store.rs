//! Reconciliation of feed messages into [`RaceState`].
//!
//! Merge rules per message type:
//!
//! | type          | effect                                                        |
//! |---------------|---------------------------------------------------------------|
//! | `leaderboard` | `rank` only; unseen drivers created with `km = 0`             |
//! |               | entries without an integral position are skipped              |
//! | `telemetry`   | each present field replaces, absent fields carry over         |
//! | `prediction`  | predictions list replaced wholesale                           |
//! | `info`        | nothing                                                       |
//! | `error`       | error string surfaced, drivers untouched                      |
//!
//! Messages are applied in arrival order. Embedded timestamps are not
//! consulted, so a late message simply overwrites per field.

use std::collections::HashMap;

use crate::feed::{LeaderboardEntry, Prediction, TelemetryMessage, TelemetryUpdate};

use super::model::DriverState;

/// Error text used when the server reports an error without a message.
pub const DEFAULT_SERVER_ERROR: &str = "server error";

/// What a single [`RaceState::apply`] call changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// Driver entries were created or updated (codes in message order).
    Drivers(Vec<String>),
    /// The predictions list was replaced.
    Predictions,
    /// A server error was surfaced.
    Error,
    /// The message had no effect.
    Unchanged,
}

impl StateChange {
    /// Whether anything observable changed.
    pub fn is_changed(&self) -> bool {
        !matches!(self, StateChange::Unchanged)
    }
}

/// Snapshot of everything reconciled from the feed.
///
/// Drivers iterate in first-seen order, which downstream views rely on for
/// stable tie-breaking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceState {
    drivers: Vec<DriverState>,
    index: HashMap<String, usize>,
    predictions: Option<Vec<Prediction>>,
    prediction_mae: Option<f64>,
    error: Option<String>,
}

/// Pure reducer: returns the state that results from applying `message`.
pub fn reduce(state: &RaceState, message: &TelemetryMessage) -> RaceState {
    let mut next = state.clone();
    next.apply(message);
    next
}

impl RaceState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one message in place.
    pub fn apply(&mut self, message: &TelemetryMessage) -> StateChange {
        match message {
            TelemetryMessage::Leaderboard { data: Some(entries) } => {
                self.apply_leaderboard(entries)
            }
            TelemetryMessage::Telemetry(update) => self.apply_telemetry(update),
            TelemetryMessage::Prediction { data: Some(payload) } => match &payload.predictions {
                Some(predictions) => {
                    self.predictions = Some(predictions.clone());
                    self.prediction_mae = payload.mae_seconds;
                    StateChange::Predictions
                }
                None => StateChange::Unchanged,
            },
            TelemetryMessage::Error { message } => {
                self.error = Some(
                    message
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SERVER_ERROR.to_string()),
                );
                StateChange::Error
            }
            TelemetryMessage::Info { .. }
            | TelemetryMessage::Leaderboard { data: None }
            | TelemetryMessage::Prediction { data: None } => StateChange::Unchanged,
        }
    }

    fn apply_leaderboard(&mut self, entries: &[LeaderboardEntry]) -> StateChange {
        let mut touched = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(position) = entry.position else {
                continue;
            };
            match self.index.get(&entry.code) {
                Some(&i) => self.drivers[i].rank = Some(position),
                None => {
                    self.insert(DriverState::ranked(entry.code.clone(), position));
                }
            }
            touched.push(entry.code.clone());
        }

        if touched.is_empty() {
            StateChange::Unchanged
        } else {
            StateChange::Drivers(touched)
        }
    }

    fn apply_telemetry(&mut self, update: &TelemetryUpdate) -> StateChange {
        let code = match update.driver.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => return StateChange::Unchanged,
        };

        let i = match self.index.get(code) {
            Some(&i) => i,
            None => self.insert(DriverState::new(code)),
        };

        let driver = &mut self.drivers[i];
        if let Some(lap) = update.lap_number {
            driver.lap = Some(lap);
        }
        if let Some(rank) = update.position {
            driver.rank = Some(rank);
        }
        if let Some(km) = update.position_from_start_km {
            driver.km = km;
        }
        if let Some(speed) = update.speed_kmh {
            driver.speed_kmh = Some(speed);
        }

        StateChange::Drivers(vec![code.to_string()])
    }

    fn insert(&mut self, driver: DriverState) -> usize {
        let i = self.drivers.len();
        self.index.insert(driver.code.clone(), i);
        self.drivers.push(driver);
        i
    }

    /// Look up a driver by code.
    pub fn driver(&self, code: &str) -> Option<&DriverState> {
        self.index.get(code).map(|&i| &self.drivers[i])
    }

    /// All drivers in first-seen order.
    pub fn drivers(&self) -> &[DriverState] {
        &self.drivers
    }

    /// Number of known drivers.
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether no driver has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Latest predictions, in the order the server sent them.
    pub fn predictions(&self) -> Option<&[Prediction]> {
        self.predictions.as_deref()
    }

    /// Mean absolute error reported with the latest predictions.
    pub fn prediction_mae(&self) -> Option<f64> {
        self.prediction_mae
    }

    /// Last surfaced error (server-reported or transport).
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Surface an error that did not come through a message.
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    /// Clear the surfaced error.
    pub fn clear_error(&mut self) {
        self.error = None;
    }
}
