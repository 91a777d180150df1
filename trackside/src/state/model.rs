//! Canonical per-driver state.

/// Reconciled state of one driver.
///
/// Created the first time a message names the driver and kept for the rest
/// of the session. Fields only change through [`super::RaceState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriverState {
    /// Stable driver code (e.g. `VER`).
    pub code: String,
    /// Current lap, if reported.
    pub lap: Option<u32>,
    /// Race position, if reported.
    pub rank: Option<u32>,
    /// Cumulative distance from the start line in kilometers.
    pub km: f64,
    /// Last reported speed in km/h.
    pub speed_kmh: Option<f64>,
}

impl DriverState {
    /// Create a driver with no known telemetry.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            lap: None,
            rank: None,
            km: 0.0,
            speed_kmh: None,
        }
    }

    /// Create a driver first seen on the leaderboard.
    pub fn ranked(code: impl Into<String>, rank: u32) -> Self {
        Self {
            rank: Some(rank),
            ..Self::new(code)
        }
    }
}
