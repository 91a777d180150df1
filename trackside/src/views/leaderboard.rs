//! Ranked leaderboard view.

use std::cmp::Ordering;

use crate::state::{DriverState, RaceState};

/// One leaderboard line.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    /// Display position: the driver's rank, or its 1-based row index when unranked.
    pub position: u32,
    /// Driver code.
    pub code: String,
    /// Reported rank, if any.
    pub rank: Option<u32>,
    /// Current lap, if reported.
    pub lap: Option<u32>,
    /// Cumulative distance in kilometers.
    pub km: f64,
    /// Last reported speed in km/h.
    pub speed_kmh: Option<f64>,
}

/// Order in which drivers appear on the leaderboard.
///
/// Ranked drivers come first by ascending rank, then unranked drivers by
/// descending distance. Equal keys compare as equal so a stable sort keeps
/// first-seen order.
pub fn compare_for_leaderboard(a: &DriverState, b: &DriverState) -> Ordering {
    match (a.rank, b.rank) {
        (Some(ra), Some(rb)) => ra.cmp(&rb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.km.partial_cmp(&a.km).unwrap_or(Ordering::Equal),
    }
}

/// Build the leaderboard for the current state.
pub fn leaderboard(state: &RaceState) -> Vec<LeaderboardRow> {
    let mut drivers: Vec<&DriverState> = state.drivers().iter().collect();
    drivers.sort_by(|a, b| compare_for_leaderboard(a, b));

    drivers
        .into_iter()
        .enumerate()
        .map(|(idx, driver)| LeaderboardRow {
            position: driver.rank.unwrap_or(idx as u32 + 1),
            code: driver.code.clone(),
            rank: driver.rank,
            lap: driver.lap,
            km: driver.km,
            speed_kmh: driver.speed_kmh,
        })
        .collect()
}
