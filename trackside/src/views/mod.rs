//! Derived views over [`RaceState`](crate::state::RaceState).
//!
//! Everything here is a pure function of a state snapshot, so views can be
//! rebuilt on every render tick without bookkeeping.

mod color;
mod leaderboard;
mod predictions;
mod progress;

pub use color::{color_for_code, HslColor, DRIVER_LIGHTNESS, DRIVER_SATURATION};
pub use leaderboard::{compare_for_leaderboard, leaderboard, LeaderboardRow};
pub use predictions::{prediction_rows, PredictionRow, DEFAULT_PREDICTION_ROWS};
pub use progress::{
    all_positions, position_scalar, top_n_by_progress, DriverProgress, DEFAULT_TOP_N,
    MAX_POSITION_SCALAR,
};
