//! Rolling per-driver metrics.
//!
//! [`MetricsEstimator`] keeps a bounded [`RollingWindow`] of speed samples per
//! driver and derives heuristic throttle, braking and cornering percentages.
//! [`SpeedComparison`] aligns the speed traces of two drivers for plotting.
//!
//! Both observe [`RaceState`](crate::state::RaceState) snapshots and keep
//! their own private buffers.

mod comparison;
mod rolling;

pub use comparison::{
    clock_label, ComparisonPoint, SpeedComparison, COMPARISON_HORIZON_SECS, COMPARISON_STEP_SECS,
    MAX_COMPARISON_POINTS,
};
pub use rolling::{
    MetricsConfig, MetricsEstimator, MetricsReading, RollingSample, RollingWindow, DEFAULT_WINDOW,
};
