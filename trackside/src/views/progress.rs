//! Lap-progress views.

use std::cmp::Ordering;

use crate::state::{DriverState, RaceState};

use super::color::{color_for_code, HslColor};

/// Number of drivers shown by [`top_n_by_progress`] by default.
pub const DEFAULT_TOP_N: usize = 5;

/// Upper bound of a position scalar, keeping it strictly below 100.
pub const MAX_POSITION_SCALAR: f64 = 99.999;

/// A driver's progress around the current lap.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverProgress {
    /// Driver code.
    pub code: String,
    /// Display color derived from the code.
    pub color: HslColor,
    /// Percent of the current lap completed, in `[0, 100)`.
    pub scalar: f64,
}

/// Convert cumulative distance into percent of the current lap.
///
/// With a positive lap length the fractional lap count is used, so distances
/// beyond several laps wrap. Without one, `km` itself is clamped into range.
pub fn position_scalar(km: f64, lap_length_km: Option<f64>) -> f64 {
    let raw = match lap_length_km {
        Some(lap) if lap > 0.0 => (km / lap).rem_euclid(1.0) * 100.0,
        _ => km,
    };

    if raw.is_nan() {
        return 0.0;
    }
    raw.clamp(0.0, MAX_POSITION_SCALAR)
}

fn by_km_descending(a: &&DriverState, b: &&DriverState) -> Ordering {
    b.km.partial_cmp(&a.km).unwrap_or(Ordering::Equal)
}

fn progress(driver: &DriverState, lap_length_km: Option<f64>) -> DriverProgress {
    DriverProgress {
        code: driver.code.clone(),
        color: color_for_code(&driver.code),
        scalar: position_scalar(driver.km, lap_length_km),
    }
}

/// The `n` drivers furthest along, with their lap scalars.
pub fn top_n_by_progress(
    state: &RaceState,
    lap_length_km: Option<f64>,
    n: usize,
) -> Vec<DriverProgress> {
    let mut drivers: Vec<&DriverState> = state.drivers().iter().collect();
    drivers.sort_by(by_km_descending);
    drivers
        .into_iter()
        .take(n)
        .map(|d| progress(d, lap_length_km))
        .collect()
}

/// Lap scalars for every driver, furthest along first.
pub fn all_positions(state: &RaceState, lap_length_km: Option<f64>) -> Vec<DriverProgress> {
    top_n_by_progress(state, lap_length_km, usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{TelemetryMessage, TelemetryUpdate};

    fn state_with(drivers: &[(&str, f64)]) -> RaceState {
        let mut state = RaceState::new();
        for (code, km) in drivers {
            state.apply(&TelemetryMessage::Telemetry(TelemetryUpdate {
                driver: Some(code.to_string()),
                position_from_start_km: Some(*km),
                ..Default::default()
            }));
        }
        state
    }

    #[test]
    fn test_scalar_wraps_by_lap_length() {
        assert_eq!(position_scalar(12.5, Some(5.0)), 50.0);
        assert_eq!(position_scalar(0.0, Some(5.0)), 0.0);
        assert_eq!(position_scalar(5.0, Some(5.0)), 0.0);
        assert!((position_scalar(4.9, Some(5.0)) - 98.0).abs() < 1e-9);
    }

    #[test]
    fn test_scalar_without_lap_length_is_clamped_km() {
        assert_eq!(position_scalar(42.0, None), 42.0);
        assert_eq!(position_scalar(250.0, None), MAX_POSITION_SCALAR);
        assert_eq!(position_scalar(-3.0, None), 0.0);
        assert_eq!(position_scalar(42.0, Some(0.0)), 42.0);
        assert_eq!(position_scalar(42.0, Some(-1.0)), 42.0);
    }

    #[test]
    fn test_scalar_non_finite_inputs() {
        assert_eq!(position_scalar(f64::NAN, Some(5.0)), 0.0);
        assert_eq!(position_scalar(f64::NAN, None), 0.0);
    }

    #[test]
    fn test_top_n_takes_furthest() {
        let state = state_with(&[
            ("A", 1.0),
            ("B", 6.0),
            ("C", 3.0),
            ("D", 9.0),
            ("E", 2.0),
            ("F", 7.0),
        ]);

        let top = top_n_by_progress(&state, Some(5.0), DEFAULT_TOP_N);
        let codes: Vec<&str> = top.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["D", "F", "B", "C", "E"]);
        assert!((top[0].scalar - 80.0).abs() < 1e-9);
        assert_eq!(top[0].color, color_for_code("D"));
    }

    #[test]
    fn test_top_n_with_fewer_drivers() {
        let state = state_with(&[("A", 1.0), ("B", 2.0)]);
        assert_eq!(top_n_by_progress(&state, None, 5).len(), 2);
    }

    #[test]
    fn test_all_positions_covers_everyone() {
        let state = state_with(&[("A", 1.0), ("B", 6.0), ("C", 6.0)]);
        let all = all_positions(&state, None);
        let codes: Vec<&str> = all.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, vec!["B", "C", "A"]);
        assert_eq!(all[2].scalar, 1.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_scalar_in_range(km in 0.0f64..10_000.0, lap in 0.1f64..20.0) {
                let scalar = position_scalar(km, Some(lap));
                prop_assert!((0.0..100.0).contains(&scalar));
            }

            #[test]
            fn prop_scalar_degraded_in_range(km in -1_000.0f64..1_000.0) {
                let scalar = position_scalar(km, None);
                prop_assert!((0.0..100.0).contains(&scalar));
            }
        }
    }
}
