//! Common types and formatting shared across CLI commands.

use std::sync::Arc;

use clap::ValueEnum;
use trackside::geometry::{EquirectangularProjection, MercatorProjection, ProjectionStrategy};

/// Map projection selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
pub enum ProjectionKind {
    /// Web Mercator (matches most online maps)
    #[default]
    Mercator,
    /// Plate carrée, longitude and latitude used as x and y
    Equirectangular,
}

impl ProjectionKind {
    pub fn strategy(self) -> Arc<dyn ProjectionStrategy> {
        match self {
            ProjectionKind::Mercator => Arc::new(MercatorProjection),
            ProjectionKind::Equirectangular => Arc::new(EquirectangularProjection),
        }
    }
}

/// Format seconds as `H:MM:SS.ss`, or `M:SS.ss` under an hour.
pub fn format_race_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "-".to_string();
    }
    // Round once so a carry reaches the minutes and hours.
    let centis = (seconds * 100.0).round() as u64;
    let hours = centis / 360_000;
    let minutes = (centis / 6_000) % 60;
    let secs = (centis / 100) % 60;
    let frac = centis % 100;

    if hours > 0 {
        format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, frac)
    } else {
        format!("{}:{:02}.{:02}", minutes, secs, frac)
    }
}

/// Format an optional value, or `-` when missing.
pub fn or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
