//! Car markers on a projected track.

use crate::views::{DriverProgress, HslColor};

use super::projection::Point;
use super::track::TrackGeometry;

/// Draw one driver at a fixed lap position instead of its live one.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub code: String,
    pub scalar: f64,
}

impl Highlight {
    pub fn new(code: impl Into<String>, scalar: f64) -> Self {
        Self {
            code: code.into(),
            scalar,
        }
    }
}

/// A car resolved to a position on the track.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub code: String,
    pub color: HslColor,
    pub point: Point,
    pub highlighted: bool,
}

/// Resolve each car's lap scalar to a point on the primary path.
///
/// Markers are ordered by driver code so their order does not change as the
/// running order does. A highlighted driver is placed at the highlight scalar
/// and drawn white. Returns nothing if the geometry has no primary path.
pub fn place_markers(
    geometry: &TrackGeometry,
    cars: &[DriverProgress],
    highlight: Option<&Highlight>,
) -> Vec<Marker> {
    let mut sorted: Vec<&DriverProgress> = cars.iter().collect();
    sorted.sort_by(|a, b| a.code.cmp(&b.code));

    sorted
        .into_iter()
        .filter_map(|car| {
            let highlighted = highlight.is_some_and(|h| h.code == car.code);
            let scalar = match highlight {
                Some(h) if highlighted => h.scalar,
                _ => car.scalar,
            };
            let point = geometry.point_at_scalar(scalar)?;
            Some(Marker {
                code: car.code.clone(),
                color: if highlighted {
                    HslColor::WHITE
                } else {
                    car.color
                },
                point,
                highlighted,
            })
        })
        .collect()
}
