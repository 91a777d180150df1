//! Map projections and canvas fitting.
//!
//! A [`ProjectionStrategy`] maps geographic positions to unscaled planar
//! coordinates (x east, y south). [`ProjectionStrategy::fit`] then finds the
//! uniform scale and translation that center the whole geometry on a
//! [`Canvas`], the same way d3's `projection.fitSize` does.

use std::f64::consts::PI;

use super::geojson::{NormalizedGeometry, Position};

/// Latitude limit of the Mercator projection, in degrees.
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// Side length of the default virtual canvas.
pub const DEFAULT_CANVAS_SIZE: f64 = 1000.0;

/// A planar point.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Linear interpolation towards `other` at fraction `t`.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// The virtual drawing area a projection is fitted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn square(size: f64) -> Self {
        Self::new(size, size)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::square(DEFAULT_CANVAS_SIZE)
    }
}

/// A projection fitted to a canvas: `raw * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedProjection {
    pub scale: f64,
    pub translate: Point,
}

impl FittedProjection {
    /// The identity transform.
    pub const IDENTITY: FittedProjection = FittedProjection {
        scale: 1.0,
        translate: Point { x: 0.0, y: 0.0 },
    };

    /// Map an unscaled point onto the canvas.
    pub fn apply(&self, raw: Point) -> Point {
        Point::new(
            raw.x * self.scale + self.translate.x,
            raw.y * self.scale + self.translate.y,
        )
    }

    /// Fit a set of unscaled points into `canvas`, preserving aspect ratio and
    /// centering the result.
    pub fn fit_points(points: impl IntoIterator<Item = Point>, canvas: Canvas) -> Self {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }

        if !min.x.is_finite() || !max.x.is_finite() {
            return Self::IDENTITY;
        }

        let dx = max.x - min.x;
        let dy = max.y - min.y;
        let mut scale = (canvas.width / dx).min(canvas.height / dy);
        if !scale.is_finite() || scale <= 0.0 {
            scale = 1.0;
        }

        Self {
            scale,
            translate: Point::new(
                (canvas.width - scale * (max.x + min.x)) / 2.0,
                (canvas.height - scale * (max.y + min.y)) / 2.0,
            ),
        }
    }
}

/// A pluggable geographic projection.
pub trait ProjectionStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Project a position to unscaled planar coordinates, y pointing down.
    fn project_raw(&self, position: Position) -> Point;

    /// Fit this projection so `geometry` fills `canvas`.
    fn fit(&self, geometry: &NormalizedGeometry, canvas: Canvas) -> FittedProjection {
        FittedProjection::fit_points(
            geometry.positions().into_iter().map(|p| self.project_raw(p)),
            canvas,
        )
    }
}

/// Spherical Web Mercator.
#[derive(Debug, Clone, Copy, Default)]
pub struct MercatorProjection;

impl ProjectionStrategy for MercatorProjection {
    fn name(&self) -> &'static str {
        "mercator"
    }

    fn project_raw(&self, position: Position) -> Point {
        let lambda = position.lon.to_radians();
        let phi = position
            .lat
            .clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT)
            .to_radians();
        Point::new(lambda, -(PI / 4.0 + phi / 2.0).tan().ln())
    }
}

/// Plate carrée: longitude and latitude used directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct EquirectangularProjection;

impl ProjectionStrategy for EquirectangularProjection {
    fn name(&self) -> &'static str {
        "equirectangular"
    }

    fn project_raw(&self, position: Position) -> Point {
        Point::new(position.lon.to_radians(), -position.lat.to_radians())
    }
}
