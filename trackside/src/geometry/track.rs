//! Building a [`TrackGeometry`] from normalized GeoJSON.

use std::fmt;

use tracing::debug;

use super::error::GeometryError;
use super::geojson::{Geometry, NormalizedGeometry, Position};
use super::path::{PathDescriptor, SubPath};
use super::projection::{Canvas, FittedProjection, Point, ProjectionStrategy};

/// Padding added around the projected bounds, in canvas units.
pub const DEFAULT_PADDING: f64 = 20.0;

/// Axis-aligned bounds in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Smallest bounds containing all `points`, or `None` if there are none.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        points.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Bounds {
                    min_x: p.x,
                    min_y: p.y,
                    max_x: p.x,
                    max_y: p.y,
                },
                Some(b) => Bounds {
                    min_x: b.min_x.min(p.x),
                    min_y: b.min_y.min(p.y),
                    max_x: b.max_x.max(p.x),
                    max_y: b.max_y.max(p.y),
                },
            })
        })
    }

    pub fn padded(&self, padding: f64) -> Self {
        Bounds {
            min_x: self.min_x - padding,
            min_y: self.min_y - padding,
            max_x: self.max_x + padding,
            max_y: self.max_y + padding,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// SVG view box covering these bounds, at least one unit in each direction.
    pub fn view_box(&self) -> ViewBox {
        ViewBox {
            x: self.min_x,
            y: self.min_y,
            width: self.width().max(1.0),
            height: self.height().max(1.0),
        }
    }
}

/// An SVG `viewBox`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl fmt::Display for ViewBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}

/// Options for [`build_geometry`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildOptions {
    pub canvas: Canvas,
    pub padding: f64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            canvas: Canvas::default(),
            padding: DEFAULT_PADDING,
        }
    }
}

/// A projected track outline ready for drawing and marker placement.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackGeometry {
    /// Track identifier this geometry was loaded for.
    pub track: String,
    /// One path per line or polygon part. A single-vertex part stays as a
    /// zero-length path so indices line up with the source parts.
    pub paths: Vec<PathDescriptor>,
    /// Padded bounds of every projected coordinate.
    pub bounds: Bounds,
    /// Arc length of the primary path.
    pub total_path_length: f64,
}

impl TrackGeometry {
    /// Index of the path markers are placed on: the first one with a segment.
    pub fn primary_index(&self) -> Option<usize> {
        self.paths.iter().position(PathDescriptor::is_drawable)
    }

    /// The path markers are placed on.
    pub fn primary(&self) -> Option<&PathDescriptor> {
        self.paths.get(self.primary_index()?)
    }

    pub fn view_box(&self) -> ViewBox {
        self.bounds.view_box()
    }

    /// Map a lap percentage onto the primary path.
    ///
    /// `scalar` is clamped to `[0, 100]`; 0 is the start of the path and 100
    /// its end.
    pub fn point_at_scalar(&self, scalar: f64) -> Option<Point> {
        let clamped = if scalar.is_nan() {
            0.0
        } else {
            scalar.clamp(0.0, 100.0)
        };
        let t = clamped / 100.0 * self.total_path_length;
        self.primary()?.point_at_length(t)
    }
}

/// Project `geometry` and build its drawable paths.
///
/// Lines and polygons give one path each; multi-geometries give one path per
/// part; points are skipped; collections are expanded one level. Parts with
/// no vertices are dropped. Fails with [`GeometryError::NoDrawablePath`]
/// unless at least one path has a segment.
pub fn build_geometry(
    track: &str,
    geometry: &NormalizedGeometry,
    projection: &dyn ProjectionStrategy,
    options: &BuildOptions,
) -> Result<TrackGeometry, GeometryError> {
    let fitted = projection.fit(geometry, options.canvas);
    let project = |p: &Position| fitted.apply(projection.project_raw(*p));

    let mut paths = Vec::new();
    for g in &geometry.geometries {
        match g {
            Geometry::GeometryCollection { geometries } => {
                for member in geometries {
                    push_paths(member, &project, &mut paths);
                }
            }
            other => push_paths(other, &project, &mut paths),
        }
    }
    paths.retain(|path| path.start().is_some());

    let Some(primary) = paths.iter().find(|path| path.is_drawable()) else {
        return Err(GeometryError::NoDrawablePath);
    };
    let total_path_length = primary.length();

    let bounds = Bounds::from_points(geometry.positions().iter().map(&project))
        .ok_or(GeometryError::NoDrawablePath)?
        .padded(options.padding);

    debug!(
        track = %track,
        projection = projection.name(),
        paths = paths.len(),
        length = total_path_length,
        "Built track geometry"
    );

    Ok(TrackGeometry {
        track: track.to_string(),
        paths,
        bounds,
        total_path_length,
    })
}

fn push_paths(
    geometry: &Geometry,
    project: &impl Fn(&Position) -> Point,
    out: &mut Vec<PathDescriptor>,
) {
    let line = |coords: &[Position]| SubPath::open(coords.iter().map(project).collect());
    let polygon = |rings: &[Vec<Position>]| {
        PathDescriptor::new(
            rings
                .iter()
                .map(|ring| SubPath::ring(ring.iter().map(project).collect()))
                .collect(),
        )
    };

    match geometry {
        Geometry::LineString { coordinates } => {
            out.push(PathDescriptor::new(vec![line(coordinates)]))
        }
        Geometry::MultiLineString { coordinates } => out.extend(
            coordinates
                .iter()
                .map(|part| PathDescriptor::new(vec![line(part)])),
        ),
        Geometry::Polygon { coordinates } => out.push(polygon(coordinates)),
        Geometry::MultiPolygon { coordinates } => {
            out.extend(coordinates.iter().map(|part| polygon(part)))
        }
        Geometry::Point { .. } | Geometry::MultiPoint { .. } => {}
        Geometry::GeometryCollection { .. } => {
            debug!("Skipping nested geometry collection");
        }
    }
}
