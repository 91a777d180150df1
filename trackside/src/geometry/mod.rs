//! Track geometry projection.
//!
//! Turns a GeoJSON circuit outline into 2D drawable paths on a virtual
//! canvas and maps lap percentages onto points along the primary path.
//!
//! Pipeline:
//!
//! 1. resolve the circuit name to an outline URL ([`crate::circuit`])
//! 2. fetch it through a [`GeometrySource`]
//! 3. [`normalize`] the document into a flat list of geometries
//! 4. fit a [`ProjectionStrategy`] to the canvas
//! 5. [`build_geometry`] one [`PathDescriptor`] per line or polygon part
//!
//! [`TrackProjector`] wraps the pipeline in a cancellable state machine.

mod error;
mod geojson;
mod markers;
mod path;
mod projection;
mod projector;
mod source;
mod track;

pub use error::GeometryError;
pub use geojson::{normalize, parse_document, Geometry, NormalizedGeometry, Position, GEOMETRY_TYPES};
pub use markers::{place_markers, Highlight, Marker};
pub use path::{PathDescriptor, SubPath};
pub use projection::{
    Canvas, EquirectangularProjection, FittedProjection, MercatorProjection, Point,
    ProjectionStrategy, DEFAULT_CANVAS_SIZE, MERCATOR_MAX_LAT,
};
pub use projector::{fetch_track_geometry, ProjectorConfig, ProjectorState, TrackProjector};
pub use source::{GeometrySource, HttpGeometrySource, DEFAULT_FETCH_TIMEOUT};
pub use track::{build_geometry, Bounds, BuildOptions, TrackGeometry, ViewBox, DEFAULT_PADDING};
