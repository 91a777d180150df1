//! Geometry pipeline errors.

use thiserror::Error;

/// Errors produced while loading a track outline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// The outline could not be downloaded (transport failure or non-success status).
    #[error("failed to fetch track geometry: {0}")]
    Fetch(String),

    /// The document is not valid JSON or holds invalid coordinates.
    #[error("failed to parse track geometry: {0}")]
    Parse(String),

    /// The document is JSON but not a shape we can normalize.
    #[error("unsupported GeoJSON structure: {0}")]
    UnsupportedGeometry(String),

    /// Normalization succeeded but produced no line or polygon to draw.
    #[error("no drawable paths found in track geometry")]
    NoDrawablePath,

    /// A newer track selection or a shutdown cancelled this load before it
    /// finished.
    #[error("track load superseded or cancelled")]
    Superseded,
}

impl From<serde_json::Error> for GeometryError {
    fn from(err: serde_json::Error) -> Self {
        GeometryError::Parse(err.to_string())
    }
}
