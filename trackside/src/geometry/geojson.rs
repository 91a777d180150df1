//! GeoJSON decoding and normalization.
//!
//! Track outlines arrive in several shapes: a `FeatureCollection`, a single
//! `Feature`, a bare geometry, or a loose object with a `features` array.
//! [`normalize`] flattens all of them into a [`NormalizedGeometry`].

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::GeometryError;

/// Geometry type names understood by [`Geometry`].
pub const GEOMETRY_TYPES: &[&str] = &[
    "Point",
    "MultiPoint",
    "LineString",
    "MultiLineString",
    "Polygon",
    "MultiPolygon",
    "GeometryCollection",
];

/// A geographic position in degrees.
///
/// Decodes from a GeoJSON coordinate array `[lon, lat, ...]`. Extra members
/// such as altitude are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "Vec<f64>")]
pub struct Position {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(coords: Vec<f64>) -> Result<Self, Self::Error> {
        match coords.as_slice() {
            [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Ok(Self::new(*lon, *lat)),
            [_, _, ..] => Err(format!("non-finite coordinate {:?}", coords)),
            _ => Err(format!(
                "position needs at least 2 coordinates, got {}",
                coords.len()
            )),
        }
    }
}

/// A GeoJSON geometry object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    MultiPoint { coordinates: Vec<Position> },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Geometry> },
}

impl Geometry {
    /// The GeoJSON `type` name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::MultiPoint { .. } => "MultiPoint",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
            Geometry::Polygon { .. } => "Polygon",
            Geometry::MultiPolygon { .. } => "MultiPolygon",
            Geometry::GeometryCollection { .. } => "GeometryCollection",
        }
    }

    /// Visit every position, descending into collections.
    pub fn for_each_position(&self, f: &mut impl FnMut(Position)) {
        match self {
            Geometry::Point { coordinates } => f(*coordinates),
            Geometry::MultiPoint { coordinates } | Geometry::LineString { coordinates } => {
                coordinates.iter().copied().for_each(f)
            }
            Geometry::MultiLineString { coordinates } | Geometry::Polygon { coordinates } => {
                coordinates.iter().flatten().copied().for_each(f)
            }
            Geometry::MultiPolygon { coordinates } => {
                coordinates.iter().flatten().flatten().copied().for_each(f)
            }
            Geometry::GeometryCollection { geometries } => {
                for geometry in geometries {
                    geometry.for_each_position(f);
                }
            }
        }
    }
}

/// The flat list of geometries found in a track document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedGeometry {
    pub geometries: Vec<Geometry>,
}

impl NormalizedGeometry {
    pub fn new(geometries: Vec<Geometry>) -> Self {
        Self { geometries }
    }

    /// All positions of all geometries, in document order.
    pub fn positions(&self) -> Vec<Position> {
        let mut out = Vec::new();
        for geometry in &self.geometries {
            geometry.for_each_position(&mut |p| out.push(p));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

/// Decode raw bytes into a JSON document.
pub fn parse_document(bytes: &[u8]) -> Result<Value, GeometryError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(GeometryError::Parse("empty document".to_string()));
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Flatten a GeoJSON document into its geometries.
///
/// Features with a `null` geometry are skipped, as are features whose
/// geometry type is not a GeoJSON geometry. Structurally valid geometries
/// with bad coordinates are parse errors.
pub fn normalize(document: &Value) -> Result<NormalizedGeometry, GeometryError> {
    let object = document.as_object().ok_or_else(|| {
        GeometryError::UnsupportedGeometry(format!("expected an object, got {}", kind(document)))
    })?;

    match object.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => features(object.get("features")),
        Some("Feature") => Ok(NormalizedGeometry::new(
            feature_geometry(document)?.into_iter().collect(),
        )),
        Some(ty) if GEOMETRY_TYPES.contains(&ty) => {
            Ok(NormalizedGeometry::new(vec![parse_geometry(document)?]))
        }
        _ if object.get("features").is_some_and(Value::is_array) => {
            features(object.get("features"))
        }
        Some(ty) => Err(GeometryError::UnsupportedGeometry(format!(
            "unknown type {ty:?}"
        ))),
        None => Err(GeometryError::UnsupportedGeometry(
            "missing type".to_string(),
        )),
    }
}

fn features(value: Option<&Value>) -> Result<NormalizedGeometry, GeometryError> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Ok(NormalizedGeometry::default());
    };

    let mut geometries = Vec::with_capacity(items.len());
    for item in items {
        if let Some(geometry) = feature_geometry(item)? {
            geometries.push(geometry);
        }
    }
    Ok(NormalizedGeometry::new(geometries))
}

fn feature_geometry(feature: &Value) -> Result<Option<Geometry>, GeometryError> {
    match feature.get("geometry") {
        None | Some(Value::Null) => {
            debug!("Skipping feature without geometry");
            Ok(None)
        }
        Some(geometry) => match geometry.get("type").and_then(Value::as_str) {
            Some(ty) if GEOMETRY_TYPES.contains(&ty) => parse_geometry(geometry).map(Some),
            other => {
                warn!(geometry_type = ?other, "Skipping feature with unsupported geometry");
                Ok(None)
            }
        },
    }
}

fn parse_geometry(value: &Value) -> Result<Geometry, GeometryError> {
    Ok(Geometry::deserialize(value)?)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
