use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;

/// GeoJSON geometry types understood by the remote map views.
///
/// `GeometryCollection` is not supported.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum GeometryType {
    Point,
    MultiPoint,
    LineString,
    MultiLineString,
    Polygon,
    MultiPolygon,
}

impl GeometryType {
    pub const ALL: [GeometryType; 6] = [
        GeometryType::Point,
        GeometryType::MultiPoint,
        GeometryType::LineString,
        GeometryType::MultiLineString,
        GeometryType::Polygon,
        GeometryType::MultiPolygon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::LineString => "LineString",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPolygon => "MultiPolygon",
        }
    }
}

impl std::str::FromStr for GeometryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeometryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidGeometryType(s.to_string()))
    }
}

impl TryFrom<String> for GeometryType {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GeometryType> for &'static str {
    fn from(t: GeometryType) -> Self {
        t.as_str()
    }
}

/// A GeoJSON geometry object.
///
/// Coordinates are passed through untouched; only the type is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: GeometryType,
    pub coordinates: Value,
}

impl Geometry {
    pub fn new(kind: GeometryType, coordinates: Value) -> Self {
        Self { kind, coordinates }
    }

    pub fn point(x: f64, y: f64) -> Self {
        Self::new(GeometryType::Point, serde_json::json!([x, y]))
    }

    pub fn polygon(ring: &[[f64; 2]]) -> Self {
        Self::new(GeometryType::Polygon, serde_json::json!([ring]))
    }
}

/// Identifies a layer in a map view by the print names of the layer and its
/// ancestor groups. A single print name is accepted as shorthand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "LayerRef")]
pub struct LayerPath(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum LayerRef {
    Name(String),
    Path(Vec<String>),
}

impl From<LayerRef> for LayerPath {
    fn from(r: LayerRef) -> Self {
        match r {
            LayerRef::Name(name) => LayerPath(vec![name]),
            LayerRef::Path(path) => LayerPath(path),
        }
    }
}

impl From<&str> for LayerPath {
    fn from(name: &str) -> Self {
        LayerPath(vec![name.to_string()])
    }
}

impl From<Vec<String>> for LayerPath {
    fn from(path: Vec<String>) -> Self {
        LayerPath(path)
    }
}

impl<const N: usize> From<[&str; N]> for LayerPath {
    fn from(path: [&str; N]) -> Self {
        LayerPath(path.iter().map(|s| s.to_string()).collect())
    }
}
