//! Data types shared by the search state, the orchestrator and providers.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::geometry::BoundingBox;

/// Longitude/latitude pair in EPSG:4326.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lon)
    }
}

/// GeoJSON position. Only the first two ordinates are kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(ordinates: Vec<f64>) -> Result<Self, Self::Error> {
        match ordinates.as_slice() {
            [x, y, ..] => Ok(Self { x: *x, y: *y }),
            _ => Err(format!(
                "position needs at least two ordinates, got {}",
                ordinates.len()
            )),
        }
    }
}

impl From<Position> for Vec<f64> {
    fn from(position: Position) -> Self {
        vec![position.x, position.y]
    }
}

impl From<Position> for GeoPoint {
    fn from(position: Position) -> Self {
        GeoPoint::new(position.x, position.y)
    }
}

/// GeoJSON geometry as returned by providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// Creates a point geometry.
    pub fn point(lon: f64, lat: f64) -> Self {
        Geometry::Point(Position { x: lon, y: lat })
    }

    /// Iterates over every position in the geometry.
    pub fn positions(&self) -> Box<dyn Iterator<Item = &Position> + '_> {
        match self {
            Geometry::Point(position) => Box::new(std::iter::once(position)),
            Geometry::MultiPoint(positions) | Geometry::LineString(positions) => {
                Box::new(positions.iter())
            }
            Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => {
                Box::new(lines.iter().flatten())
            }
            Geometry::MultiPolygon(polygons) => Box::new(polygons.iter().flatten().flatten()),
        }
    }

    /// Bounding box of all positions, or `None` for empty geometries.
    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.positions().map(|p| (p.x, p.y)))
    }
}

/// Identifies which provider client executes a service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceKind {
    /// Nominatim-compatible geocoder.
    Nominatim,
    /// WFS feature query against a remote layer.
    Wfs,
    /// Any other registered provider type.
    Custom(String),
}

impl ServiceKind {
    pub fn as_str(&self) -> &str {
        match self {
            ServiceKind::Nominatim => "nominatim",
            ServiceKind::Wfs => "wfs",
            ServiceKind::Custom(name) => name,
        }
    }
}

impl From<String> for ServiceKind {
    fn from(name: String) -> Self {
        match name.to_lowercase().as_str() {
            "nominatim" => ServiceKind::Nominatim,
            "wfs" => ServiceKind::Wfs,
            _ => ServiceKind::Custom(name),
        }
    }
}

impl From<&str> for ServiceKind {
    fn from(name: &str) -> Self {
        ServiceKind::from(name.to_string())
    }
}

impl From<ServiceKind> for String {
    fn from(kind: ServiceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-specific query options.
///
/// Well-known options are typed; anything else passes through in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query_attributes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_features: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srs_name: Option<String>,
    /// Extra filter injected by a parent result when drilling down.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_filter: Option<String>,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

/// Configuration of one searchable service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ServiceKind,
    #[serde(default)]
    pub options: ServiceOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_placeholder: Option<String>,
    /// Higher priority results sort first when several services answer.
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then: Option<Vec<ServiceDescriptor>>,
}

impl ServiceDescriptor {
    /// Creates a descriptor with default options.
    pub fn new(kind: impl Into<ServiceKind>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            options: ServiceOptions::default(),
            display_name: None,
            sub_title: None,
            id_field: None,
            filter_template: None,
            search_text_template: None,
            nested_placeholder: None,
            priority: 0,
            then: None,
        }
    }

    /// Nested services to activate when a result of this service is selected.
    pub fn nested(&self) -> Option<&[ServiceDescriptor]> {
        self.then.as_deref().filter(|services| !services.is_empty())
    }

    /// Short label used in logs and error messages.
    pub fn label(&self) -> String {
        match &self.id {
            Some(id) => format!("{}:{id}", self.kind),
            None => self.kind.to_string(),
        }
    }
}

/// A candidate returned by a provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Service that produced the result.
    #[serde(
        rename = "__SERVICE__",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub service: Option<ServiceDescriptor>,
    #[serde(rename = "__PRIORITY__", default)]
    pub priority: i32,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl SearchResult {
    /// Creates a result at a point with the given properties.
    pub fn at_point(lon: f64, lat: f64, properties: Map<String, Value>) -> Self {
        Self {
            geometry: Some(Geometry::point(lon, lat)),
            properties,
            ..Default::default()
        }
    }

    /// Extent of the result: the explicit bbox, else the geometry's.
    pub fn extent(&self) -> Option<BoundingBox> {
        self.bbox
            .or_else(|| self.geometry.as_ref().and_then(Geometry::bbox))
    }

    /// Position to mark on the map.
    pub fn position(&self) -> Option<GeoPoint> {
        match &self.geometry {
            Some(Geometry::Point(position)) => Some((*position).into()),
            _ => self.extent().map(|bbox| bbox.center()),
        }
    }

    /// Identifier: explicit id, else the service's `idField` property.
    pub fn identifier(&self) -> Option<String> {
        self.id.clone().or_else(|| {
            let field = self.service.as_ref()?.id_field.as_deref()?;
            self.properties.get(field).map(|value| match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
        })
    }

    /// Tags the result with the service that produced it.
    pub fn tagged(mut self, service: &ServiceDescriptor) -> Self {
        self.priority = service.priority;
        self.service = Some(service.clone());
        self
    }

    /// JSON view used to render templates.
    pub fn to_record(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// One breadcrumb of the drill-down stack.
///
/// Identity is the `id`; two breadcrumbs with equal text are distinct items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedItem {
    pub id: Uuid,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl SelectedItem {
    /// Creates a breadcrumb with a fresh identity.
    pub fn new(text: impl Into<String>, placeholder: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            placeholder,
        }
    }
}

/// Snapshot of the last query failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            service: None,
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service {
            Some(service) => write!(f, "{service}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSize {
    pub width: u32,
    pub height: u32,
}

/// What the map looks like when an item is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapViewContext {
    pub size: MapSize,
    pub projection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<u8>,
}

impl MapViewContext {
    pub fn new(width: u32, height: u32, projection: impl Into<String>) -> Self {
        Self {
            size: MapSize { width, height },
            projection: projection.into(),
            max_zoom: None,
        }
    }
}

/// Map-recenter request consumed by the map viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: GeoPoint,
    pub zoom: u8,
    /// Extent in map projection units.
    pub bbox: BoundingBox,
    pub projection: String,
    pub size: MapSize,
}
