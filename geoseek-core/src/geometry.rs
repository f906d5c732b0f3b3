//! Extent and zoom calculations for recentering the map on a result.
//!
//! Providers return EPSG:4326 coordinates. The map may be geographic or web
//! mercator, so extents are projected before the zoom level is chosen.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{GeoPoint, MapView, MapViewContext, SearchResult};

const EARTH_RADIUS: f64 = 6_378_137.0;
const TILE_SIZE: f64 = 256.0;
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Axis-aligned extent, serialized as a GeoJSON `[minx, miny, maxx, maxy]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box containing every point, or `None` if there are none.
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Self::new(x, y, x, y),
                Some(bbox) => Self::new(
                    bbox.min_x.min(x),
                    bbox.min_y.min(y),
                    bbox.max_x.max(x),
                    bbox.max_y.max(y),
                ),
            })
        })
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

impl TryFrom<Vec<f64>> for BoundingBox {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [min_x, min_y, max_x, max_y] => Ok(Self::new(*min_x, *min_y, *max_x, *max_y)),
            // 3D bbox: [minx, miny, minz, maxx, maxy, maxz]
            [min_x, min_y, _, max_x, max_y, _] => Ok(Self::new(*min_x, *min_y, *max_x, *max_y)),
            _ => Err(format!("bbox needs 4 or 6 values, got {}", values.len())),
        }
    }
}

impl From<BoundingBox> for Vec<f64> {
    fn from(bbox: BoundingBox) -> Self {
        vec![bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]
    }
}

/// Map projections the viewport math understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// EPSG:4326, units are degrees.
    Geographic,
    /// EPSG:3857, units are meters.
    WebMercator,
}

impl Projection {
    /// Parses a projection code, falling back to geographic for unknown codes.
    pub fn from_code(code: &str) -> Self {
        match code.to_uppercase().as_str() {
            "EPSG:4326" | "CRS:84" | "WGS84" => Projection::Geographic,
            "EPSG:3857" | "EPSG:900913" | "EPSG:102100" => Projection::WebMercator,
            other => {
                tracing::warn!("Unsupported map projection {}, using EPSG:4326", other);
                Projection::Geographic
            }
        }
    }

    /// Map units per pixel at zoom level 0.
    fn base_resolution(self) -> f64 {
        match self {
            Projection::Geographic => 360.0 / TILE_SIZE,
            Projection::WebMercator => 2.0 * PI * EARTH_RADIUS / TILE_SIZE,
        }
    }

    /// Projects an EPSG:4326 coordinate into this projection.
    pub fn project(self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::Geographic => (lon, lat),
            Projection::WebMercator => {
                let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
                let x = EARTH_RADIUS * lon.to_radians();
                let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
                (x, y)
            }
        }
    }

    /// Projects an EPSG:4326 extent into this projection.
    pub fn project_bbox(self, bbox: &BoundingBox) -> BoundingBox {
        let (min_x, min_y) = self.project(bbox.min_x, bbox.min_y);
        let (max_x, max_y) = self.project(bbox.max_x, bbox.max_y);
        BoundingBox::new(min_x, min_y, max_x, max_y)
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Projection::Geographic => f.write_str("EPSG:4326"),
            Projection::WebMercator => f.write_str("EPSG:3857"),
        }
    }
}

/// Largest zoom level at which `extent` (in map units) fits the viewport.
///
/// Degenerate extents such as a single point always get `max_zoom`.
pub fn zoom_for_extent(
    extent: &BoundingBox,
    width: u32,
    height: u32,
    projection: Projection,
    max_zoom: u8,
) -> u8 {
    if extent.width() <= 0.0 && extent.height() <= 0.0 {
        return max_zoom;
    }

    let width = f64::from(width.max(1));
    let height = f64::from(height.max(1));
    let base = projection.base_resolution();

    (0..=max_zoom)
        .rev()
        .find(|&zoom| {
            let resolution = base / 2f64.powi(i32::from(zoom));
            extent.width() / resolution <= width && extent.height() / resolution <= height
        })
        .unwrap_or(0)
}

/// Computes the map view that frames `result`, if it has a location.
pub fn map_view_for(
    result: &SearchResult,
    context: &MapViewContext,
    default_max_zoom: u8,
) -> Option<MapView> {
    let extent = result.extent()?;
    let center = result.position().unwrap_or_else(|| extent.center());
    let projection = Projection::from_code(&context.projection);
    let projected = projection.project_bbox(&extent);
    let max_zoom = context.max_zoom.unwrap_or(default_max_zoom);
    let zoom = zoom_for_extent(
        &projected,
        context.size.width,
        context.size.height,
        projection,
        max_zoom,
    );

    Some(MapView {
        center,
        zoom,
        bbox: projected,
        projection: context.projection.clone(),
        size: context.size,
    })
}
