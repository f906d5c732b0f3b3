//! GeoJSON feature collections as returned by both providers.

use geoseek_core::geometry::BoundingBox;
use geoseek_core::{Geometry, ProviderError, SearchResult};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    geometry: Option<Geometry>,
    #[serde(default)]
    bbox: Option<BoundingBox>,
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Parses a GeoJSON FeatureCollection into search results.
///
/// The feature id, when absent, is taken from the `id_property` property.
///
/// # Errors
/// - `ProviderError::Parse` - Body is not a GeoJSON FeatureCollection
pub fn parse_feature_collection(
    body: &str,
    id_property: Option<&str>,
) -> Result<Vec<SearchResult>, ProviderError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse {
            reason: e.to_string(),
        })?;

    Ok(collection
        .features
        .into_iter()
        .map(|feature| {
            let properties = feature.properties.unwrap_or_default();
            let id = feature
                .id
                .or_else(|| id_property.and_then(|key| properties.get(key).cloned()))
                .map(|id| match id {
                    Value::String(text) => text,
                    other => other.to_string(),
                });

            SearchResult {
                id,
                geometry: feature.geometry,
                bbox: feature.bbox,
                properties,
                ..Default::default()
            }
        })
        .collect())
}
