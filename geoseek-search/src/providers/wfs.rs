//! WFS feature query provider.
//!
//! Matches the search text against a layer's attributes with a CQL filter.
//! A `staticFilter` placed in the options by a parent selection is ANDed in,
//! which is how nested searches stay inside the parent feature.

use async_trait::async_trait;
use geoseek_core::config::ProviderSettings;
use geoseek_core::{ProviderClient, ProviderError, SearchResult, ServiceOptions};
use url::Url;

use super::{fetch_body, http_client};
use crate::geojson::parse_feature_collection;

const DEFAULT_PREDICATE: &str = "ILIKE";
const DEFAULT_SRS: &str = "EPSG:4326";

/// WFS 1.1.0 `GetFeature` client returning GeoJSON.
#[derive(Debug)]
pub struct WfsProvider {
    client: reqwest::Client,
    max_features: u32,
}

impl WfsProvider {
    /// Creates a provider from the shared provider settings.
    ///
    /// # Errors
    /// - `ProviderError::Network` - HTTP client could not be constructed
    pub fn with_config(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(settings)?,
            max_features: settings.wfs_max_features,
        })
    }

    /// Builds the `GetFeature` URL for `query`.
    ///
    /// # Errors
    /// - `ProviderError::InvalidOptions` - Missing `url`, `typeName` or `queryAttributes`
    pub fn get_feature_url(
        &self,
        query: &str,
        options: &ServiceOptions,
    ) -> Result<Url, ProviderError> {
        let base = options
            .url
            .as_deref()
            .ok_or_else(|| invalid("WFS service needs an url"))?;
        let type_name = options
            .type_name
            .as_deref()
            .ok_or_else(|| invalid("WFS service needs a typeName"))?;
        let filter = cql_filter(query, options)?;

        let mut url = Url::parse(base)
            .map_err(|e| invalid(&format!("invalid WFS URL '{base}': {e}")))?;
        url.query_pairs_mut()
            .append_pair("service", "WFS")
            .append_pair("version", "1.1.0")
            .append_pair("request", "GetFeature")
            .append_pair("typeName", type_name)
            .append_pair("outputFormat", "application/json")
            .append_pair(
                "maxFeatures",
                &options.max_features.unwrap_or(self.max_features).to_string(),
            )
            .append_pair("srsName", options.srs_name.as_deref().unwrap_or(DEFAULT_SRS))
            .append_pair("CQL_FILTER", &filter);

        Ok(url)
    }
}

fn invalid(reason: &str) -> ProviderError {
    ProviderError::InvalidOptions {
        reason: reason.to_string(),
    }
}

/// CQL filter matching `query` on every query attribute, plus the static filter.
///
/// # Errors
/// - `ProviderError::InvalidOptions` - No query attributes configured
pub fn cql_filter(query: &str, options: &ServiceOptions) -> Result<String, ProviderError> {
    if options.query_attributes.is_empty() {
        return Err(invalid("WFS service needs queryAttributes"));
    }

    let predicate = options.predicate.as_deref().unwrap_or(DEFAULT_PREDICATE);
    let pattern = format!("%{}%", query.trim().replace('\'', "''"));
    let matches = options
        .query_attributes
        .iter()
        .map(|attribute| format!("{attribute} {predicate} '{pattern}'"))
        .collect::<Vec<_>>()
        .join(" OR ");

    let static_filter = options
        .static_filter
        .as_deref()
        .map(strip_leading_and)
        .filter(|filter| !filter.is_empty());

    Ok(match static_filter {
        Some(filter) => format!("({matches}) AND ({filter})"),
        None => matches,
    })
}

/// Filter templates are often written as a continuation (`" AND ..."`).
fn strip_leading_and(filter: &str) -> &str {
    let trimmed = filter.trim();
    match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("and ") => trimmed[4..].trim_start(),
        _ => trimmed,
    }
}

#[async_trait]
impl ProviderClient for WfsProvider {
    async fn search(
        &self,
        query: &str,
        options: &ServiceOptions,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let url = self.get_feature_url(query, options)?;
        let body = fetch_body(&self.client, url).await?;
        let results = parse_feature_collection(&body, None)?;

        tracing::debug!(
            "WFS {} returned {} features for '{}'",
            options.type_name.as_deref().unwrap_or_default(),
            results.len(),
            query
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ServiceOptions {
        ServiceOptions {
            url: Some("http://maps.test/geoserver/wfs".to_string()),
            type_name: Some("topp:streets".to_string()),
            query_attributes: vec!["NAME".to_string(), "ALT_NAME".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_cql_filter_ors_attributes() {
        assert_eq!(
            cql_filter("corso", &options()).unwrap(),
            "NAME ILIKE '%corso%' OR ALT_NAME ILIKE '%corso%'"
        );
    }

    #[test]
    fn test_cql_filter_escapes_quotes() {
        let mut options = options();
        options.query_attributes = vec!["NAME".to_string()];
        options.predicate = Some("LIKE".to_string());
        assert_eq!(
            cql_filter("l'aquila", &options).unwrap(),
            "NAME LIKE '%l''aquila%'"
        );
    }

    #[test]
    fn test_static_filter_is_anded() {
        let mut options = options();
        options.query_attributes = vec!["NAME".to_string()];
        options.static_filter = Some(" AND CITY = 'Genova'".to_string());
        assert_eq!(
            cql_filter("roma", &options).unwrap(),
            "(NAME ILIKE '%roma%') AND (CITY = 'Genova')"
        );
    }

    #[test]
    fn test_missing_options_are_rejected() {
        let provider = WfsProvider::with_config(&ProviderSettings::default()).unwrap();

        let error = provider
            .get_feature_url("x", &ServiceOptions::default())
            .unwrap_err();
        assert!(matches!(error, ProviderError::InvalidOptions { .. }));

        let mut no_attributes = options();
        no_attributes.query_attributes.clear();
        assert!(provider.get_feature_url("x", &no_attributes).is_err());
    }

    #[test]
    fn test_get_feature_url() {
        let provider = WfsProvider::with_config(&ProviderSettings::default()).unwrap();
        let url = provider.get_feature_url("corso", &options()).unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("typeName".to_string(), "topp:streets".to_string())));
        assert!(pairs.contains(&("maxFeatures".to_string(), "10".to_string())));
        assert!(pairs.contains(&("srsName".to_string(), "EPSG:4326".to_string())));
        assert!(pairs.contains(&(
            "CQL_FILTER".to_string(),
            "NAME ILIKE '%corso%' OR ALT_NAME ILIKE '%corso%'".to_string()
        )));
    }
}
