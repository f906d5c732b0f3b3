//! Nominatim geocoder provider.

use async_trait::async_trait;
use geoseek_core::config::ProviderSettings;
use geoseek_core::{ProviderClient, ProviderError, SearchResult, ServiceOptions};
use serde_json::Value;
use url::Url;

use super::{fetch_body, http_client};
use crate::geojson::parse_feature_collection;

/// Geocoder speaking the Nominatim `/search` API with GeoJSON output.
///
/// `options.url` overrides the configured base URL per service. String and
/// number entries of `options.extra` (e.g. `countrycodes`, `viewbox`) are
/// forwarded as query parameters.
///
/// The geocoder has no attribute filter, so `options.static_filter` set by a
/// parent selection cannot narrow the query and is left out of the URL. To
/// keep a nested child inside its parent, use a WFS service or constrain it
/// with `viewbox`/`bounded` extras.
#[derive(Debug)]
pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl NominatimProvider {
    /// Creates a provider from the shared provider settings.
    ///
    /// # Errors
    /// - `ProviderError::Network` - HTTP client could not be constructed
    pub fn with_config(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(settings)?,
            base_url: settings.nominatim_url.clone(),
            limit: settings.nominatim_limit,
        })
    }

    /// Builds the search URL for `query`.
    ///
    /// # Errors
    /// - `ProviderError::InvalidOptions` - Base URL is not a valid URL
    pub fn search_url(&self, query: &str, options: &ServiceOptions) -> Result<Url, ProviderError> {
        let base = options.url.as_deref().unwrap_or(&self.base_url);
        let mut url = Url::parse(&format!("{}/search", base.trim_end_matches('/'))).map_err(
            |e| ProviderError::InvalidOptions {
                reason: format!("invalid geocoder URL '{base}': {e}"),
            },
        )?;

        if let Some(filter) = &options.static_filter {
            tracing::debug!(
                "Geocoder cannot apply parent filter '{}', searching unconstrained",
                filter
            );
        }

        let limit = options.max_features.unwrap_or(self.limit);
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("format", "geojson")
                .append_pair("limit", &limit.to_string())
                .append_pair("addressdetails", "1");

            for (key, value) in &options.extra {
                match value {
                    Value::String(text) => {
                        pairs.append_pair(key, text);
                    }
                    Value::Number(number) => {
                        pairs.append_pair(key, &number.to_string());
                    }
                    Value::Bool(flag) => {
                        pairs.append_pair(key, if *flag { "1" } else { "0" });
                    }
                    _ => tracing::debug!("Skipping non-scalar geocoder option {}", key),
                }
            }
        }

        Ok(url)
    }
}

#[async_trait]
impl ProviderClient for NominatimProvider {
    async fn search(
        &self,
        query: &str,
        options: &ServiceOptions,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let url = self.search_url(query, options)?;
        let body = fetch_body(&self.client, url).await?;
        let results = parse_feature_collection(&body, Some("place_id"))?;

        tracing::debug!("Geocoder returned {} results for '{}'", results.len(), query);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn provider() -> NominatimProvider {
        NominatimProvider::with_config(&ProviderSettings {
            nominatim_url: "http://geocoder.test/".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_search_url() {
        let url = provider()
            .search_url("via del corso", &ServiceOptions::default())
            .unwrap();

        assert_eq!(url.path(), "/search");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("q".to_string(), "via del corso".to_string())));
        assert!(pairs.contains(&("format".to_string(), "geojson".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "10".to_string())));
    }

    #[test]
    fn test_options_override_url_limit_and_extra() {
        let mut options = ServiceOptions {
            url: Some("http://other.test".to_string()),
            max_features: Some(3),
            ..Default::default()
        };
        options.extra.insert("countrycodes".to_string(), json!("it"));
        options.extra.insert("bounded".to_string(), json!(true));

        let url = provider().search_url("roma", &options).unwrap();
        assert_eq!(url.host_str(), Some("other.test"));
        let query = url.query().unwrap();
        assert!(query.contains("limit=3"));
        assert!(query.contains("countrycodes=it"));
        assert!(query.contains("bounded=1"));
    }

    #[test]
    fn test_static_filter_is_not_sent() {
        let options = ServiceOptions {
            static_filter: Some("CITY = 'Genova'".to_string()),
            ..Default::default()
        };
        let url = provider().search_url("garibaldi", &options).unwrap();

        let keys: Vec<String> = url.query_pairs().map(|(key, _)| key.into_owned()).collect();
        assert_eq!(keys, vec!["q", "format", "limit", "addressdetails"]);
    }

    #[test]
    fn test_invalid_base_url() {
        let options = ServiceOptions {
            url: Some("not a url".to_string()),
            ..Default::default()
        };
        let error = provider().search_url("roma", &options).unwrap_err();
        assert!(matches!(error, ProviderError::InvalidOptions { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_geocoder_is_network_error() {
        let provider = NominatimProvider::with_config(&ProviderSettings {
            nominatim_url: "http://127.0.0.1:9".to_string(),
            request_timeout: std::time::Duration::from_millis(500),
            ..Default::default()
        })
        .unwrap();

        let error = provider
            .search("roma", &ServiceOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(error, ProviderError::Network { .. }));
    }
}
