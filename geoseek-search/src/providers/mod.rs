//! Provider implementations for the bundled service types.

pub mod nominatim;
pub mod wfs;

pub use nominatim::NominatimProvider;
pub use wfs::WfsProvider;

use geoseek_core::ProviderError;

/// Builds the shared HTTP client for a provider.
fn http_client(
    settings: &geoseek_core::config::ProviderSettings,
) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.request_timeout)
        .build()
        .map_err(|e| ProviderError::Network {
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Sends `url` and returns the body of a successful response.
async fn fetch_body(client: &reqwest::Client, url: url::Url) -> Result<String, ProviderError> {
    tracing::debug!("GET {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| ProviderError::Network {
            reason: e.to_string(),
        })?;

    response.text().await.map_err(|e| ProviderError::Network {
        reason: e.to_string(),
    })
}
