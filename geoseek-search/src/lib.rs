//! Geoseek Search - Provider clients for geocoding and feature search
//!
//! Implements the provider boundary of `geoseek-core` over HTTP: a
//! Nominatim-compatible geocoder and OGC WFS feature queries.

pub mod geojson;
pub mod providers;

use std::sync::Arc;

use geoseek_core::config::ProviderSettings;
use geoseek_core::{ProviderError, ProviderRegistry, ServiceKind};

pub use providers::{NominatimProvider, WfsProvider};

/// Builds a registry with every bundled provider.
///
/// # Errors
/// - `ProviderError::Network` - HTTP client could not be constructed
pub fn build_registry(settings: &ProviderSettings) -> Result<ProviderRegistry, ProviderError> {
    let nominatim = NominatimProvider::with_config(settings)?;
    let wfs = WfsProvider::with_config(settings)?;

    Ok(ProviderRegistry::new()
        .with_provider(ServiceKind::Nominatim, Arc::new(nominatim))
        .with_provider(ServiceKind::Wfs, Arc::new(wfs)))
}
