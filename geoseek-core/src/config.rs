//! Centralized configuration for Geoseek.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use crate::types::{ServiceDescriptor, ServiceKind};
use crate::{Result, SearchError};

/// Central configuration for all Geoseek components.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct GeoseekConfig {
    pub search: SearchConfig,
    pub map: MapConfig,
    pub templates: TemplateConfig,
    pub providers: ProviderSettings,
}

/// Search store behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Services queried when neither the command nor the state name any
    pub default_services: Vec<ServiceDescriptor>,
    /// Cap on results per batch (None = keep everything)
    pub max_results: Option<usize>,
    /// Capacity of the command channel into the store
    pub command_buffer: usize,
    /// Capacity of the broadcast channel of processed commands
    pub event_buffer: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_services: vec![ServiceDescriptor::new(ServiceKind::Nominatim)],
            max_results: None,
            command_buffer: 100,
            event_buffer: 256,
        }
    }
}

/// Map viewport defaults for recentering.
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Zoom used for point results and as the upper bound for extents
    pub max_zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self { max_zoom: 21 }
    }
}

/// Template cache sizing.
#[derive(Debug, Clone, Default)]
pub struct TemplateConfig {
    /// Maximum cached templates (None = never evict)
    pub cache_capacity: Option<NonZeroUsize>,
}

/// Settings for the bundled HTTP providers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL of the Nominatim-compatible geocoder
    pub nominatim_url: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Results requested from the geocoder
    pub nominatim_limit: u32,
    /// Default feature cap for WFS queries
    pub wfs_max_features: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "geoseek/0.1.0".to_string(),
            request_timeout: Duration::from_secs(15),
            nominatim_limit: 10,
            wfs_max_features: 10,
        }
    }
}

impl GeoseekConfig {
    /// Creates configuration with environment variable overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("GEOSEEK_NOMINATIM_URL") {
            config.providers.nominatim_url = url;
        }

        if let Ok(agent) = std::env::var("GEOSEEK_USER_AGENT") {
            config.providers.user_agent = agent;
        }

        if let Some(secs) = std::env::var("GEOSEEK_REQUEST_TIMEOUT")
            .ok()
            .and_then(|timeout| timeout.parse::<u64>().ok())
        {
            config.providers.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(max_results) = std::env::var("GEOSEEK_MAX_RESULTS") {
            config.search.max_results = max_results.parse().ok().filter(|&n: &usize| n > 0);
        }

        if let Some(zoom) = std::env::var("GEOSEEK_MAX_ZOOM")
            .ok()
            .and_then(|max_zoom| max_zoom.parse::<u8>().ok())
        {
            config.map.max_zoom = zoom;
        }

        if let Ok(capacity) = std::env::var("GEOSEEK_TEMPLATE_CACHE") {
            config.templates.cache_capacity = capacity.parse().ok();
        }

        config
    }

    /// Creates a configuration optimized for testing.
    pub fn for_testing() -> Self {
        Self {
            search: SearchConfig {
                command_buffer: 16,
                event_buffer: 64,
                ..Default::default()
            },
            providers: ProviderSettings {
                nominatim_url: "http://127.0.0.1:8088".to_string(),
                request_timeout: Duration::from_secs(1),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Replaces the default services with those defined in a JSON file.
    ///
    /// # Errors
    /// - `SearchError::Io` - File could not be read
    /// - `SearchError::InvalidServices` - File is not a JSON array of services
    /// - `SearchError::Configuration` - File defines no services
    pub fn with_services_file(mut self, path: &Path) -> Result<Self> {
        self.search.default_services = load_services(path)?;
        Ok(self)
    }
}

/// Reads a JSON array of service descriptors.
///
/// # Errors
/// - `SearchError::Io` - File could not be read
/// - `SearchError::InvalidServices` - File is not a JSON array of services
/// - `SearchError::Configuration` - File defines no services
pub fn load_services(path: &Path) -> Result<Vec<ServiceDescriptor>> {
    let contents = std::fs::read_to_string(path)?;
    let services: Vec<ServiceDescriptor> = serde_json::from_str(&contents)?;

    if services.is_empty() {
        return Err(SearchError::Configuration {
            reason: format!("{} defines no services", path.display()),
        });
    }

    tracing::info!(
        "Loaded {} services from {}",
        services.len(),
        path.display()
    );
    Ok(services)
}
