//! Geoseek Core - Search orchestration for map-centric search
//!
//! This crate provides the building blocks of a cascading, multi-provider
//! search: the template resolver, the command vocabulary, the immutable
//! search state with its pure transition function, and the asynchronous
//! store that queries providers and recenters the map on selection.

pub mod commands;
pub mod config;
pub mod display;
pub mod geometry;
pub mod orchestrator;
pub mod provider;
pub mod state;
pub mod template;
pub mod tracing_setup;
pub mod types;

// Re-export main types for convenient access
pub use commands::Command;
pub use config::GeoseekConfig;
pub use orchestrator::{SearchHandle, spawn_search_store};
pub use provider::{ProviderClient, ProviderError, ProviderRegistry};
pub use state::{SearchState, apply};
pub use template::{CompiledTemplate, TemplateCache, TemplateResolver};
pub use types::{
    ErrorInfo, GeoPoint, Geometry, MapSize, MapView, MapViewContext, SearchResult, SelectedItem,
    ServiceDescriptor, ServiceKind, ServiceOptions,
};

/// Core errors that can bubble up from the search store.
///
/// Provider failures never surface here; they are folded into the search
/// state as `ERROR` commands.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search store has shut down")]
    StoreShutdown,

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid service definition: {0}")]
    InvalidServices(#[from] serde_json::Error),
}

impl SearchError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            SearchError::StoreShutdown => "Search is no longer running".to_string(),
            SearchError::Configuration { reason } => format!("Configuration error: {reason}"),
            SearchError::Io(_) => "File system error occurred".to_string(),
            SearchError::InvalidServices(_) => "Service definitions could not be read".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;
