//! Provider client boundary.
//!
//! A provider executes one service's query against a remote search or
//! geocoding backend. The store only sees this trait and never the wire
//! protocol behind it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ErrorInfo, SearchResult, ServiceKind, ServiceOptions};

/// Errors a provider query can fail with.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Network communication with the backend failed.
    #[error("Network error: {reason}")]
    Network { reason: String },

    /// The backend answered with something that could not be parsed.
    #[error("Parse error: {reason}")]
    Parse { reason: String },

    /// The service options are incomplete for this provider.
    #[error("Invalid service options: {reason}")]
    InvalidOptions { reason: String },

    /// No provider is registered for the service type.
    #[error("No provider registered for service type '{kind}'")]
    UnknownService { kind: String },

    /// The backend reported an error.
    #[error("Search failed for query '{query}': {reason}")]
    SearchFailed { query: String, reason: String },
}

impl ProviderError {
    /// Converts into the snapshot stored in the search state.
    pub fn to_error_info(&self, service: Option<String>) -> ErrorInfo {
        ErrorInfo {
            message: self.to_string(),
            service,
        }
    }
}

/// Executes queries for one service type.
#[async_trait]
pub trait ProviderClient: Send + Sync + std::fmt::Debug {
    /// Search for `query` with the service's options.
    ///
    /// # Errors
    /// - `ProviderError::Network` - Backend unreachable or timed out
    /// - `ProviderError::Parse` - Response could not be decoded
    /// - `ProviderError::InvalidOptions` - Options lack required fields
    async fn search(
        &self,
        query: &str,
        options: &ServiceOptions,
    ) -> Result<Vec<SearchResult>, ProviderError>;
}

/// Provider clients keyed by the service type they execute.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ServiceKind, Arc<dyn ProviderClient>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider` for `kind`, replacing any previous one.
    pub fn register(&mut self, kind: ServiceKind, provider: Arc<dyn ProviderClient>) {
        tracing::debug!("Registered provider for service type {}", kind);
        self.providers.insert(kind, provider);
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with_provider(mut self, kind: ServiceKind, provider: Arc<dyn ProviderClient>) -> Self {
        self.register(kind, provider);
        self
    }

    pub fn get(&self, kind: &ServiceKind) -> Option<Arc<dyn ProviderClient>> {
        self.providers.get(kind).cloned()
    }

    pub fn contains(&self, kind: &ServiceKind) -> bool {
        self.providers.contains_key(kind)
    }

    /// Registered service types.
    pub fn kinds(&self) -> impl Iterator<Item = &ServiceKind> {
        self.providers.keys()
    }

    /// Runs `query` against the provider for `kind`.
    ///
    /// # Errors
    /// - `ProviderError::UnknownService` - Nothing registered for `kind`
    /// - Any error returned by the provider itself
    pub async fn search(
        &self,
        kind: &ServiceKind,
        query: &str,
        options: &ServiceOptions,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        let provider = self
            .get(kind)
            .ok_or_else(|| ProviderError::UnknownService {
                kind: kind.to_string(),
            })?;
        provider.search(query, options).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockProvider;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::{ProviderClient, ProviderError};
    use crate::types::{SearchResult, ServiceOptions};

    /// Provider returning canned results, for tests.
    #[derive(Debug, Default)]
    pub struct MockProvider {
        results: Vec<SearchResult>,
        failure: Option<ProviderError>,
        delay: Option<Duration>,
        calls: Mutex<Vec<(String, ServiceOptions)>>,
    }

    impl MockProvider {
        /// Creates a mock that answers every query with `results`.
        pub fn new(results: Vec<SearchResult>) -> Self {
            Self {
                results,
                ..Default::default()
            }
        }

        /// Creates a mock that fails every query with `error`.
        pub fn failing(error: ProviderError) -> Self {
            Self {
                failure: Some(error),
                ..Default::default()
            }
        }

        /// Delays every answer by `delay`.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Queries received so far with the options they carried.
        pub fn calls(&self) -> Vec<(String, ServiceOptions)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ProviderClient for MockProvider {
        async fn search(
            &self,
            query: &str,
            options: &ServiceOptions,
        ) -> Result<Vec<SearchResult>, ProviderError> {
            self.calls.lock().push((query.to_string(), options.clone()));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            match &self.failure {
                Some(error) => Err(error.clone()),
                None => Ok(self.results.clone()),
            }
        }
    }
}
