//! Provider failures and recovery.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use geoseek_core::provider::MockProvider;
use geoseek_core::{
    ProviderClient, ProviderError, ProviderRegistry, SearchResult, ServiceDescriptor,
    ServiceKind, ServiceOptions,
};

use crate::common::{named, names, next_commands, registry, result_names, spawn};

/// Fails the first query, then answers normally.
#[derive(Debug)]
struct FlakyProvider {
    attempts: AtomicUsize,
}

#[async_trait]
impl ProviderClient for FlakyProvider {
    async fn search(
        &self,
        query: &str,
        _options: &ServiceOptions,
    ) -> Result<Vec<SearchResult>, ProviderError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(ProviderError::Network {
                reason: "connection refused".to_string(),
            });
        }
        Ok(vec![named(query, 1.0, 2.0)])
    }
}

#[tokio::test]
async fn test_error_then_successful_search_clears_error() {
    let registry = ProviderRegistry::new().with_provider(
        ServiceKind::Nominatim,
        Arc::new(FlakyProvider {
            attempts: AtomicUsize::new(0),
        }),
    );
    let handle = spawn(registry);
    let mut events = handle.subscribe();

    handle.start_search("Roma", None).await.unwrap();
    let failed = handle.wait_until_idle().await.unwrap();
    assert!(failed.error.is_some());
    assert_eq!(
        names(&next_commands(&mut events, 4).await),
        vec![
            "TEXT_SEARCH_STARTED",
            "TEXT_SEARCH_LOADING",
            "TEXT_SEARCH_ERROR",
            "TEXT_SEARCH_LOADING"
        ]
    );

    handle.start_search("Roma", None).await.unwrap();
    let recovered = handle.wait_until_idle().await.unwrap();
    assert!(recovered.error.is_none());
    assert_eq!(result_names(recovered.results.as_deref().unwrap()), vec!["Roma"]);
}

#[tokio::test]
async fn test_one_failing_service_fails_the_batch() {
    let handle = spawn(registry(vec![
        ("good", Arc::new(MockProvider::new(vec![named("ok", 0.0, 0.0)]))),
        (
            "bad",
            Arc::new(MockProvider::failing(ProviderError::SearchFailed {
                query: "x".to_string(),
                reason: "HTTP 500".to_string(),
            })),
        ),
    ]));

    handle
        .start_search(
            "x",
            Some(vec![ServiceDescriptor::new("good"), ServiceDescriptor::new("bad")]),
        )
        .await
        .unwrap();
    let state = handle.wait_until_idle().await.unwrap();

    assert!(state.results.is_none());
    assert_eq!(state.error.unwrap().service.as_deref(), Some("bad"));
}

#[tokio::test]
async fn test_results_follow_service_order_then_priority() {
    let mut low = ServiceDescriptor::new("low");
    low.priority = 0;
    let mut high = ServiceDescriptor::new("high");
    high.priority = 5;
    let mut also_low = ServiceDescriptor::new("also_low");
    also_low.priority = 0;

    let handle = spawn(registry(vec![
        ("low", Arc::new(MockProvider::new(vec![named("a", 0.0, 0.0)]))),
        ("high", Arc::new(MockProvider::new(vec![named("b", 0.0, 0.0)]))),
        ("also_low", Arc::new(MockProvider::new(vec![named("c", 0.0, 0.0)]))),
    ]));

    handle
        .start_search("q", Some(vec![low, high, also_low]))
        .await
        .unwrap();
    let state = handle.wait_until_idle().await.unwrap();

    assert_eq!(
        result_names(state.results.as_deref().unwrap()),
        vec!["b", "a", "c"]
    );
}
