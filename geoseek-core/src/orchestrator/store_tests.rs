//! End-to-end tests of the search store actor.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::{Map, json};
    use tokio::sync::broadcast;

    use crate::commands::Command;
    use crate::config::GeoseekConfig;
    use crate::orchestrator::spawn_search_store;
    use crate::provider::{MockProvider, ProviderError, ProviderRegistry};
    use crate::template::TemplateResolver;
    use crate::types::{MapViewContext, SearchResult, SelectedItem, ServiceDescriptor, ServiceKind};

    fn named(name: &str) -> SearchResult {
        let mut properties = Map::new();
        properties.insert("name".to_string(), json!(name));
        SearchResult::at_point(125.6, 10.1, properties)
    }

    /// Collects `count` command names from the log, failing after a second.
    async fn next_names(events: &mut broadcast::Receiver<Command>, count: usize) -> Vec<&'static str> {
        let mut names = Vec::with_capacity(count);
        for _ in 0..count {
            let command = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .expect("command log stalled")
                .unwrap();
            names.push(command.name());
        }
        names
    }

    fn registry_with(kind: ServiceKind, provider: MockProvider) -> ProviderRegistry {
        ProviderRegistry::new().with_provider(kind, Arc::new(provider))
    }

    #[tokio::test]
    async fn test_successful_search_command_order() {
        let registry = registry_with(
            ServiceKind::Nominatim,
            MockProvider::new(vec![named("r1"), named("r2")]),
        );
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );
        let mut events = handle.subscribe();

        handle.start_search("Dinagat", None).await.unwrap();

        assert_eq!(
            next_names(&mut events, 4).await,
            vec![
                "TEXT_SEARCH_STARTED",
                "TEXT_SEARCH_LOADING",
                "TEXT_SEARCH_RESULTS_LOADED",
                "TEXT_SEARCH_LOADING"
            ]
        );

        let state = handle.wait_until_idle().await.unwrap();
        assert_eq!(state.result_count(), 2);
        assert!(state.error.is_none());
        assert_eq!(
            state.results.unwrap()[0]
                .service
                .as_ref()
                .map(|service| service.kind.clone()),
            Some(ServiceKind::Nominatim)
        );
    }

    #[tokio::test]
    async fn test_loading_is_true_while_query_outstanding() {
        let registry = registry_with(
            ServiceKind::Nominatim,
            MockProvider::new(vec![named("r1")]).with_delay(Duration::from_millis(100)),
        );
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );

        handle.start_search("slow", None).await.unwrap();
        assert!(handle.state().loading);

        let state = handle.wait_until_idle().await.unwrap();
        assert!(!state.loading);
        assert_eq!(state.result_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_sets_error_and_clears_loading() {
        let registry = registry_with(
            ServiceKind::Nominatim,
            MockProvider::failing(ProviderError::Network {
                reason: "connection reset".to_string(),
            }),
        );
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );
        let mut events = handle.subscribe();

        handle.start_search("anything", None).await.unwrap();

        assert_eq!(
            next_names(&mut events, 4).await,
            vec![
                "TEXT_SEARCH_STARTED",
                "TEXT_SEARCH_LOADING",
                "TEXT_SEARCH_ERROR",
                "TEXT_SEARCH_LOADING"
            ]
        );
        let state = handle.wait_until_idle().await.unwrap();
        assert!(state.error.unwrap().message.contains("connection reset"));
        assert!(state.results.is_none());
    }

    #[tokio::test]
    async fn test_unregistered_service_surfaces_error() {
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            ProviderRegistry::new(),
            TemplateResolver::default(),
        );

        handle.start_search("anything", None).await.unwrap();
        let state = handle.wait_until_idle().await.unwrap();

        assert!(!state.loading);
        assert_eq!(state.error.unwrap().service.as_deref(), Some("nominatim"));
    }

    #[tokio::test]
    async fn test_stale_search_results_are_dropped() {
        let slow = MockProvider::new(vec![named("stale")]).with_delay(Duration::from_millis(200));
        let fast = MockProvider::new(vec![named("fresh")]);
        let registry = ProviderRegistry::new()
            .with_provider(ServiceKind::from("slow"), Arc::new(slow))
            .with_provider(ServiceKind::from("fast"), Arc::new(fast));
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );

        handle
            .start_search("first", Some(vec![ServiceDescriptor::new("slow")]))
            .await
            .unwrap();
        handle
            .start_search("second", Some(vec![ServiceDescriptor::new("fast")]))
            .await
            .unwrap();

        let state = handle.wait_until_idle().await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        let settled = handle.state();

        assert_eq!(state, settled);
        let results = settled.results.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].properties["name"], "fresh");
    }

    #[tokio::test]
    async fn test_reset_cancels_outstanding_search() {
        let registry = registry_with(
            ServiceKind::Nominatim,
            MockProvider::new(vec![named("late")]).with_delay(Duration::from_millis(100)),
        );
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );

        handle.start_search("late", None).await.unwrap();
        handle.reset_search().await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let state = handle.state();
        assert!(!state.loading);
        assert!(state.results.is_none());
        assert_eq!(state.search_text, "");
    }

    #[tokio::test]
    async fn test_blank_search_does_not_query() {
        let provider = Arc::new(MockProvider::new(vec![named("x")]));
        let registry = ProviderRegistry::new().with_provider(ServiceKind::Nominatim, provider.clone());
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );

        handle.start_search("   ", None).await.unwrap();

        assert!(provider.calls().is_empty());
        assert!(!handle.state().loading);
    }

    #[tokio::test]
    async fn test_select_flat_item() {
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            ProviderRegistry::new(),
            TemplateResolver::default(),
        );
        let mut events = handle.subscribe();

        handle
            .select_item(named("Dinagat"), MapViewContext::new(200, 200, "EPSG:4326"))
            .await
            .unwrap();

        assert_eq!(
            next_names(&mut events, 4).await,
            vec![
                "TEXT_SEARCH_ITEM_SELECTED",
                "CHANGE_MAP_VIEW",
                "TEXT_SEARCH_ADD_MARKER",
                "TEXT_SEARCH_RESULTS_PURGE"
            ]
        );
        let state = handle.state();
        assert_eq!(state.marker_position.map(|p| p.lon), Some(125.6));
        assert!(state.selected_items.is_empty());
    }

    #[tokio::test]
    async fn test_select_nested_item_and_search_within_parent() {
        let streets = Arc::new(MockProvider::new(vec![named("Via Garibaldi")]));
        let registry =
            ProviderRegistry::new().with_provider(ServiceKind::from("streets"), streets.clone());
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );

        let mut cities = ServiceDescriptor::new("cities");
        cities.display_name = Some("${properties.name}".to_string());
        cities.filter_template = Some("CITY = '${properties.name}'".to_string());
        cities.nested_placeholder = Some("Search streets".to_string());
        cities.search_text_template = Some(String::new());
        cities.then = Some(vec![ServiceDescriptor::new("streets")]);
        let city = named("Genova").tagged(&cities);

        let mut events = handle.subscribe();
        handle
            .select_item(city, MapViewContext::new(200, 200, "EPSG:3857"))
            .await
            .unwrap();

        assert_eq!(
            next_names(&mut events, 6).await,
            vec![
                "TEXT_SEARCH_ITEM_SELECTED",
                "CHANGE_MAP_VIEW",
                "TEXT_SEARCH_ADD_MARKER",
                "TEXT_SEARCH_RESULTS_PURGE",
                "TEXT_SEARCH_NESTED_SERVICES_SELECTED",
                "TEXT_SEARCH_TEXT_CHANGE"
            ]
        );

        let state = handle.state();
        assert_eq!(state.selected_items.len(), 1);
        assert_eq!(state.selected_items[0].text, "Genova");
        assert_eq!(state.placeholder(), Some("Search streets"));

        handle.start_search("Garibaldi", None).await.unwrap();
        let state = handle.wait_until_idle().await.unwrap();
        assert_eq!(state.result_count(), 1);

        let calls = streets.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "Garibaldi");
        assert_eq!(calls[0].1.static_filter.as_deref(), Some("CITY = 'Genova'"));

        let crumb = state.selected_items[0].clone();
        handle.cancel_item(crumb).await.unwrap();
        let state = handle.state();
        assert!(state.selected_items.is_empty());
        assert_eq!(state.search_text, "Genova");
    }

    #[tokio::test]
    async fn test_selection_drops_outstanding_search() {
        let cities = MockProvider::new(vec![named("stale city")])
            .with_delay(Duration::from_millis(100));
        let registry = registry_with(ServiceKind::from("cities"), cities);
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );

        let mut city_service = ServiceDescriptor::new("cities");
        city_service.then = Some(vec![ServiceDescriptor::new("streets")]);
        let genova = named("Genova").tagged(&city_service);

        handle
            .start_search("Gen", Some(vec![city_service]))
            .await
            .unwrap();
        assert!(handle.state().loading);

        let mut events = handle.subscribe();
        handle
            .select_item(genova, MapViewContext::new(200, 200, "EPSG:4326"))
            .await
            .unwrap();
        assert_eq!(
            next_names(&mut events, 7).await,
            vec![
                "TEXT_SEARCH_ITEM_SELECTED",
                "CHANGE_MAP_VIEW",
                "TEXT_SEARCH_ADD_MARKER",
                "TEXT_SEARCH_RESULTS_PURGE",
                "TEXT_SEARCH_NESTED_SERVICES_SELECTED",
                "TEXT_SEARCH_TEXT_CHANGE",
                "TEXT_SEARCH_LOADING"
            ]
        );
        assert!(!handle.state().loading);

        tokio::time::sleep(Duration::from_millis(250)).await;
        let state = handle.state();
        assert!(state.results.is_none());
        assert_eq!(state.selected_items.len(), 1);
        assert_eq!(
            state.selected_services.unwrap()[0].kind,
            ServiceKind::from("streets")
        );
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_nested_selection_drops_outstanding_search() {
        let registry = registry_with(
            ServiceKind::Nominatim,
            MockProvider::new(vec![named("late")]).with_delay(Duration::from_millis(100)),
        );
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            registry,
            TemplateResolver::default(),
        );

        handle.start_search("late", None).await.unwrap();
        handle
            .select_nested_services(
                vec![ServiceDescriptor::new("wfs")],
                SelectedItem::new("Liguria", None),
                "",
            )
            .await
            .unwrap();
        assert!(!handle.state().loading);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(handle.state().results.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_stops_store() {
        let handle = spawn_search_store(
            GeoseekConfig::for_testing(),
            ProviderRegistry::new(),
            TemplateResolver::default(),
        );

        handle.shutdown().await.unwrap();
        let result = handle.change_search_text("after").await;
        assert!(matches!(result, Err(crate::SearchError::StoreShutdown)));
    }
}
