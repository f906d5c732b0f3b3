//! The two orchestration processes: text search and item selection.

use std::cmp::Reverse;
use std::sync::Arc;

use futures::future::join_all;

use crate::commands::Command;
use crate::config::GeoseekConfig;
use crate::display::fallback_title;
use crate::geometry::map_view_for;
use crate::provider::ProviderRegistry;
use crate::state::SearchState;
use crate::template::TemplateResolver;
use crate::types::{MapViewContext, SearchResult, SelectedItem, ServiceDescriptor};

/// Picks the services a text search runs against.
///
/// Explicit services win, then the services activated by drilling down,
/// then the configured defaults.
pub fn resolve_services(
    requested: Option<&[ServiceDescriptor]>,
    state: &SearchState,
    config: &GeoseekConfig,
) -> Vec<ServiceDescriptor> {
    requested
        .or_else(|| {
            state
                .selected_services
                .as_deref()
                .filter(|services| !services.is_empty())
        })
        .unwrap_or(config.search.default_services.as_slice())
        .to_vec()
}

/// Queries every service and folds the answers into result commands.
///
/// Results keep the configured service order, then sort by descending
/// priority. Any provider failure fails the whole batch.
pub(crate) async fn run_text_search(
    registry: Arc<ProviderRegistry>,
    search_text: String,
    services: Vec<ServiceDescriptor>,
    max_results: Option<usize>,
) -> Vec<Command> {
    let queries = services.iter().map(|service| {
        let registry = &registry;
        let search_text = &search_text;
        async move {
            registry
                .search(&service.kind, search_text, &service.options)
                .await
                .map(|results| {
                    results
                        .into_iter()
                        .map(|result| result.tagged(service))
                        .collect::<Vec<_>>()
                })
                .map_err(|error| (service.label(), error))
        }
    });

    let batches = join_all(queries)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>();

    match batches {
        Ok(batches) => {
            let mut results: Vec<SearchResult> = batches.into_iter().flatten().collect();
            results.sort_by_key(|result| Reverse(result.priority));
            if let Some(max_results) = max_results {
                results.truncate(max_results);
            }

            tracing::info!(
                "Search '{}' returned {} results from {} services",
                search_text,
                results.len(),
                services.len()
            );
            vec![
                Command::search_results_loaded(results, false, Some(services)),
                Command::search_loading(false),
            ]
        }
        Err((service, error)) => {
            tracing::warn!(
                "Search '{}' failed on service {}: {}",
                search_text,
                service,
                error
            );
            vec![
                Command::search_error(error.to_error_info(Some(service))),
                Command::search_loading(false),
            ]
        }
    }
}

/// Finds the descriptor whose nested services a selected item activates.
///
/// The item's own service tag is used when it carries a `then` list;
/// otherwise the active services are searched by id, then by type.
pub fn resolve_nested_parent(
    item: &SearchResult,
    state: &SearchState,
    config: &GeoseekConfig,
) -> Option<ServiceDescriptor> {
    let tag = item.service.as_ref()?;
    if tag.nested().is_some() {
        return Some(tag.clone());
    }

    let active = resolve_services(None, state, config);
    let by_id = tag.id.as_ref().and_then(|id| {
        active
            .iter()
            .find(|service| service.id.as_ref() == Some(id) && service.nested().is_some())
    });

    by_id
        .or_else(|| {
            active
                .iter()
                .find(|service| service.kind == tag.kind && service.nested().is_some())
        })
        .cloned()
}

/// Commands following the selection of `item`.
///
/// Recenter, marker and purge always come first; the nested drill-down
/// commands follow only when a parent descriptor with nested services
/// resolves.
pub(crate) fn select_item(
    item: &SearchResult,
    context: &MapViewContext,
    state: &SearchState,
    config: &GeoseekConfig,
    resolver: &TemplateResolver,
) -> Vec<Command> {
    let mut commands = Vec::with_capacity(5);

    match map_view_for(item, context, config.map.max_zoom) {
        Some(view) => commands.push(Command::change_map_view(view)),
        None => tracing::debug!("Selected item has no location, map view unchanged"),
    }
    if let Some(position) = item.position() {
        commands.push(Command::add_marker(position));
    }
    commands.push(Command::purge_results());

    let Some(parent) = resolve_nested_parent(item, state, config) else {
        return commands;
    };
    let nested = parent.nested().unwrap_or_default();

    let record = item.to_record();
    let static_filter = parent
        .filter_template
        .as_deref()
        .map(|template| resolver.compile(template).render(&record));

    let services: Vec<ServiceDescriptor> = nested
        .iter()
        .map(|service| {
            let mut service = service.clone();
            if let Some(filter) = &static_filter {
                service.options.static_filter = Some(filter.clone());
            }
            service
        })
        .collect();

    let text = parent
        .display_name
        .as_deref()
        .map(|template| resolver.compile(template).render(&record))
        .unwrap_or_else(|| fallback_title(item));
    let search_text = parent
        .search_text_template
        .as_deref()
        .map(|template| resolver.compile(template).render(&record))
        .unwrap_or_else(|| text.clone());

    tracing::info!(
        "Drilling into {} nested services below '{}'",
        services.len(),
        text
    );

    let breadcrumb = SelectedItem::new(text, parent.nested_placeholder.clone());
    commands.push(Command::select_nested_services(
        services,
        breadcrumb,
        search_text.clone(),
    ));
    commands.push(Command::change_search_text(search_text));
    commands
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::{Map, json};

    use super::*;
    use crate::provider::{MockProvider, ProviderError};
    use crate::types::ServiceKind;

    fn named(name: &str) -> SearchResult {
        let mut properties = Map::new();
        properties.insert("name".to_string(), json!(name));
        SearchResult::at_point(0.0, 0.0, properties)
    }

    fn names(command: &Command) -> Vec<String> {
        match command {
            Command::ResultsLoaded { results, .. } => results
                .iter()
                .filter_map(|r| r.properties.get("name").and_then(|v| v.as_str()))
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_resolve_services_precedence() {
        let config = GeoseekConfig::default();
        let mut state = SearchState::default();
        let explicit = vec![ServiceDescriptor::new("wfs")];

        assert_eq!(
            resolve_services(Some(explicit.as_slice()), &state, &config)[0].kind,
            ServiceKind::Wfs
        );
        assert_eq!(
            resolve_services(None, &state, &config)[0].kind,
            ServiceKind::Nominatim
        );

        state.selected_services = Some(vec![ServiceDescriptor::new("photon")]);
        assert_eq!(
            resolve_services(None, &state, &config)[0].kind,
            ServiceKind::from("photon")
        );

        state.selected_services = Some(Vec::new());
        assert_eq!(
            resolve_services(None, &state, &config)[0].kind,
            ServiceKind::Nominatim
        );
    }

    #[tokio::test]
    async fn test_results_follow_service_order_not_arrival() {
        let slow = Arc::new(
            MockProvider::new(vec![named("slow")]).with_delay(Duration::from_millis(50)),
        );
        let fast = Arc::new(MockProvider::new(vec![named("fast")]));
        let registry = ProviderRegistry::new()
            .with_provider(ServiceKind::from("slow"), slow)
            .with_provider(ServiceKind::from("fast"), fast);

        let commands = run_text_search(
            Arc::new(registry),
            "x".to_string(),
            vec![ServiceDescriptor::new("slow"), ServiceDescriptor::new("fast")],
            None,
        )
        .await;

        assert_eq!(names(&commands[0]), vec!["slow", "fast"]);
        assert_eq!(commands[1], Command::search_loading(false));
    }

    #[tokio::test]
    async fn test_priority_and_max_results() {
        let low = Arc::new(MockProvider::new(vec![named("low1"), named("low2")]));
        let high = Arc::new(MockProvider::new(vec![named("high")]));
        let registry = ProviderRegistry::new()
            .with_provider(ServiceKind::from("low"), low)
            .with_provider(ServiceKind::from("high"), high);
        let mut preferred = ServiceDescriptor::new("high");
        preferred.priority = 5;

        let commands = run_text_search(
            Arc::new(registry),
            "x".to_string(),
            vec![ServiceDescriptor::new("low"), preferred],
            Some(2),
        )
        .await;

        assert_eq!(names(&commands[0]), vec!["high", "low1"]);
    }

    #[tokio::test]
    async fn test_failure_fails_whole_batch() {
        let ok = Arc::new(MockProvider::new(vec![named("ok")]));
        let broken = Arc::new(MockProvider::failing(ProviderError::Network {
            reason: "timeout".to_string(),
        }));
        let registry = ProviderRegistry::new()
            .with_provider(ServiceKind::Nominatim, ok)
            .with_provider(ServiceKind::Wfs, broken);

        let commands = run_text_search(
            Arc::new(registry),
            "x".to_string(),
            vec![
                ServiceDescriptor::new(ServiceKind::Nominatim),
                ServiceDescriptor::new(ServiceKind::Wfs),
            ],
            None,
        )
        .await;

        match &commands[0] {
            Command::Error { error } => {
                assert_eq!(error.service.as_deref(), Some("wfs"));
                assert!(error.message.contains("timeout"));
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(commands[1], Command::search_loading(false));
    }

    #[test]
    fn test_nested_parent_resolution_by_id_and_type() {
        let mut parent = ServiceDescriptor::new("wfs");
        parent.id = Some("countries".to_string());
        parent.then = Some(vec![ServiceDescriptor::new("wfs")]);
        let config = GeoseekConfig::default();
        let state = SearchState {
            selected_services: Some(vec![parent.clone()]),
            ..Default::default()
        };

        let mut tag = ServiceDescriptor::new("wfs");
        tag.id = Some("countries".to_string());
        let item = named("Italy").tagged(&tag);
        assert_eq!(resolve_nested_parent(&item, &state, &config), Some(parent.clone()));

        let item = named("Italy").tagged(&ServiceDescriptor::new("wfs"));
        assert_eq!(resolve_nested_parent(&item, &state, &config), Some(parent));

        let item = named("Italy").tagged(&ServiceDescriptor::new("nominatim"));
        assert!(resolve_nested_parent(&item, &state, &config).is_none());
        assert!(resolve_nested_parent(&named("untagged"), &state, &config).is_none());
    }

    #[test]
    fn test_select_item_without_nested_services() {
        let item = named("Rome").tagged(&ServiceDescriptor::new(ServiceKind::Nominatim));
        let commands = select_item(
            &item,
            &MapViewContext::new(200, 200, "EPSG:4326"),
            &SearchState::default(),
            &GeoseekConfig::default(),
            &TemplateResolver::default(),
        );

        let names: Vec<_> = commands.iter().map(Command::name).collect();
        assert_eq!(
            names,
            vec![
                "CHANGE_MAP_VIEW",
                "TEXT_SEARCH_ADD_MARKER",
                "TEXT_SEARCH_RESULTS_PURGE"
            ]
        );
    }

    #[test]
    fn test_select_item_with_nested_services() {
        let mut parent = ServiceDescriptor::new("wfs");
        parent.display_name = Some("${properties.name}".to_string());
        parent.filter_template = Some(" AND CITY = '${properties.name}'".to_string());
        parent.nested_placeholder = Some("Search streets".to_string());
        parent.search_text_template = Some("${properties.name} ".to_string());
        parent.then = Some(vec![ServiceDescriptor::new("wfs")]);
        let item = named("Genova").tagged(&parent);

        let commands = select_item(
            &item,
            &MapViewContext::new(200, 200, "EPSG:4326"),
            &SearchState::default(),
            &GeoseekConfig::default(),
            &TemplateResolver::default(),
        );

        assert_eq!(commands.len(), 5);
        match &commands[3] {
            Command::NestedServicesSelected {
                services,
                items,
                search_text,
            } => {
                assert_eq!(
                    services[0].options.static_filter.as_deref(),
                    Some(" AND CITY = 'Genova'")
                );
                assert_eq!(items.text, "Genova");
                assert_eq!(items.placeholder.as_deref(), Some("Search streets"));
                assert_eq!(search_text, "Genova ");
            }
            other => panic!("expected nested services, got {other:?}"),
        }
        assert_eq!(commands[4], Command::change_search_text("Genova "));
    }

    #[test]
    fn test_search_text_falls_back_to_display_text() {
        let mut parent = ServiceDescriptor::new("wfs");
        parent.then = Some(vec![ServiceDescriptor::new("wfs")]);
        let item = named("Lyon").tagged(&parent);

        let commands = select_item(
            &item,
            &MapViewContext::new(200, 200, "EPSG:4326"),
            &SearchState::default(),
            &GeoseekConfig::default(),
            &TemplateResolver::default(),
        );

        assert_eq!(commands.last(), Some(&Command::change_search_text("Lyon")));
    }
}
