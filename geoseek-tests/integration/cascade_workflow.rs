//! Country, then city, then street drill-down.

use std::sync::Arc;

use geoseek_core::{MapViewContext, SelectedItem, ServiceDescriptor};
use geoseek_core::provider::MockProvider;

use crate::common::{named, registry, result_names, spawn};

fn street_service() -> ServiceDescriptor {
    ServiceDescriptor::new("streets")
}

fn city_service() -> ServiceDescriptor {
    let mut cities = ServiceDescriptor::new("cities");
    cities.display_name = Some("${properties.name}".to_string());
    cities.filter_template = Some("CITY = '${properties.name}'".to_string());
    cities.nested_placeholder = Some("Search a street".to_string());
    cities.search_text_template = Some(String::new());
    cities.then = Some(vec![street_service()]);
    cities
}

fn country_service() -> ServiceDescriptor {
    let mut countries = ServiceDescriptor::new("countries");
    countries.display_name = Some("${properties.name}".to_string());
    countries.filter_template = Some(" AND COUNTRY = '${properties.name}'".to_string());
    countries.nested_placeholder = Some("Search a city".to_string());
    countries.search_text_template = Some(String::new());
    countries.then = Some(vec![city_service()]);
    countries
}

#[tokio::test]
async fn test_three_level_cascade() {
    let countries = Arc::new(MockProvider::new(vec![named("Italy", 12.5, 42.5)]));
    let cities = Arc::new(MockProvider::new(vec![named("Genova", 8.93, 44.41)]));
    let streets = Arc::new(MockProvider::new(vec![named("Via Garibaldi", 8.93, 44.41)]));
    let handle = spawn(registry(vec![
        ("countries", countries.clone()),
        ("cities", cities.clone()),
        ("streets", streets.clone()),
    ]));
    let map = MapViewContext::new(400, 300, "EPSG:3857");

    handle
        .start_search("Ital", Some(vec![country_service()]))
        .await
        .unwrap();
    let state = handle.wait_until_idle().await.unwrap();
    let italy = state.results.unwrap()[0].clone();

    handle.select_item(italy, map.clone()).await.unwrap();
    let state = handle.state();
    assert_eq!(state.selected_items.len(), 1);
    assert_eq!(state.placeholder(), Some("Search a city"));
    assert_eq!(state.search_text, "");
    assert!(state.results.is_none());

    handle.start_search("Gen", None).await.unwrap();
    let state = handle.wait_until_idle().await.unwrap();
    assert_eq!(result_names(state.results.as_deref().unwrap()), vec!["Genova"]);
    assert_eq!(
        cities.calls()[0].1.static_filter.as_deref(),
        Some(" AND COUNTRY = 'Italy'")
    );
    let genova = state.results.unwrap()[0].clone();

    handle.select_item(genova, map).await.unwrap();
    let state = handle.state();
    let trail: Vec<&str> = state
        .selected_items
        .iter()
        .map(|item| item.text.as_str())
        .collect();
    assert_eq!(trail, vec!["Italy", "Genova"]);
    assert_eq!(state.placeholder(), Some("Search a street"));

    handle.start_search("Garibaldi", None).await.unwrap();
    let state = handle.wait_until_idle().await.unwrap();
    assert_eq!(result_names(state.results.as_deref().unwrap()), vec!["Via Garibaldi"]);

    let street_calls = streets.calls();
    assert_eq!(street_calls.len(), 1);
    assert_eq!(street_calls[0].0, "Garibaldi");
    assert_eq!(
        street_calls[0].1.static_filter.as_deref(),
        Some("CITY = 'Genova'")
    );
    assert_eq!(countries.calls().len(), 1);

    let genova_crumb = state.selected_items[1].clone();
    handle.cancel_item(genova_crumb).await.unwrap();
    let state = handle.state();
    assert_eq!(state.selected_items.len(), 1);
    assert_eq!(state.selected_items[0].text, "Italy");
    assert_eq!(state.search_text, "Genova");
}

#[tokio::test]
async fn test_nested_search_text_defaults_to_display_text() {
    let mut countries = country_service();
    countries.search_text_template = None;
    let handle = spawn(registry(vec![(
        "countries",
        Arc::new(MockProvider::new(vec![named("France", 2.35, 48.85)])),
    )]));

    handle
        .start_search("Fra", Some(vec![countries]))
        .await
        .unwrap();
    let state = handle.wait_until_idle().await.unwrap();
    let france = state.results.unwrap()[0].clone();

    handle
        .select_item(france, MapViewContext::new(200, 200, "EPSG:4326"))
        .await
        .unwrap();

    let state = handle.state();
    assert_eq!(state.search_text, "France");
    assert_eq!(state.selected_items[0].text, "France");
}

#[tokio::test]
async fn test_parent_resolved_from_active_services_by_id() {
    let mut parent = country_service();
    parent.id = Some("countries-layer".to_string());

    // Result tagged without its nested list, as a provider might echo it.
    let mut echoed = ServiceDescriptor::new("countries");
    echoed.id = Some("countries-layer".to_string());
    let spain = named("Spain", -3.7, 40.4).tagged(&echoed);

    let handle = spawn(registry(Vec::new()));
    handle
        .select_nested_services(vec![parent], SelectedItem::new("Europe", None), "")
        .await
        .unwrap();

    handle
        .select_item(spain, MapViewContext::new(200, 200, "EPSG:4326"))
        .await
        .unwrap();

    let state = handle.state();
    assert_eq!(state.selected_items.len(), 2);
    assert_eq!(state.selected_items[1].text, "Spain");
    let services = state.selected_services.unwrap();
    assert_eq!(services[0].kind.as_str(), "cities");
    assert_eq!(
        services[0].options.static_filter.as_deref(),
        Some(" AND COUNTRY = 'Spain'")
    );
}
