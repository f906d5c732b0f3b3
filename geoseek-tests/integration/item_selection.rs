//! Map recenter and marker on selection.

use geoseek_core::{Command, GeoPoint, MapViewContext, ServiceDescriptor};

use crate::common::{named, names, next_commands, registry, spawn};

#[tokio::test]
async fn test_flat_selection_recenters_marks_and_purges() {
    let handle = spawn(registry(Vec::new()));
    let mut events = handle.subscribe();

    handle
        .select_item(
            named("Dinagat Islands", 125.6, 10.1),
            MapViewContext::new(200, 200, "EPSG:4326"),
        )
        .await
        .unwrap();

    let commands = next_commands(&mut events, 4).await;
    assert_eq!(
        names(&commands),
        vec![
            "TEXT_SEARCH_ITEM_SELECTED",
            "CHANGE_MAP_VIEW",
            "TEXT_SEARCH_ADD_MARKER",
            "TEXT_SEARCH_RESULTS_PURGE"
        ]
    );

    let Command::ChangeMapView { view } = &commands[1] else {
        panic!("expected a map view change, got {}", commands[1].name());
    };
    assert_eq!(view.center, GeoPoint::new(125.6, 10.1));
    assert_eq!(view.projection, "EPSG:4326");
    assert_eq!(view.size.width, 200);

    let state = handle.state();
    assert_eq!(state.marker_position, Some(GeoPoint::new(125.6, 10.1)));
    assert!(state.selected_items.is_empty());
    assert!(state.selected_services.is_none());
}

#[tokio::test]
async fn test_service_without_then_does_not_drill_down() {
    let mut flat = ServiceDescriptor::new("nominatim");
    flat.filter_template = Some("ID = ${id}".to_string());
    let handle = spawn(registry(Vec::new()));
    let mut events = handle.subscribe();

    handle
        .select_item(
            named("Dinagat Islands", 125.6, 10.1).tagged(&flat),
            MapViewContext::new(200, 200, "EPSG:4326"),
        )
        .await
        .unwrap();
    handle.change_search_text("marker").await.unwrap();

    let commands = next_commands(&mut events, 5).await;
    assert_eq!(
        names(&commands)[4],
        "TEXT_SEARCH_TEXT_CHANGE",
        "no nested commands between the purge and the next dispatch"
    );
}

#[tokio::test]
async fn test_nested_filter_resolved_from_item_properties() {
    let mut regions = ServiceDescriptor::new("regions");
    regions.filter_template = Some("REGION = '${properties.name}'".to_string());
    regions.then = Some(vec![ServiceDescriptor::new("wfs")]);
    let handle = spawn(registry(Vec::new()));
    let mut events = handle.subscribe();

    handle
        .select_item(
            named("Liguria", 8.9, 44.4).tagged(&regions),
            MapViewContext::new(200, 200, "EPSG:4326"),
        )
        .await
        .unwrap();

    let commands = next_commands(&mut events, 6).await;
    let Command::NestedServicesSelected {
        services,
        items,
        search_text,
    } = &commands[4]
    else {
        panic!("expected nested services, got {}", commands[4].name());
    };
    assert_eq!(
        services[0].options.static_filter.as_deref(),
        Some("REGION = 'Liguria'")
    );
    assert_eq!(items.text, "Liguria");
    assert_eq!(search_text, "Liguria");
    assert!(matches!(
        &commands[5],
        Command::TextChange { search_text } if search_text == "Liguria"
    ));
}
