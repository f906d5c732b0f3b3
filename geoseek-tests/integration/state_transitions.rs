//! Pure state transitions driven through `apply`.

use geoseek_core::{Command, SearchState, SelectedItem, ServiceDescriptor, apply};

use crate::common::{named, result_names};

fn fold(commands: &[Command]) -> SearchState {
    commands
        .iter()
        .fold(SearchState::default(), |state, command| apply(&state, command))
}

#[test]
fn test_fresh_load_replaces_results() {
    let state = fold(&[
        Command::search_results_loaded(vec![named("old", 0.0, 0.0)], false, None),
        Command::search_results_loaded(
            vec![named("r1", 0.0, 0.0), named("r2", 0.0, 0.0)],
            false,
            None,
        ),
    ]);
    assert_eq!(result_names(state.results.as_deref().unwrap()), vec!["r1", "r2"]);
}

#[test]
fn test_append_load_concatenates() {
    let state = fold(&[
        Command::search_results_loaded(
            vec![named("r1", 0.0, 0.0), named("r2", 0.0, 0.0)],
            false,
            None,
        ),
        Command::search_results_loaded(
            vec![named("r3", 0.0, 0.0), named("r4", 0.0, 0.0)],
            true,
            None,
        ),
    ]);
    assert_eq!(
        result_names(state.results.as_deref().unwrap()),
        vec!["r1", "r2", "r3", "r4"]
    );
    assert!(state.append_mode);
}

#[test]
fn test_fresh_load_clears_error() {
    let state = fold(&[
        Command::search_error(geoseek_core::ErrorInfo::new("timeout")),
        Command::search_results_loaded(Vec::new(), false, None),
    ]);
    assert!(state.error.is_none());
    assert_eq!(state.result_count(), 0);
}

#[test]
fn test_nested_selection_twice_replaces_services() {
    let services = vec![ServiceDescriptor::new("streets"), ServiceDescriptor::new("wfs")];
    let item = SelectedItem::new("Genova", Some("Search a street".to_string()));
    let command = Command::select_nested_services(services.clone(), item, "");

    let once = apply(&SearchState::default(), &command);
    assert_eq!(once.selected_items.len(), 1);
    assert_eq!(once.selected_services.as_ref().map(Vec::len), Some(2));

    let twice = apply(&once, &command);
    assert_eq!(twice.selected_items.len(), 2);
    assert_eq!(twice.selected_services.as_ref().map(Vec::len), Some(2));
}

#[test]
fn test_cancel_last_breadcrumb_restores_text() {
    let first = SelectedItem::new("Italy", None);
    let second = SelectedItem::new("Genova", None);
    let state = fold(&[
        Command::select_nested_services(Vec::new(), first.clone(), ""),
        Command::select_nested_services(Vec::new(), second.clone(), ""),
        Command::change_search_text("Via"),
    ]);

    let cancelled = apply(&state, &Command::cancel_item(second));
    assert_eq!(cancelled.selected_items, vec![first]);
    assert_eq!(cancelled.search_text, "Genova");
}

#[test]
fn test_reset_keeps_breadcrumbs() {
    let crumb = SelectedItem::new("Italy", None);
    let state = fold(&[
        Command::select_nested_services(vec![ServiceDescriptor::new("cities")], crumb.clone(), ""),
        Command::change_search_text("Gen"),
        Command::search_loading(true),
        Command::add_marker(geoseek_core::GeoPoint::new(8.9, 44.4)),
        Command::reset_search(),
    ]);

    assert_eq!(state.search_text, "");
    assert!(!state.loading);
    assert!(state.marker_position.is_none());
    assert_eq!(state.selected_items, vec![crumb]);
    assert!(state.selected_services.is_some());
}
