//! Search state snapshot and its transition function.

use serde::{Deserialize, Serialize};

use crate::commands::Command;
use crate::types::{ErrorInfo, GeoPoint, SearchResult, SelectedItem, ServiceDescriptor};

/// Immutable snapshot of the search feature.
///
/// A new snapshot is produced for every command; nothing is mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchState {
    pub search_text: String,
    pub loading: bool,
    pub error: Option<ErrorInfo>,
    /// `None` until a query has completed, `Some(vec![])` for no matches.
    pub results: Option<Vec<SearchResult>>,
    pub append_mode: bool,
    /// Drill-down breadcrumbs, outermost first.
    pub selected_items: Vec<SelectedItem>,
    pub selected_services: Option<Vec<ServiceDescriptor>>,
    pub marker_position: Option<GeoPoint>,
}

impl SearchState {
    /// Number of results currently listed.
    pub fn result_count(&self) -> usize {
        self.results.as_ref().map_or(0, Vec::len)
    }

    /// The innermost breadcrumb, which is the one presentation cancels.
    pub fn last_selected_item(&self) -> Option<&SelectedItem> {
        self.selected_items.last()
    }

    /// Placeholder for the search box at the current drill-down depth.
    pub fn placeholder(&self) -> Option<&str> {
        self.last_selected_item()
            .and_then(|item| item.placeholder.as_deref())
    }
}

/// Computes the next state for `command`.
///
/// Pure and total: commands without a state effect yield an unchanged copy.
pub fn apply(state: &SearchState, command: &Command) -> SearchState {
    match command {
        Command::Loading { loading } => SearchState {
            loading: *loading,
            ..state.clone()
        },
        Command::Error { error } => SearchState {
            error: Some(error.clone()),
            ..state.clone()
        },
        Command::ResultsLoaded {
            results, append, ..
        } => {
            if *append {
                let mut combined = state.results.clone().unwrap_or_default();
                combined.extend(results.iter().cloned());
                SearchState {
                    results: Some(combined),
                    append_mode: true,
                    ..state.clone()
                }
            } else {
                SearchState {
                    results: Some(results.clone()),
                    error: None,
                    append_mode: false,
                    ..state.clone()
                }
            }
        }
        Command::ResultsPurge => SearchState {
            results: None,
            append_mode: false,
            ..state.clone()
        },
        Command::Reset => SearchState {
            search_text: String::new(),
            loading: false,
            error: None,
            results: None,
            append_mode: false,
            marker_position: None,
            ..state.clone()
        },
        Command::AddMarker { position } => SearchState {
            marker_position: Some(*position),
            ..state.clone()
        },
        Command::TextChange { search_text } => SearchState {
            search_text: search_text.clone(),
            ..state.clone()
        },
        Command::NestedServicesSelected {
            services,
            items,
            search_text,
        } => {
            let mut selected_items = state.selected_items.clone();
            selected_items.push(items.clone());
            SearchState {
                selected_services: Some(services.clone()),
                selected_items,
                search_text: search_text.clone(),
                ..state.clone()
            }
        }
        Command::CancelItem { item } => SearchState {
            selected_items: state
                .selected_items
                .iter()
                .filter(|selected| selected.id != item.id)
                .cloned()
                .collect(),
            search_text: item.text.clone(),
            ..state.clone()
        },
        Command::SearchStarted { .. }
        | Command::ItemSelected { .. }
        | Command::ChangeMapView { .. } => state.clone(),
    }
}
