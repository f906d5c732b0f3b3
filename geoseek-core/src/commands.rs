//! Command vocabulary flowing through the search store.
//!
//! Presentation code sends the initiating commands (text search, item
//! selection, cancel). The orchestrator answers with derived commands that
//! re-enter the store and are folded into the search state.

use serde::{Deserialize, Serialize};

use crate::types::{
    ErrorInfo, GeoPoint, MapView, MapViewContext, SearchResult, SelectedItem, ServiceDescriptor,
};

/// A discrete intent or fact handled by the search store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Command {
    /// Run a text search against the given services, or the active ones.
    SearchStarted {
        search_text: String,
        services: Option<Vec<ServiceDescriptor>>,
    },
    /// At least one provider query is outstanding.
    Loading { loading: bool },
    /// The last query batch failed.
    Error { error: ErrorInfo },
    /// A batch of results arrived.
    ResultsLoaded {
        results: Vec<SearchResult>,
        append: bool,
        services: Option<Vec<ServiceDescriptor>>,
    },
    ResultsPurge,
    Reset,
    AddMarker { position: GeoPoint },
    TextChange { search_text: String },
    /// A result was picked from the list.
    ItemSelected {
        item: Box<SearchResult>,
        map_view: MapViewContext,
    },
    /// Drill into the nested services of a selected result.
    NestedServicesSelected {
        services: Vec<ServiceDescriptor>,
        items: SelectedItem,
        search_text: String,
    },
    CancelItem { item: SelectedItem },
    /// Recenter the map viewport.
    ChangeMapView { view: MapView },
}

impl Command {
    pub fn start_search(
        search_text: impl Into<String>,
        services: Option<Vec<ServiceDescriptor>>,
    ) -> Self {
        Command::SearchStarted {
            search_text: search_text.into(),
            services,
        }
    }

    pub fn search_loading(loading: bool) -> Self {
        Command::Loading { loading }
    }

    pub fn search_error(error: ErrorInfo) -> Self {
        Command::Error { error }
    }

    pub fn search_results_loaded(
        results: Vec<SearchResult>,
        append: bool,
        services: Option<Vec<ServiceDescriptor>>,
    ) -> Self {
        Command::ResultsLoaded {
            results,
            append,
            services,
        }
    }

    pub fn purge_results() -> Self {
        Command::ResultsPurge
    }

    pub fn reset_search() -> Self {
        Command::Reset
    }

    pub fn add_marker(position: GeoPoint) -> Self {
        Command::AddMarker { position }
    }

    pub fn change_search_text(search_text: impl Into<String>) -> Self {
        Command::TextChange {
            search_text: search_text.into(),
        }
    }

    pub fn select_item(item: SearchResult, map_view: MapViewContext) -> Self {
        Command::ItemSelected {
            item: Box::new(item),
            map_view,
        }
    }

    pub fn select_nested_services(
        services: Vec<ServiceDescriptor>,
        items: SelectedItem,
        search_text: impl Into<String>,
    ) -> Self {
        Command::NestedServicesSelected {
            services,
            items,
            search_text: search_text.into(),
        }
    }

    pub fn cancel_item(item: SelectedItem) -> Self {
        Command::CancelItem { item }
    }

    pub fn change_map_view(view: MapView) -> Self {
        Command::ChangeMapView { view }
    }

    /// Stable action name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::SearchStarted { .. } => "TEXT_SEARCH_STARTED",
            Command::Loading { .. } => "TEXT_SEARCH_LOADING",
            Command::Error { .. } => "TEXT_SEARCH_ERROR",
            Command::ResultsLoaded { .. } => "TEXT_SEARCH_RESULTS_LOADED",
            Command::ResultsPurge => "TEXT_SEARCH_RESULTS_PURGE",
            Command::Reset => "TEXT_SEARCH_RESET",
            Command::AddMarker { .. } => "TEXT_SEARCH_ADD_MARKER",
            Command::TextChange { .. } => "TEXT_SEARCH_TEXT_CHANGE",
            Command::ItemSelected { .. } => "TEXT_SEARCH_ITEM_SELECTED",
            Command::NestedServicesSelected { .. } => "TEXT_SEARCH_NESTED_SERVICES_SELECTED",
            Command::CancelItem { .. } => "TEXT_SEARCH_CANCEL_ITEM",
            Command::ChangeMapView { .. } => "CHANGE_MAP_VIEW",
        }
    }
}
