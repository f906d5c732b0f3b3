//! Handle for communicating with the search store actor.

use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::actor::StoreMessage;
use crate::commands::Command;
use crate::state::SearchState;
use crate::types::{MapViewContext, SearchResult, SelectedItem, ServiceDescriptor};
use crate::{Result, SearchError};

/// Handle for communicating with the search store actor.
///
/// This handle is what presentation code talks to: it sends the initiating
/// commands and reads back state. It can be cloned and shared freely.
#[derive(Debug, Clone)]
pub struct SearchHandle {
    sender: mpsc::Sender<StoreMessage>,
    state: watch::Receiver<SearchState>,
    events: broadcast::Sender<Command>,
}

impl SearchHandle {
    pub(crate) fn new(
        sender: mpsc::Sender<StoreMessage>,
        state: watch::Receiver<SearchState>,
        events: broadcast::Sender<Command>,
    ) -> Self {
        Self {
            sender,
            state,
            events,
        }
    }

    /// Sends a command and waits until it has been applied.
    ///
    /// Commands derived synchronously from `command` (for example the
    /// `LOADING(true)` following a search start) are applied before this
    /// returns. Provider answers arrive later.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store actor has stopped
    pub async fn dispatch(&self, command: Command) -> Result<()> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(StoreMessage::Dispatch { command, responder })
            .await
            .map_err(|_| SearchError::StoreShutdown)?;

        rx.await.map_err(|_| SearchError::StoreShutdown)
    }

    /// Starts a text search on `services`, or on the active services.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store actor has stopped
    pub async fn start_search(
        &self,
        search_text: &str,
        services: Option<Vec<ServiceDescriptor>>,
    ) -> Result<()> {
        self.dispatch(Command::start_search(search_text, services))
            .await
    }

    /// Updates the text shown in the search box.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store actor has stopped
    pub async fn change_search_text(&self, text: &str) -> Result<()> {
        self.dispatch(Command::change_search_text(text)).await
    }

    /// Clears the result list.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store actor has stopped
    pub async fn purge_results(&self) -> Result<()> {
        self.dispatch(Command::purge_results()).await
    }

    /// Returns the query state to idle, cancelling any outstanding search.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store actor has stopped
    pub async fn reset_search(&self) -> Result<()> {
        self.dispatch(Command::reset_search()).await
    }

    /// Selects a result: recenters the map and drills down if possible.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store actor has stopped
    pub async fn select_item(&self, item: SearchResult, map_view: MapViewContext) -> Result<()> {
        self.dispatch(Command::select_item(item, map_view)).await
    }

    /// Activates nested services directly.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store actor has stopped
    pub async fn select_nested_services(
        &self,
        services: Vec<ServiceDescriptor>,
        items: SelectedItem,
        search_text: &str,
    ) -> Result<()> {
        self.dispatch(Command::select_nested_services(
            services,
            items,
            search_text,
        ))
        .await
    }

    /// Removes a breadcrumb and restores its text into the search box.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store actor has stopped
    pub async fn cancel_item(&self, item: SelectedItem) -> Result<()> {
        self.dispatch(Command::cancel_item(item)).await
    }

    /// Current state snapshot.
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn watch_state(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }

    /// Subscribes to every command processed from now on, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<Command> {
        self.events.subscribe()
    }

    /// Waits until no provider query is outstanding and returns the state.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store stopped while loading
    pub async fn wait_until_idle(&self) -> Result<SearchState> {
        let mut state = self.state.clone();
        let idle = state
            .wait_for(|state| !state.loading)
            .await
            .map_err(|_| SearchError::StoreShutdown)?;
        Ok(idle.clone())
    }

    /// Stops the store actor.
    ///
    /// # Errors
    /// - `SearchError::StoreShutdown` - The store had already stopped
    pub async fn shutdown(&self) -> Result<()> {
        let (responder, rx) = oneshot::channel();
        self.sender
            .send(StoreMessage::Shutdown { responder })
            .await
            .map_err(|_| SearchError::StoreShutdown)?;

        rx.await.map_err(|_| SearchError::StoreShutdown)
    }
}
