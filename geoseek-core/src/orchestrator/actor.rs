//! Actor implementation for the search store.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::handle::SearchHandle;
use super::processes::{resolve_services, run_text_search, select_item};
use crate::commands::Command;
use crate::config::GeoseekConfig;
use crate::provider::ProviderRegistry;
use crate::state::{SearchState, apply};
use crate::template::TemplateResolver;
use crate::types::ServiceDescriptor;

/// Messages accepted by the store actor.
pub(crate) enum StoreMessage {
    /// Process a command; the responder fires once it and every command it
    /// derived synchronously have been applied.
    Dispatch {
        command: Command,
        responder: oneshot::Sender<()>,
    },
    /// Stop the actor, aborting any outstanding search.
    Shutdown { responder: oneshot::Sender<()> },
}

/// Command emitted by a search task, tagged with the search it belongs to.
struct Feedback {
    generation: u64,
    command: Command,
}

/// State owned by the actor task.
struct SearchStore {
    config: GeoseekConfig,
    registry: Arc<ProviderRegistry>,
    resolver: TemplateResolver,
    state: SearchState,
    state_sender: watch::Sender<SearchState>,
    event_sender: broadcast::Sender<Command>,
    feedback_sender: mpsc::UnboundedSender<Feedback>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

/// Spawns the search store actor and returns its handle.
///
/// The actor owns the search state and processes commands one by one in
/// order, so the state never needs a lock.
///
/// # Examples
/// ```rust,no_run
/// # #[tokio::main]
/// # async fn main() {
/// use geoseek_core::{GeoseekConfig, ProviderRegistry, TemplateResolver, spawn_search_store};
///
/// let handle = spawn_search_store(
///     GeoseekConfig::default(),
///     ProviderRegistry::new(),
///     TemplateResolver::default(),
/// );
/// handle.start_search("Genova", None).await.unwrap();
/// let state = handle.wait_until_idle().await.unwrap();
/// println!("{} results", state.result_count());
/// # }
/// ```
pub fn spawn_search_store(
    config: GeoseekConfig,
    registry: ProviderRegistry,
    resolver: TemplateResolver,
) -> SearchHandle {
    let (sender, receiver) = mpsc::channel(config.search.command_buffer.max(1));
    let (feedback_sender, feedback_receiver) = mpsc::unbounded_channel();
    let (state_sender, state_receiver) = watch::channel(SearchState::default());
    let (event_sender, _) = broadcast::channel(config.search.event_buffer.max(1));

    let store = SearchStore {
        config,
        registry: Arc::new(registry),
        resolver,
        state: SearchState::default(),
        state_sender,
        event_sender: event_sender.clone(),
        feedback_sender,
        generation: 0,
        in_flight: None,
    };

    tokio::spawn(async move {
        run_store_loop(store, receiver, feedback_receiver).await;
    });

    SearchHandle::new(sender, state_receiver, event_sender)
}

/// Runs the main actor message processing loop.
///
/// Continues until every handle is dropped or a shutdown is requested.
async fn run_store_loop(
    mut store: SearchStore,
    mut receiver: mpsc::Receiver<StoreMessage>,
    mut feedback_receiver: mpsc::UnboundedReceiver<Feedback>,
) {
    tracing::debug!("Search store actor started");

    loop {
        tokio::select! {
            message = receiver.recv() => match message {
                Some(StoreMessage::Dispatch { command, responder }) => {
                    store.process(command);
                    let _ = responder.send(());
                }
                Some(StoreMessage::Shutdown { responder }) => {
                    tracing::debug!("Search store actor shutting down");
                    store.abort_search();
                    let _ = responder.send(());
                    break;
                }
                None => break,
            },
            Some(feedback) = feedback_receiver.recv() => {
                store.process_feedback(feedback);
            }
        }
    }

    store.abort_search();
    tracing::debug!("Search store actor stopped");
}

impl SearchStore {
    /// Applies `command` and everything it derives, breadth first.
    fn process(&mut self, command: Command) {
        let mut queue = VecDeque::from([command]);

        while let Some(command) = queue.pop_front() {
            tracing::debug!("Processing {}", command.name());

            self.state = apply(&self.state, &command);
            self.state_sender.send_replace(self.state.clone());
            // No subscribers is fine; the command log is optional.
            let _ = self.event_sender.send(command.clone());

            queue.extend(self.react(&command));
        }
    }

    fn process_feedback(&mut self, feedback: Feedback) {
        if feedback.generation != self.generation {
            tracing::debug!(
                "Dropping stale {} from search #{} (current #{})",
                feedback.command.name(),
                feedback.generation,
                self.generation
            );
            return;
        }
        self.process(feedback.command);
    }

    /// Runs the orchestration processes for `command`.
    fn react(&mut self, command: &Command) -> Vec<Command> {
        match command {
            Command::SearchStarted {
                search_text,
                services,
            } => self.start_text_search(search_text, services.as_deref()),
            Command::ItemSelected { item, map_view } => {
                let mut commands = select_item(
                    item,
                    map_view,
                    &self.state,
                    &self.config,
                    &self.resolver,
                );
                commands.extend(self.cancel_outstanding_search());
                commands
            }
            Command::NestedServicesSelected { .. } => {
                self.cancel_outstanding_search().into_iter().collect()
            }
            Command::Reset => {
                self.abort_search();
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn start_text_search(
        &mut self,
        search_text: &str,
        requested: Option<&[ServiceDescriptor]>,
    ) -> Vec<Command> {
        // A newer search supersedes whatever is still outstanding.
        self.abort_search();

        if search_text.trim().is_empty() {
            tracing::debug!("Ignoring blank search text");
            let mut commands = vec![Command::purge_results()];
            if self.state.loading {
                commands.push(Command::search_loading(false));
            }
            return commands;
        }

        let services = resolve_services(requested, &self.state, &self.config);
        tracing::info!(
            "Searching '{}' across {} services (search #{})",
            search_text,
            services.len(),
            self.generation
        );

        let registry = Arc::clone(&self.registry);
        let feedback = self.feedback_sender.clone();
        let generation = self.generation;
        let search_text = search_text.to_string();
        let max_results = self.config.search.max_results;

        self.in_flight = Some(tokio::spawn(async move {
            for command in run_text_search(registry, search_text, services, max_results).await {
                if feedback.send(Feedback { generation, command }).is_err() {
                    break;
                }
            }
        }));

        vec![Command::search_loading(true)]
    }

    /// Cancels a search left over from the previous level.
    ///
    /// Returns `LOADING(false)` when a query was still outstanding, since its
    /// own completion will now be dropped.
    fn cancel_outstanding_search(&mut self) -> Option<Command> {
        let outstanding = self.in_flight.is_some() && self.state.loading;
        self.abort_search();
        if outstanding {
            tracing::debug!("Selection supersedes the outstanding search");
            Some(Command::search_loading(false))
        } else {
            None
        }
    }

    /// Cancels the outstanding search, if any, and invalidates its feedback.
    fn abort_search(&mut self) {
        self.generation += 1;
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}
