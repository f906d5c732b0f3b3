//! Shared fixtures for integration tests.

use std::sync::Arc;
use std::time::Duration;

use geoseek_core::provider::MockProvider;
use geoseek_core::{
    Command, GeoseekConfig, ProviderRegistry, SearchHandle, SearchResult, ServiceKind,
    TemplateResolver, spawn_search_store,
};
use serde_json::{Map, json};
use tokio::sync::broadcast;

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("geoseek_core=debug")
        .try_init();
}

/// Result at a point with a `name` property.
pub fn named(name: &str, lon: f64, lat: f64) -> SearchResult {
    let mut properties = Map::new();
    properties.insert("name".to_string(), json!(name));
    SearchResult::at_point(lon, lat, properties)
}

/// Registry with one mock provider per service kind.
pub fn registry(providers: Vec<(&str, Arc<MockProvider>)>) -> ProviderRegistry {
    providers
        .into_iter()
        .fold(ProviderRegistry::new(), |registry, (kind, provider)| {
            registry.with_provider(ServiceKind::from(kind), provider)
        })
}

pub fn spawn(registry: ProviderRegistry) -> SearchHandle {
    init_test_tracing();
    spawn_search_store(
        GeoseekConfig::for_testing(),
        registry,
        TemplateResolver::default(),
    )
}

/// Next `count` commands from the log, failing if it stalls.
pub async fn next_commands(events: &mut broadcast::Receiver<Command>, count: usize) -> Vec<Command> {
    let mut commands = Vec::with_capacity(count);
    for _ in 0..count {
        let command = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("command log stalled")
            .expect("command log closed");
        commands.push(command);
    }
    commands
}

pub fn names(commands: &[Command]) -> Vec<&'static str> {
    commands.iter().map(Command::name).collect()
}

pub fn result_names(results: &[SearchResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|result| result.properties.get("name").and_then(|v| v.as_str()))
        .map(str::to_string)
        .collect()
}
