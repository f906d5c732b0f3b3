//! CLI command implementations

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use geoseek_core::display::{breadcrumb_trail, result_subtitle, result_title};
use geoseek_core::{
    Command, GeoseekConfig, MapViewContext, SearchHandle, SearchState, TemplateResolver,
    spawn_search_store,
};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a single search and print the results
    Search {
        /// Text to search for
        text: String,
        /// JSON file with the services to query
        #[arg(short, long)]
        services: Option<PathBuf>,
        /// Maximum number of results to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Interactive session: search, select results and drill down
    Explore {
        /// JSON file with the services to query
        #[arg(short, long)]
        services: Option<PathBuf>,
        /// Map projection used when recentering
        #[arg(long, default_value = "EPSG:4326")]
        projection: String,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns the first error of the command that fails
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Search {
            text,
            services,
            limit,
        } => search_once(&text, services.as_deref(), limit).await,
        Commands::Explore {
            services,
            projection,
        } => explore(services.as_deref(), &projection).await,
    }
}

fn load_config(services: Option<&Path>) -> anyhow::Result<GeoseekConfig> {
    let config = GeoseekConfig::from_env();
    match services {
        Some(path) => config
            .with_services_file(path)
            .with_context(|| format!("loading services from {}", path.display())),
        None => Ok(config),
    }
}

fn start_store(config: GeoseekConfig) -> anyhow::Result<(SearchHandle, TemplateResolver)> {
    let registry = geoseek_search::build_registry(&config.providers)
        .context("building search providers")?;
    let resolver = TemplateResolver::with_capacity(config.templates.cache_capacity);
    let handle = spawn_search_store(config, registry, resolver.clone());
    Ok((handle, resolver))
}

/// Run a single search and print titles and subtitles
///
/// # Errors
/// - Services file cannot be loaded
/// - A provider reports an error
pub async fn search_once(
    text: &str,
    services: Option<&Path>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let mut config = load_config(services)?;
    if let Some(limit) = limit {
        config.search.max_results = Some(limit);
    }
    let (handle, resolver) = start_store(config)?;

    handle.start_search(text, None).await?;
    let state = handle.wait_until_idle().await?;
    handle.shutdown().await?;

    if let Some(error) = state.error {
        anyhow::bail!("search failed: {error}");
    }

    print_results(&state, &resolver);
    Ok(())
}

/// Interactive cascading search on stdin
///
/// Lines are searched as typed. A number selects that result, `back`
/// removes the last breadcrumb, `reset` clears the query and `quit` exits.
///
/// # Errors
/// - Services file cannot be loaded
/// - Reading stdin fails
pub async fn explore(services: Option<&Path>, projection: &str) -> anyhow::Result<()> {
    let (handle, resolver) = start_store(load_config(services)?)?;
    let map = MapViewContext::new(800, 600, projection);
    let mut events = handle.subscribe();

    println!("Type text to search, a number to select, 'back', 'reset' or 'quit'.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "exit" => break,
            "reset" => handle.reset_search().await?,
            "back" => match handle.state().last_selected_item().cloned() {
                Some(item) => handle.cancel_item(item).await?,
                None => println!("Nothing selected"),
            },
            _ => match line.parse::<usize>() {
                Ok(index) => {
                    let chosen = handle
                        .state()
                        .results
                        .and_then(|results| results.get(index.wrapping_sub(1)).cloned());
                    match chosen {
                        Some(item) => handle.select_item(item, map.clone()).await?,
                        None => println!("No result #{index}"),
                    }
                }
                Err(_) => {
                    handle.start_search(line, None).await?;
                }
            },
        }

        let state = handle.wait_until_idle().await?;
        while let Ok(command) = events.try_recv() {
            if let Command::ChangeMapView { view } = command {
                println!(
                    "Map: center {:.5},{:.5} zoom {} ({})",
                    view.center.lon, view.center.lat, view.zoom, view.projection
                );
            }
        }
        print_state(&state, &resolver);
    }

    handle.shutdown().await?;
    Ok(())
}

fn print_state(state: &SearchState, resolver: &TemplateResolver) {
    if !state.selected_items.is_empty() {
        println!("In: {}", breadcrumb_trail(state));
    }
    if let Some(placeholder) = state.placeholder() {
        println!("({placeholder})");
    }
    if let Some(marker) = state.marker_position {
        println!("Marker: {:.5},{:.5}", marker.lon, marker.lat);
    }
    if !state.search_text.is_empty() {
        println!("Search: {}", state.search_text);
    }
    if let Some(error) = &state.error {
        println!("Error: {error}");
    }
    print_results(state, resolver);
}

fn print_results(state: &SearchState, resolver: &TemplateResolver) {
    let Some(results) = &state.results else {
        return;
    };
    if results.is_empty() {
        println!("No results.");
        return;
    }

    println!("{:-<60}", "");
    for (index, result) in results.iter().enumerate() {
        println!("{:>3}. {}", index + 1, result_title(result, resolver));
        if let Some(subtitle) = result_subtitle(result, resolver) {
            println!("     {subtitle}");
        }
    }
}

