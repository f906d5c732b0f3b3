//! Geoseek CLI - Command-line interface
//!
//! Runs one-shot searches or an interactive cascading search session.

mod commands;

use clap::Parser;
use geoseek_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "geoseek")]
#[command(about = "Cascading search across geocoders and feature services")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), None)?;

    commands::handle_command(cli.command).await?;

    Ok(())
}
