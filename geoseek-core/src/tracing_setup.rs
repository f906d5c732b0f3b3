//! Logging for geoseek runs
//!
//! The console shows geoseek events at the chosen level; the log file keeps
//! every processed search command of the last run.

use std::fs::{File, create_dir_all};
use std::path::Path;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Crates whose events follow the chosen console level.
const GEOSEEK_TARGETS: [&str; 3] = ["geoseek", "geoseek_core", "geoseek_search"];

/// HTTP internals are only interesting when something breaks.
const QUIET_TARGETS: [&str; 3] = ["hyper_util", "reqwest", "h2"];

/// Console filter directives for `level`.
///
/// Geoseek crates log at `level`, everything else at `warn` at most so the
/// HTTP stack does not drown out search commands. `RUST_LOG` overrides this.
pub fn console_directives(level: Level) -> String {
    let others = if level < Level::WARN { level } else { Level::WARN };
    let mut directives = vec![others.to_string().to_lowercase()];
    directives.extend(
        GEOSEEK_TARGETS
            .iter()
            .map(|target| format!("{target}={}", level.to_string().to_lowercase())),
    );
    directives.join(",")
}

/// File filter directives: full trace of geoseek, `info` for the HTTP stack.
pub fn file_directives() -> String {
    let mut directives = vec!["debug".to_string()];
    directives.extend(GEOSEEK_TARGETS.iter().map(|target| format!("{target}=trace")));
    directives.extend(QUIET_TARGETS.iter().map(|target| format!("{target}=info")));
    directives.join(",")
}

/// Installs console and file logging for a geoseek run.
///
/// Console output goes to stderr so result listings on stdout stay clean.
/// The file `geoseek-last-run.log` in `logs_dir` (default `./logs`) is
/// truncated on every run and records each command the store processes.
///
/// # Errors
///
/// - `std::io::Error` - Logs directory cannot be created or log file cannot be opened
pub fn init_tracing(console_level: Level, logs_dir: Option<&Path>) -> std::io::Result<()> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;

    let log_file_path = logs_path.join("geoseek-last-run.log");
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_directives(console_level)));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new(file_directives()));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        "Logging search activity: console={}, file={}",
        console_level,
        log_file_path.display()
    );

    Ok(())
}

/// CLI log levels for user control
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Informational, warning, and error messages
    Info,
    /// Debug, informational, warning, and error messages
    Debug,
    /// All messages including detailed tracing
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use geoseek_core::tracing_setup::CliLogLevel;
    ///
    /// let level = CliLogLevel::Info.as_tracing_level();
    /// assert_eq!(level, tracing::Level::INFO);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliLogLevel::Error => write!(f, "error"),
            CliLogLevel::Warn => write!(f, "warn"),
            CliLogLevel::Info => write!(f, "info"),
            CliLogLevel::Debug => write!(f, "debug"),
            CliLogLevel::Trace => write!(f, "trace"),
        }
    }
}
