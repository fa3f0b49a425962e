//! Logging and tracing setup for the `snipql` binary
//!
//! Two layers, each optional:
//! - a compact console layer on stderr, quiet unless `--verbose` is given
//! - a JSON file layer with daily rotation, for bug reports
//!
//! `RUST_LOG` overrides both filters.

use std::path::PathBuf;

use snipql_core::SnipqlSettings;
use snipql_core::settings::{APP_DIR_NAME, log_dir};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FILE_PREFIX: &str = "snipql.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where log files should be written
    pub log_dir: PathBuf,

    /// Whether to write JSON logs to rolling files
    pub enable_json_logs: bool,

    pub enable_console_logs: bool,

    /// Whether to include file/line information on the console
    pub include_location: bool,

    /// Filter for the console layer
    pub console_filter: String,

    /// Filter for the JSON file layer
    pub file_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            enable_json_logs: true,
            enable_console_logs: true,
            include_location: cfg!(debug_assertions),
            console_filter: "debug".to_string(),
            file_filter: "debug".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Warnings on the console, informational JSON logs on disk
    pub fn production() -> Self {
        Self {
            log_dir: default_log_dir(),
            enable_json_logs: true,
            enable_console_logs: true,
            include_location: false,
            console_filter: "warn".to_string(),
            file_filter: "warn,snipql=info".to_string(),
        }
    }

    /// Verbose console output with locations
    pub fn development() -> Self {
        Self::default()
    }

    /// Configuration for one CLI run
    pub fn for_run(settings: &SnipqlSettings, data_dir: &std::path::Path, verbose: bool) -> Self {
        let base = if verbose {
            Self::development()
        } else {
            Self::production()
        };

        Self {
            log_dir: log_dir(data_dir),
            enable_json_logs: settings.json_logs,
            file_filter: settings.log_filter.clone(),
            ..base
        }
    }
}

/// Initialize the logging system.
///
/// The returned guard flushes the file writer when dropped; keep it alive
/// until the program exits.
pub fn init(config: LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = |default: &str| {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    let mut layers = Vec::new();

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_location)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .compact()
            .with_filter(filter(&config.console_filter))
            .boxed();

        layers.push(console_layer);
    }

    let mut guard = None;
    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_writer(non_blocking)
            .with_filter(filter(&config.file_filter))
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        "Logging initialized"
    );

    Ok(guard)
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("logs")
}
