//! snipql - a personal library of parameterized SQL snippets
//!
//! Templates contain `[name]` placeholders; each query keeps a value per
//! placeholder and previews or copies the substituted text.

mod commands;
mod logging;
mod terminal;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use snipql_core::{SnipqlSettings, settings};
use snipql_services::{Collaborators, QueryWorkspace};
use snipql_store::SqliteStorage;

use crate::commands::{Commands, Reported};
use crate::logging::LoggingConfig;
use crate::terminal::{SystemClipboard, TerminalConfirm, TerminalMergePrompt, TerminalNotifier};

#[derive(Parser, Debug)]
#[command(name = "snipql", version, about = "Manage parameterized SQL snippets")]
struct Cli {
    /// Directory holding the query database and logs
    #[arg(long, global = true, env = "SNIPQL_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Settings file to use instead of the default location
    #[arg(long, global = true, env = "SNIPQL_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Workspace failures were already printed by the notifier
            if err.downcast_ref::<Reported>().is_none() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings_path = match cli.config {
        Some(path) => path,
        None => settings::settings_file()?,
    };
    let settings = SnipqlSettings::load(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => settings.resolved_data_dir()?,
    };
    settings::ensure_directories(&data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;

    let _log_guard = logging::init(LoggingConfig::for_run(&settings, &data_dir, cli.verbose))?;

    let storage = SqliteStorage::open(settings::storage_file(&data_dir))
        .context("Failed to open query storage")?;
    tracing::debug!(path = %storage.path().display(), key = %settings.storage_key, "Opened storage");

    let collaborators = Collaborators::new(
        TerminalNotifier::default(),
        TerminalConfirm::new(cli.command.assumes_yes()),
        SystemClipboard,
    );
    let mut workspace = QueryWorkspace::open(storage, settings.storage_key.as_str(), collaborators);

    let mut stdout = io::stdout().lock();
    cli.command.run(&mut workspace, &TerminalMergePrompt, &mut stdout)
}
