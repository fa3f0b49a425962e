//! `snipql` subcommands
//!
//! Positions on the command line start at 1 and follow the list order.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use snipql_core::SnipqlError;
use snipql_services::{ImportProgress, QueryWorkspace};
use snipql_store::{KeyValueStorage, MergeMode};
use snipql_templates::{VariableChanges, unfilled_variables};

use crate::terminal::MergePrompt;

/// A workspace failure the notifier has already shown to the user
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Reported(#[from] pub SnipqlError);

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List stored queries
    List,

    /// Show a query's template, variables and substituted preview
    Show { position: usize },

    /// Create a query
    New {
        #[arg(long)]
        name: Option<String>,

        /// Template text, with placeholders written as [name]
        #[arg(long)]
        sql: Option<String>,
    },

    /// Change a query's name or template
    Edit {
        position: usize,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, conflicts_with = "sql_file")]
        sql: Option<String>,

        /// Read the template from a file
        #[arg(long, value_name = "FILE")]
        sql_file: Option<PathBuf>,
    },

    /// Set the value of a placeholder
    Set {
        position: usize,
        variable: String,
        value: String,
    },

    /// Print the substituted query
    Preview { position: usize },

    /// Copy the substituted query to the system clipboard
    Copy { position: usize },

    /// Delete a query
    Delete {
        position: usize,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Move a query to another position
    Move { from: usize, to: usize },

    /// Export all queries to a JSON file
    Export {
        /// Output file (defaults to sql-queries-<date>.json)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Import queries from an export file
    Import {
        file: PathBuf,

        /// How to merge into a non-empty store; asks when omitted
        #[arg(long)]
        mode: Option<MergeMode>,
    },
}

impl Commands {
    /// Whether destructive confirmations are pre-approved
    pub fn assumes_yes(&self) -> bool {
        matches!(self, Commands::Delete { yes: true, .. })
    }

    pub fn run<S: KeyValueStorage>(
        self,
        workspace: &mut QueryWorkspace<S>,
        prompt: &dyn MergePrompt,
        out: &mut dyn Write,
    ) -> Result<()> {
        match self {
            Commands::List => list(workspace, out),

            Commands::Show { position } => {
                select(workspace, position)?;
                show(workspace, out)
            }

            Commands::New { name, sql } => {
                workspace.new_query();
                if let Some(sql) = sql {
                    set_template(workspace, &sql);
                }
                if let Some(name) = name {
                    workspace.rename(name).map_err(Reported)?;
                }
                workspace.save().map_err(Reported)?;

                if let Some(created) = workspace.store().selected() {
                    writeln!(out, "Created #{} {}", workspace.store().len(), created.name)?;
                }
                Ok(())
            }

            Commands::Edit {
                position,
                name,
                sql,
                sql_file,
            } => {
                select(workspace, position)?;

                let sql = match (sql, sql_file) {
                    (Some(sql), _) => Some(sql),
                    (None, Some(path)) => Some(
                        fs::read_to_string(&path)
                            .with_context(|| format!("Failed to read {}", path.display()))?,
                    ),
                    (None, None) => None,
                };
                if name.is_none() && sql.is_none() {
                    bail!("Nothing to change: pass --name, --sql or --sql-file");
                }

                if let Some(sql) = sql {
                    for added in set_template(workspace, &sql).added {
                        writeln!(out, "+ [{added}]")?;
                    }
                }
                if let Some(name) = name {
                    workspace.rename(name).map_err(Reported)?;
                }
                workspace.save().map_err(Reported)?;
                Ok(())
            }

            Commands::Set {
                position,
                variable,
                value,
            } => {
                select(workspace, position)?;
                workspace.set_variable(&variable, value).map_err(Reported)?;
                workspace.save().map_err(Reported)?;
                Ok(())
            }

            Commands::Preview { position } => {
                select(workspace, position)?;
                writeln!(out, "{}", workspace.store().substituted()?)?;
                Ok(())
            }

            Commands::Copy { position } => {
                select(workspace, position)?;
                workspace.copy().map_err(Reported)?;
                Ok(())
            }

            Commands::Delete { position, .. } => {
                select(workspace, position)?;
                if workspace.delete().map_err(Reported)?.is_none() {
                    writeln!(out, "Nothing deleted")?;
                }
                Ok(())
            }

            Commands::Move { from, to } => {
                workspace
                    .move_query(index(from)?, index(to)?)
                    .map_err(Reported)?;
                Ok(())
            }

            Commands::Export { output } => {
                let file = workspace.export().map_err(Reported)?;
                let path = output.unwrap_or_else(|| PathBuf::from(&file.file_name));
                fs::write(&path, &file.contents)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                writeln!(out, "{}", path.display())?;
                Ok(())
            }

            Commands::Import { file, mode } => {
                let content = fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;

                if let ImportProgress::AwaitingMergeMode { current, incoming } =
                    workspace.import_content(&content).map_err(Reported)?
                {
                    match mode.or_else(|| prompt.choose_merge_mode(current, incoming)) {
                        Some(mode) => {
                            workspace.confirm_import(mode).map_err(Reported)?;
                        }
                        None => {
                            workspace.cancel_import();
                            writeln!(out, "Import cancelled")?;
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// Zero-based index of a command-line position
fn index(position: usize) -> Result<usize> {
    position.checked_sub(1).context("Positions start at 1")
}

fn select<S: KeyValueStorage>(workspace: &mut QueryWorkspace<S>, position: usize) -> Result<()> {
    let index = index(position)?;
    if workspace.select_query(index).is_none() {
        bail!(
            "No query at position {position} ({} stored)",
            workspace.store().len()
        );
    }
    Ok(())
}

/// Put `sql` in the editor as if it had been typed
fn set_template<S: KeyValueStorage>(
    workspace: &mut QueryWorkspace<S>,
    sql: &str,
) -> VariableChanges {
    workspace.editor_mut().set_template_text(sql);
    workspace.on_template_changed().unwrap_or_default()
}

fn list<S: KeyValueStorage>(workspace: &QueryWorkspace<S>, out: &mut dyn Write) -> Result<()> {
    let snapshot = workspace.snapshot();
    if snapshot.is_empty() {
        writeln!(out, "No queries stored")?;
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "ID", "Name", "Variables"]);
    for (index, query) in snapshot.queries.iter().enumerate() {
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(query.id),
            Cell::new(&query.name),
            Cell::new(query.variable_count),
        ]);
    }

    writeln!(out, "{table}")?;
    Ok(())
}

fn show<S: KeyValueStorage>(workspace: &QueryWorkspace<S>, out: &mut dyn Write) -> Result<()> {
    let snapshot = workspace.snapshot();
    let Some(selected) = snapshot.selected.as_ref() else {
        bail!(SnipqlError::NoSelection);
    };
    let record = &selected.record;

    writeln!(out, "{}", record.name)?;
    writeln!(out)?;
    writeln!(out, "{}", record.sql)?;
    writeln!(out)?;

    if record.variables.is_empty() {
        writeln!(out, "No variables")?;
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Variable", "Value"]);
        for (name, value) in &record.variables {
            table.add_row(vec![format!("[{name}]"), value.clone()]);
        }
        writeln!(out, "{table}")?;

        let unfilled = unfilled_variables(&record.variables);
        if !unfilled.is_empty() {
            writeln!(out, "Unfilled: {}", unfilled.join(", "))?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", selected.preview)?;
    Ok(())
}
