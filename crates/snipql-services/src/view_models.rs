use snipql_store::{MergeMode, StoreSnapshot};

/// Receives the store state after every workspace operation
pub trait QueryView {
    fn render(&self, snapshot: &StoreSnapshot);
}

/// An export ready to be written somewhere
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportFile {
    /// Suggested file name, e.g. `sql-queries-2025-01-31.json`
    pub file_name: String,
    pub contents: String,
    pub query_count: usize,
}

/// Where an import stands after the file content was handed over
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ImportProgress {
    /// Applied and persisted (or reported as unsaved)
    Imported {
        mode: MergeMode,
        imported: usize,
        total: usize,
    },
    /// Waiting for [`crate::QueryWorkspace::confirm_import`]
    AwaitingMergeMode { current: usize, incoming: usize },
}
