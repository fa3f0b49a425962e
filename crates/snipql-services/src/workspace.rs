//! Query workspace: the store wired to its collaborators
//!
//! `QueryWorkspace` is what a front end drives. Each operation mutates the
//! store, keeps the editor widget in sync, pushes a fresh snapshot to the view
//! and reports failures through the notifier. Failures are also returned so
//! a caller can decide its own exit status; none of them leave the store
//! unusable.

use chrono::Local;
use snipql_core::{
    BufferEditor, Clipboard, Confirm, Notifier, Result, Severity, SnipqlError, TemplateEditor,
};
use snipql_store::{
    ImportStep, ImportSummary, KeyValueStorage, LoadOutcome, MergeMode, PendingImport, QueryEdit,
    QueryRecord, QueryStore, StoreSnapshot, export_file_name, parse_import,
};
use snipql_templates::VariableChanges;

use crate::view_models::{ExportFile, ImportProgress, QueryView};

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this query?";

const SAVE_FAILED: &str = "Failed to save queries to storage";

/// The front-end implementations a workspace talks to
pub struct Collaborators {
    pub editor: Box<dyn TemplateEditor>,
    pub notifier: Box<dyn Notifier>,
    pub confirm: Box<dyn Confirm>,
    pub clipboard: Box<dyn Clipboard>,
    pub view: Option<Box<dyn QueryView>>,
}

impl Collaborators {
    /// Collaborators with an in-memory editor buffer and no view
    pub fn new(
        notifier: impl Notifier + 'static,
        confirm: impl Confirm + 'static,
        clipboard: impl Clipboard + 'static,
    ) -> Self {
        Self {
            editor: Box::new(BufferEditor::default()),
            notifier: Box::new(notifier),
            confirm: Box::new(confirm),
            clipboard: Box::new(clipboard),
            view: None,
        }
    }

    pub fn with_editor(mut self, editor: impl TemplateEditor + 'static) -> Self {
        self.editor = Box::new(editor);
        self
    }

    pub fn with_view(mut self, view: impl QueryView + 'static) -> Self {
        self.view = Some(Box::new(view));
        self
    }
}

/// Presentation-facing controller over a [`QueryStore`]
pub struct QueryWorkspace<S: KeyValueStorage> {
    store: QueryStore<S>,
    editor: Box<dyn TemplateEditor>,
    notifier: Box<dyn Notifier>,
    confirm: Box<dyn Confirm>,
    clipboard: Box<dyn Clipboard>,
    view: Option<Box<dyn QueryView>>,
    pending_import: Option<PendingImport>,
}

impl<S: KeyValueStorage> QueryWorkspace<S> {
    /// Load the collection stored under `key` and report how loading went
    pub fn open(storage: S, key: impl Into<String>, collaborators: Collaborators) -> Self {
        let (store, outcome) = QueryStore::open(storage, key);
        let mut workspace = Self::with_store(store, collaborators);
        workspace.report_load(&outcome);
        workspace.load_selected_into_editor();
        workspace.refresh();
        workspace
    }

    /// Wrap an already loaded store
    pub fn with_store(store: QueryStore<S>, collaborators: Collaborators) -> Self {
        Self {
            store,
            editor: collaborators.editor,
            notifier: collaborators.notifier,
            confirm: collaborators.confirm,
            clipboard: collaborators.clipboard,
            view: collaborators.view,
            pending_import: None,
        }
    }

    pub fn store(&self) -> &QueryStore<S> {
        &self.store
    }

    pub fn storage_mut(&mut self) -> &mut S {
        self.store.storage_mut()
    }

    pub fn editor(&self) -> &dyn TemplateEditor {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> &mut dyn TemplateEditor {
        self.editor.as_mut()
    }

    pub fn pending_import(&self) -> Option<&PendingImport> {
        self.pending_import.as_ref()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.store.snapshot()
    }

    /// Push the current snapshot to the view, if one is attached
    pub fn refresh(&self) {
        if let Some(view) = &self.view {
            view.render(&self.store.snapshot());
        }
    }

    /// Append a blank query, select it and show it in the editor
    pub fn new_query(&mut self) -> QueryRecord {
        let record = self.store.create().clone();
        self.load_selected_into_editor();
        self.refresh();
        record
    }

    /// Select the query at `index`; out of range clears the selection
    pub fn select_query(&mut self, index: usize) -> Option<&QueryRecord> {
        if self.store.select(index).is_none() {
            tracing::debug!(index, "Selection cleared");
        }
        self.load_selected_into_editor();
        self.refresh();
        self.store.selected()
    }

    /// Re-read the editor's template after every keystroke.
    ///
    /// Returns the variable changes, or `None` when nothing is selected.
    pub fn on_template_changed(&mut self) -> Option<VariableChanges> {
        let text = self.editor.template_text();
        let changes = self.store.update(QueryEdit::sql(text)).ok()?;
        self.update_preview();
        self.refresh();
        Some(changes)
    }

    /// Rename the selected query, picking up any pending editor text too
    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        let edit = QueryEdit::name(name).with_sql(self.editor.template_text());
        self.store.update(edit)?;
        self.update_preview();
        self.refresh();
        Ok(())
    }

    /// Set a variable value of the selected query
    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        if let Err(error) = self.store.set_variable(name, value) {
            if !matches!(error, SnipqlError::NoSelection) {
                self.notifier.notify(Severity::Error, &error.to_string());
            }
            return Err(error);
        }
        self.update_preview();
        self.refresh();
        Ok(())
    }

    /// Sync the editor into the selected query and persist the collection
    pub fn save(&mut self) -> Result<()> {
        self.store.update(QueryEdit::sql(self.editor.template_text()))?;
        self.update_preview();
        self.refresh();

        self.persist_and_report()?;
        self.notifier.notify(Severity::Success, "Query saved successfully!");
        Ok(())
    }

    /// Copy the substituted text of the selected query to the clipboard
    pub fn copy(&mut self) -> Result<String> {
        self.store.update(QueryEdit::sql(self.editor.template_text()))?;
        self.update_preview();
        let text = self.store.substituted()?;

        match self.clipboard.write_text(&text) {
            Ok(()) => {
                self.notifier.notify(Severity::Info, "Query copied to clipboard!");
                Ok(text)
            }
            Err(error) => {
                tracing::warn!(%error, "Clipboard rejected the query");
                self.notifier.notify(Severity::Error, "Failed to copy query");
                Err(match error {
                    SnipqlError::Clipboard(_) => error,
                    other => SnipqlError::Clipboard(other.to_string()),
                })
            }
        }
    }

    /// Delete the selected query once the user confirms.
    ///
    /// Returns `Ok(None)` when the user declines; nothing changes then.
    pub fn delete(&mut self) -> Result<Option<QueryRecord>> {
        if self.store.selected().is_none() {
            return Err(SnipqlError::NoSelection);
        }
        if !self.confirm.confirm(DELETE_PROMPT) {
            tracing::debug!("Delete declined");
            return Ok(None);
        }

        let removed = self.store.delete_selected()?;
        self.load_selected_into_editor();
        self.refresh();

        let saved = self.persist_and_report();
        self.notifier.notify(Severity::Warning, "Query deleted!");
        saved.map(|()| Some(removed))
    }

    /// Move a query to a new position and persist the new order
    pub fn move_query(&mut self, from: usize, to: usize) -> Result<()> {
        if let Err(error) = self.store.reorder(from, to) {
            self.notifier.notify(Severity::Error, &error.to_string());
            return Err(error);
        }
        self.refresh();
        self.persist_and_report()
    }

    /// Serialize the collection for download, named after today's date
    pub fn export(&self) -> Result<ExportFile> {
        let document = match self.store.export() {
            Ok(document) => document,
            Err(error) => {
                self.notifier.notify(Severity::Warning, &error.to_string());
                return Err(error);
            }
        };

        let contents = document.to_json_pretty().inspect_err(|error| {
            self.notifier
                .notify(Severity::Error, &format!("Failed to export queries: {error}"));
        })?;

        let file = ExportFile {
            file_name: export_file_name(Local::now().date_naive()),
            contents,
            query_count: document.query_count(),
        };
        tracing::info!(file = %file.file_name, count = file.query_count, "Exported queries");
        self.notifier
            .notify(Severity::Success, "Queries exported successfully!");
        Ok(file)
    }

    /// Validate an import file's content and apply it when no choice is needed.
    ///
    /// A non-empty store keeps the import pending until [`Self::confirm_import`]
    /// or [`Self::cancel_import`]; nothing changes before that.
    pub fn import_content(&mut self, content: &str) -> Result<ImportProgress> {
        let bundle = parse_import(content).inspect_err(|error| {
            tracing::warn!(%error, "Rejected import file");
            self.notifier
                .notify(Severity::Error, &format!("Failed to import file: {error}"));
        })?;

        match self.store.begin_import(bundle) {
            ImportStep::Completed(summary) => {
                self.pending_import = None;
                self.after_import(summary)
            }
            ImportStep::NeedsMergeMode(pending) => {
                let progress = ImportProgress::AwaitingMergeMode {
                    current: pending.current_count(),
                    incoming: pending.incoming_count(),
                };
                self.pending_import = Some(pending);
                Ok(progress)
            }
        }
    }

    /// Apply the pending import with the chosen merge mode
    pub fn confirm_import(&mut self, mode: MergeMode) -> Result<ImportProgress> {
        let pending = self
            .pending_import
            .take()
            .ok_or(SnipqlError::NoPendingImport)?;
        let summary = self.store.finish_import(pending, mode);
        self.after_import(summary)
    }

    /// Drop the pending import; returns whether one was waiting
    pub fn cancel_import(&mut self) -> bool {
        let cancelled = self.pending_import.take().is_some();
        if cancelled {
            tracing::debug!("Import cancelled");
        }
        cancelled
    }

    fn after_import(&mut self, summary: ImportSummary) -> Result<ImportProgress> {
        self.load_selected_into_editor();
        self.refresh();

        let saved = self.persist_and_report();
        self.notifier.notify(Severity::Success, &summary.message());
        saved.map(|()| ImportProgress::Imported {
            mode: summary.mode,
            imported: summary.imported,
            total: summary.total,
        })
    }

    fn report_load(&self, outcome: &LoadOutcome) {
        match outcome {
            LoadOutcome::Loaded { .. } => {}
            LoadOutcome::FirstRun { persist_error } => {
                if persist_error.is_some() {
                    self.notifier.notify(Severity::Error, SAVE_FAILED);
                }
            }
            LoadOutcome::Recovered {
                error,
                persist_error,
            } => {
                self.notifier.notify(
                    Severity::Error,
                    &format!("{error}. The example query was restored."),
                );
                if persist_error.is_some() {
                    self.notifier.notify(Severity::Error, SAVE_FAILED);
                }
            }
        }
    }

    fn persist_and_report(&mut self) -> Result<()> {
        self.store.persist().inspect_err(|_| {
            self.notifier.notify(Severity::Error, SAVE_FAILED);
        })
    }

    fn load_selected_into_editor(&mut self) {
        let sql = self
            .store
            .selected()
            .map(|record| record.sql.clone())
            .unwrap_or_default();
        self.editor.set_template_text(&sql);
        self.update_preview();
    }

    fn update_preview(&mut self) {
        let preview = self.store.preview();
        self.editor.set_preview_text(&preview);
    }
}
