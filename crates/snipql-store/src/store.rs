//! The query store: ordered collection, selection, persistence
//!
//! `QueryStore` is an owned object, handed to whatever presentation layer drives
//! it. Every mutation keeps the record invariants: ids stay unique, variable
//! keys follow the template text, and `order` is renumbered densely after any
//! reordering, load or import.

use std::collections::HashSet;

use chrono::Utc;
use snipql_core::{Result, SnipqlError};
use snipql_templates::{VariableChanges, substitute};

use crate::interchange::{
    ImportBundle, ImportStep, ImportSummary, MergeMode, PendingImport, QueryExport, unique_name,
};
use crate::record::{
    QueryRecord, StoredRecord, default_example_record, normalize_order, renumber,
};
use crate::snapshot::{StoreSnapshot, preview_text};
use crate::storage::KeyValueStorage;

/// Result of loading the collection from storage
#[derive(Debug)]
pub enum LoadOutcome {
    /// Stored records were read
    Loaded { count: usize },
    /// Nothing was stored yet; the example record was installed
    FirstRun { persist_error: Option<SnipqlError> },
    /// Stored data was unreadable; the example record replaced it
    Recovered {
        error: SnipqlError,
        persist_error: Option<SnipqlError>,
    },
}

/// Edits to the selected record's name and template
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryEdit {
    pub name: Option<String>,
    pub sql: Option<String>,
}

impl QueryEdit {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            sql: None,
        }
    }

    pub fn sql(sql: impl Into<String>) -> Self {
        Self {
            name: None,
            sql: Some(sql.into()),
        }
    }

    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }
}

/// Ordered collection of query records with a transient selection
pub struct QueryStore<S: KeyValueStorage> {
    storage: S,
    key: String,
    queries: Vec<QueryRecord>,
    selected: Option<usize>,
}

impl<S: KeyValueStorage> QueryStore<S> {
    /// Create an empty store over `storage`; call [`QueryStore::load`] to read it
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            queries: Vec::new(),
            selected: None,
        }
    }

    /// Create a store and load the collection in one step
    pub fn open(storage: S, key: impl Into<String>) -> (Self, LoadOutcome) {
        let mut store = Self::new(storage, key);
        let outcome = store.load();
        (store, outcome)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn storage_key(&self) -> &str {
        &self.key
    }

    pub fn queries(&self) -> &[QueryRecord] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&QueryRecord> {
        self.queries.get(index)
    }

    pub fn position_of(&self, id: i64) -> Option<usize> {
        self.queries.iter().position(|q| q.id == id)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&QueryRecord> {
        self.selected.and_then(|index| self.queries.get(index))
    }

    fn selected_mut(&mut self) -> Result<&mut QueryRecord> {
        let index = self.selected.ok_or(SnipqlError::NoSelection)?;
        self.queries.get_mut(index).ok_or(SnipqlError::NoSelection)
    }

    /// Current state for presentation
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot::build(&self.queries, self.selected)
    }

    /// Read the collection from storage.
    ///
    /// Records without an `order` get their position, then the collection is
    /// sorted by `order` and renumbered. Missing or unreadable data installs the
    /// single example record and tries to persist it. Selection is cleared.
    pub fn load(&mut self) -> LoadOutcome {
        self.selected = None;

        let stored = match self.storage.get(&self.key) {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "Failed to read stored queries");
                return self.recover(Some(error));
            }
        };

        let Some(raw) = stored else {
            tracing::info!(key = %self.key, "No stored queries, installing example");
            return self.recover(None);
        };

        match parse_stored(&raw) {
            Ok(queries) => {
                self.queries = queries;
                tracing::debug!(count = self.queries.len(), "Loaded queries from storage");
                LoadOutcome::Loaded {
                    count: self.queries.len(),
                }
            }
            Err(error) => {
                tracing::warn!(key = %self.key, %error, "Stored queries are corrupt, resetting");
                self.recover(Some(error))
            }
        }
    }

    fn recover(&mut self, error: Option<SnipqlError>) -> LoadOutcome {
        self.queries = vec![default_example_record()];
        let persist_error = self.persist().err();

        match error {
            Some(error) => LoadOutcome::Recovered {
                error,
                persist_error,
            },
            None => LoadOutcome::FirstRun { persist_error },
        }
    }

    /// Write the whole collection to storage.
    ///
    /// A failed write leaves the in-memory collection untouched.
    pub fn persist(&mut self) -> Result<()> {
        let json = serde_json::to_string(&self.queries)
            .map_err(|e| SnipqlError::StorageWrite(e.to_string()))?;

        match self.storage.set(&self.key, &json) {
            Ok(()) => {
                tracing::debug!(count = self.queries.len(), "Persisted queries");
                Ok(())
            }
            Err(error) => {
                tracing::error!(key = %self.key, %error, "Failed to persist queries");
                Err(match error {
                    SnipqlError::StorageWrite(_) => error,
                    other => SnipqlError::StorageWrite(other.to_string()),
                })
            }
        }
    }

    /// Append a blank record and select it
    pub fn create(&mut self) -> &QueryRecord {
        let id = self.next_id();
        let order = self.queries.len() as i64;
        let name = format!("New Query {}", self.queries.len() + 1);

        self.queries.push(QueryRecord::new(id, name, order));
        let index = self.queries.len() - 1;
        self.selected = Some(index);

        tracing::debug!(id, index, "Created query");
        &self.queries[index]
    }

    /// Creation timestamp in milliseconds, bumped past the largest existing id
    fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let start = match self.queries.iter().map(|q| q.id).max() {
            Some(max) if max >= now => max.saturating_add(1),
            _ => now,
        };
        self.free_ids(start, 1).first().copied().unwrap_or(start)
    }

    /// `count` ids not used by any record, ascending from `start` and
    /// wrapping to 1 once `i64::MAX` is reached
    fn free_ids(&self, start: i64, count: usize) -> Vec<i64> {
        let taken: HashSet<i64> = self.queries.iter().map(|q| q.id).collect();
        let start = start.max(1);
        (start..=i64::MAX)
            .chain(1..start)
            .filter(|id| !taken.contains(id))
            .take(count)
            .collect()
    }

    /// Select the record at `index`; out of range clears the selection
    pub fn select(&mut self, index: usize) -> Option<&QueryRecord> {
        self.selected = (index < self.queries.len()).then_some(index);
        self.selected()
    }

    /// Apply name and template edits to the selected record.
    ///
    /// Template edits re-derive the variable map, keeping values for names
    /// that are still present.
    pub fn update(&mut self, edit: QueryEdit) -> Result<VariableChanges> {
        let record = self.selected_mut()?;

        if let Some(name) = edit.name {
            record.name = name;
        }

        let changes = match edit.sql {
            Some(sql) => record.set_sql(sql),
            None => record.reconcile(),
        };

        if !changes.is_empty() {
            tracing::debug!(
                id = record.id,
                added = ?changes.added,
                removed = ?changes.removed,
                "Variables reconciled"
            );
        }

        Ok(changes)
    }

    /// Set the value of one of the selected record's variables
    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let record = self.selected_mut()?;
        match record.variables.get_mut(name) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(SnipqlError::UnknownVariable(name.to_string())),
        }
    }

    /// Substituted text of the selected record
    pub fn substituted(&self) -> Result<String> {
        let record = self.selected().ok_or(SnipqlError::NoSelection)?;
        Ok(substitute(&record.sql, &record.variables))
    }

    /// Preview text for the selected record, including the empty-state texts
    pub fn preview(&self) -> String {
        preview_text(self.selected())
    }

    /// Remove the selected record.
    ///
    /// Callers are responsible for confirming with the user first. Selection
    /// moves to the first record, or to none when the collection is empty.
    pub fn delete_selected(&mut self) -> Result<QueryRecord> {
        let index = self
            .selected
            .filter(|&i| i < self.queries.len())
            .ok_or(SnipqlError::NoSelection)?;

        let removed = self.queries.remove(index);
        renumber(&mut self.queries);
        self.selected = if self.queries.is_empty() { None } else { Some(0) };

        tracing::debug!(id = removed.id, "Deleted query");
        Ok(removed)
    }

    /// Move one record from `from` to `to` and renumber every `order`.
    ///
    /// `to` is clamped to the last position. The selection follows the record
    /// that was selected before the move.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.queries.len();
        if from >= len {
            return Err(SnipqlError::IndexOutOfRange { index: from, len });
        }

        let selected_id = self.selected().map(|q| q.id);

        let moved = self.queries.remove(from);
        let to = to.min(self.queries.len());
        self.queries.insert(to, moved);
        renumber(&mut self.queries);

        if let Some(id) = selected_id {
            self.selected = self.position_of(id);
        }

        tracing::debug!(from, to, "Reordered queries");
        Ok(())
    }

    /// Export document for the current collection
    pub fn export(&self) -> Result<QueryExport> {
        if self.queries.is_empty() {
            return Err(SnipqlError::NothingToExport);
        }
        Ok(QueryExport::new(self.queries.clone()))
    }

    /// Start an import.
    ///
    /// An empty store takes the records immediately in `Add` mode. Otherwise
    /// nothing changes and the caller must pick a mode and call
    /// [`QueryStore::finish_import`].
    pub fn begin_import(&mut self, bundle: ImportBundle) -> ImportStep {
        if self.queries.is_empty() {
            ImportStep::Completed(self.apply_import(bundle, MergeMode::Add))
        } else {
            ImportStep::NeedsMergeMode(PendingImport {
                bundle,
                current_count: self.queries.len(),
            })
        }
    }

    /// Complete an import started with [`QueryStore::begin_import`]
    pub fn finish_import(&mut self, pending: PendingImport, mode: MergeMode) -> ImportSummary {
        self.apply_import(pending.bundle, mode)
    }

    /// Merge `bundle` into the collection.
    ///
    /// `Add` appends after the current maximum `order`, gives each record a
    /// name no other record uses, and offsets ids above the current maximum id
    /// unless the store is empty. `Replace` keeps the imported ids and orders.
    /// Selection resets to the first record, or none when empty.
    pub fn apply_import(&mut self, bundle: ImportBundle, mode: MergeMode) -> ImportSummary {
        let imported = bundle.len();
        tracing::debug!(
            version = bundle.version.as_deref().unwrap_or("unknown"),
            export_date = bundle.export_date.as_deref().unwrap_or("unknown"),
            imported,
            "Applying import"
        );

        match mode {
            MergeMode::Add => {
                // Validated bundles have unique ids, so they only need moving
                // when something is already in the store.
                let keep_ids = self.queries.is_empty();
                let fresh_ids = if keep_ids {
                    Vec::new()
                } else {
                    let max_id = self.queries.iter().map(|q| q.id).max().unwrap_or(0);
                    self.free_ids(max_id.saturating_add(1), imported)
                };
                let max_order = self.queries.iter().map(|q| q.order).max().unwrap_or(-1);
                let mut taken: HashSet<String> =
                    self.queries.iter().map(|q| q.name.clone()).collect();

                for (index, incoming) in bundle.records.into_iter().enumerate() {
                    let name = unique_name(&incoming.name, &taken);
                    taken.insert(name.clone());

                    let mut record = QueryRecord {
                        id: fresh_ids.get(index).copied().unwrap_or(incoming.id),
                        name,
                        sql: incoming.sql,
                        variables: incoming.variables,
                        order: max_order + index as i64 + 1,
                    };
                    record.reconcile();
                    self.queries.push(record);
                }
                self.queries.sort_by_key(|q| q.order);
            }
            MergeMode::Replace => {
                self.queries = bundle
                    .records
                    .into_iter()
                    .enumerate()
                    .map(|(index, incoming)| {
                        let mut record = QueryRecord {
                            id: incoming.id,
                            name: incoming.name,
                            sql: incoming.sql,
                            variables: incoming.variables,
                            order: incoming.order.unwrap_or(index as i64),
                        };
                        record.reconcile();
                        record
                    })
                    .collect();
                normalize_order(&mut self.queries);
            }
        }

        self.selected = if self.queries.is_empty() { None } else { Some(0) };

        let summary = ImportSummary {
            mode,
            imported,
            total: self.queries.len(),
        };
        tracing::info!(mode = %mode, imported, total = summary.total, "Imported queries");
        summary
    }
}

fn parse_stored(raw: &str) -> Result<Vec<QueryRecord>> {
    let stored: Vec<StoredRecord> =
        serde_json::from_str(raw).map_err(|e| SnipqlError::Parse(e.to_string()))?;

    let mut queries: Vec<QueryRecord> = stored
        .into_iter()
        .enumerate()
        .map(|(position, record)| record.into_record(position))
        .collect();
    normalize_order(&mut queries);

    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interchange::parse_import;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    const KEY: &str = "queries";

    fn store_with(names: &[&str]) -> QueryStore<MemoryStorage> {
        let mut store = QueryStore::new(MemoryStorage::new(), KEY);
        for (i, name) in names.iter().enumerate() {
            store.queries.push(QueryRecord::new(i as i64 + 1, *name, i as i64));
        }
        store
    }

    fn ids(store: &QueryStore<MemoryStorage>) -> Vec<i64> {
        store.queries().iter().map(|q| q.id).collect()
    }

    fn orders(store: &QueryStore<MemoryStorage>) -> Vec<i64> {
        store.queries().iter().map(|q| q.order).collect()
    }

    #[test]
    fn test_create_appends_and_selects() {
        let mut store = store_with(&["a", "b"]);
        let created = store.create().clone();

        assert_eq!(created.name, "New Query 3");
        assert_eq!(created.order, 2);
        assert!(created.sql.is_empty());
        assert!(created.variables.is_empty());
        assert_eq!(store.selected_index(), Some(2));
    }

    #[test]
    fn test_create_ids_are_unique() {
        let mut store = store_with(&[]);
        let first = store.create().id;
        let second = store.create().id;
        let third = store.create().id;
        assert!(first < second && second < third);
    }

    #[test]
    fn test_create_id_bumps_past_future_ids() {
        let mut store = store_with(&[]);
        store.queries.push(QueryRecord::new(i64::MAX - 10, "future", 0));
        assert_eq!(store.create().id, i64::MAX - 9);
    }

    #[test]
    fn test_create_after_largest_id_picks_unused_id() {
        let mut store = store_with(&["a"]);
        store.queries.push(QueryRecord::new(i64::MAX, "last", 1));

        let id = store.create().id;
        assert!(id > 0);
        assert_ne!(id, i64::MAX);
        assert_ne!(id, 1);

        let next = store.create().id;
        assert!(![1, i64::MAX, id].contains(&next));
    }

    #[test]
    fn test_add_import_after_largest_id_keeps_ids_unique() {
        let mut store = store_with(&["a"]);
        store.queries.push(QueryRecord::new(i64::MAX, "last", 1));

        let bundle = parse_import(
            r#"{ "queries": [
                { "id": 1, "name": "x", "sql": "", "variables": {} },
                { "id": 2, "name": "y", "sql": "", "variables": {} }
            ] }"#,
        )
        .unwrap();
        let summary = store.apply_import(bundle, MergeMode::Add);
        assert_eq!(summary.total, 4);

        let unique: HashSet<i64> = ids(&store).into_iter().collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(ids(&store)[2..].to_vec(), vec![2, 3]);
        assert_eq!(orders(&store), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_select_out_of_range_clears() {
        let mut store = store_with(&["a"]);
        assert!(store.select(0).is_some());
        assert!(store.select(5).is_none());
        assert_eq!(store.selected_index(), None);
    }

    #[test]
    fn test_update_reconciles_variables() {
        let mut store = store_with(&["a"]);
        store.select(0);
        store.update(QueryEdit::sql("[a][b]")).unwrap();
        store.set_variable("a", "1").unwrap();
        store.set_variable("b", "2").unwrap();

        let changes = store
            .update(QueryEdit::name("renamed").with_sql("[b][c]"))
            .unwrap();

        let record = store.selected().unwrap();
        assert_eq!(record.name, "renamed");
        let pairs: Vec<(&str, &str)> = record
            .variables
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(pairs, vec![("b", "2"), ("c", "")]);
        assert_eq!(changes.removed, vec!["a"]);
    }

    #[test]
    fn test_update_without_selection_fails() {
        let mut store = store_with(&["a"]);
        assert!(matches!(
            store.update(QueryEdit::sql("x")),
            Err(SnipqlError::NoSelection)
        ));
    }

    #[test]
    fn test_set_unknown_variable_rejected() {
        let mut store = store_with(&["a"]);
        store.select(0);
        store.update(QueryEdit::sql("[a]")).unwrap();
        assert!(matches!(
            store.set_variable("zzz", "1"),
            Err(SnipqlError::UnknownVariable(_))
        ));
        assert_eq!(store.selected().unwrap().variables.len(), 1);
    }

    #[test]
    fn test_substituted() {
        let mut store = store_with(&["a"]);
        store.select(0);
        store.update(QueryEdit::sql("SELECT * WHERE x=[a]")).unwrap();
        store.set_variable("a", "5").unwrap();
        assert_eq!(store.substituted().unwrap(), "SELECT * WHERE x=5");
        assert_eq!(store.preview(), "SELECT * WHERE x=5");
    }

    #[test]
    fn test_delete_moves_selection_to_first() {
        let mut store = store_with(&["a", "b", "c"]);
        store.select(2);
        let removed = store.delete_selected().unwrap();

        assert_eq!(removed.name, "c");
        assert_eq!(store.len(), 2);
        assert_eq!(store.selected_index(), Some(0));
    }

    #[test]
    fn test_delete_then_create_keeps_orders_dense() {
        let mut store = store_with(&[]);
        for _ in 0..3 {
            store.create();
        }

        store.select(0);
        store.delete_selected().unwrap();
        assert_eq!(orders(&store), vec![0, 1]);

        store.create();
        assert_eq!(orders(&store), vec![0, 1, 2]);

        store.select(1);
        store.delete_selected().unwrap();
        store.create();
        assert_eq!(orders(&store), vec![0, 1, 2]);
    }

    #[test]
    fn test_delete_last_clears_selection() {
        let mut store = store_with(&["a"]);
        store.select(0);
        store.delete_selected().unwrap();
        assert!(store.is_empty());
        assert_eq!(store.selected_index(), None);
        assert!(matches!(store.delete_selected(), Err(SnipqlError::NoSelection)));
    }

    #[test]
    fn test_reorder_renumbers_and_keeps_selection() {
        let mut store = store_with(&["a", "b", "c", "d", "e"]);
        store.select(1);

        store.reorder(2, 0).unwrap();

        assert_eq!(ids(&store), vec![3, 1, 2, 4, 5]);
        assert_eq!(orders(&store), vec![0, 1, 2, 3, 4]);
        assert_eq!(store.selected().map(|q| q.id), Some(2));
        assert_eq!(store.selected_index(), Some(2));
    }

    #[test]
    fn test_reorder_moving_selected_record() {
        let mut store = store_with(&["a", "b", "c"]);
        store.select(0);
        store.reorder(0, 2).unwrap();
        assert_eq!(ids(&store), vec![2, 3, 1]);
        assert_eq!(store.selected_index(), Some(2));
    }

    #[test]
    fn test_reorder_clamps_target_and_rejects_source() {
        let mut store = store_with(&["a", "b", "c"]);
        store.reorder(0, 99).unwrap();
        assert_eq!(ids(&store), vec![2, 3, 1]);

        assert!(matches!(
            store.reorder(3, 0),
            Err(SnipqlError::IndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_persist_failure_keeps_memory() {
        let mut store = store_with(&["a", "b"]);
        store.storage_mut().set_fail_writes(true);

        let err = store.persist().unwrap_err();
        assert!(matches!(err, SnipqlError::StorageWrite(_)));
        assert_eq!(store.len(), 2);
        assert_eq!(store.storage().raw(KEY), None);
    }

    #[test]
    fn test_load_missing_order_and_sorting() {
        let raw = r#"[
            {"id": 10, "name": "second", "sql": "", "variables": {}, "order": 5},
            {"id": 11, "name": "legacy", "sql": "[v]", "variables": {"v": "x"}},
            {"id": 12, "name": "first", "sql": "", "variables": {}, "order": 0}
        ]"#;
        let storage = MemoryStorage::new().with_entry(KEY, raw);
        let (store, outcome) = QueryStore::open(storage, KEY);

        assert!(matches!(outcome, LoadOutcome::Loaded { count: 3 }));
        let names: Vec<&str> = store.queries().iter().map(|q| q.name.as_str()).collect();
        assert_eq!(names, vec!["first", "legacy", "second"]);
        assert_eq!(orders(&store), vec![0, 1, 2]);
        assert_eq!(store.selected_index(), None);
    }

    #[test]
    fn test_load_corrupt_falls_back_to_example() {
        let storage = MemoryStorage::new().with_entry(KEY, "{ definitely not an array");
        let (store, outcome) = QueryStore::open(storage, KEY);

        assert!(matches!(
            outcome,
            LoadOutcome::Recovered {
                error: SnipqlError::Parse(_),
                persist_error: None
            }
        ));
        assert_eq!(store.len(), 1);
        assert_eq!(store.queries()[0].order, 0);
        assert_eq!(store.queries()[0], default_example_record());
    }

    #[test]
    fn test_load_first_run_persists_example() {
        let (store, outcome) = QueryStore::open(MemoryStorage::new(), KEY);

        assert!(matches!(outcome, LoadOutcome::FirstRun { persist_error: None }));
        assert_eq!(store.len(), 1);
        assert!(store.storage().raw(KEY).is_some());
    }

    #[test]
    fn test_load_read_failure_recovers_in_memory() {
        let mut storage = MemoryStorage::new();
        storage.set_fail_reads(true);
        storage.set_fail_writes(true);
        let (store, outcome) = QueryStore::open(storage, KEY);

        match outcome {
            LoadOutcome::Recovered {
                error,
                persist_error,
            } => {
                assert!(matches!(error, SnipqlError::StorageRead(_)));
                assert!(matches!(persist_error, Some(SnipqlError::StorageWrite(_))));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_export_empty_refused() {
        let store = store_with(&[]);
        assert!(matches!(store.export(), Err(SnipqlError::NothingToExport)));
    }
}
