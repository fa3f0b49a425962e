//! snipql store - the persisted query collection
//!
//! This crate owns the ordered collection of SQL snippets:
//!
//! - **Records**: `QueryRecord` with its template text and placeholder values
//! - **Store**: create, select, edit, delete and reorder, with a transient selection
//! - **Persistence**: a JSON document under one key in a `KeyValueStorage`
//!   (SQLite on disk, or memory)
//! - **Interchange**: export documents and validated, mode-aware imports
//! - **Snapshots**: `StoreSnapshot` for presentation layers to render
//!
//! ## Example
//!
//! ```rust
//! use snipql_store::{MemoryStorage, QueryEdit, QueryStore};
//!
//! let (mut store, _outcome) = QueryStore::open(MemoryStorage::new(), "queries");
//! store.create();
//! store.update(QueryEdit::sql("SELECT * FROM users WHERE id = [id]")).unwrap();
//! store.set_variable("id", "42").unwrap();
//!
//! assert_eq!(store.substituted().unwrap(), "SELECT * FROM users WHERE id = 42");
//! store.persist().unwrap();
//! ```

pub mod interchange;
mod record;
mod snapshot;
mod storage;
mod store;

pub use interchange::{
    EXPORT_FORMAT_VERSION, ImportBundle, ImportStep, ImportSummary, ImportedRecord, MAX_RECORD_ID,
    MergeMode, PendingImport, QueryExport, export_file_name, parse_import,
};
pub use record::{QueryRecord, default_example_record, normalize_order, renumber};
pub use snapshot::{
    EMPTY_QUERY_PREVIEW, NO_SELECTION_PREVIEW, QuerySummary, SelectedQuery, StoreSnapshot,
    preview_text,
};
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage};
pub use store::{LoadOutcome, QueryEdit, QueryStore};
