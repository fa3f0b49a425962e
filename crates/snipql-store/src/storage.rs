//! Key-value storage backends
//!
//! The collection is persisted as one JSON document under a fixed key, the
//! same way a browser page would use local storage. `SqliteStorage` keeps the
//! documents in a small SQLite database; `MemoryStorage` is for tests and
//! ephemeral sessions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, params};
use snipql_core::{Result, SnipqlError};

/// String-keyed document storage
pub trait KeyValueStorage {
    /// Read the document stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous document
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// SQLite-backed key-value storage
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Open or create the storage database at `db_path`
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let storage = Self { db_path };
        storage.initialize_schema()?;

        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        Connection::open(&self.db_path)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.connect().map_err(|e| {
            SnipqlError::StorageRead(format!(
                "failed to open database at {}: {}",
                self.db_path.display(),
                e
            ))
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| SnipqlError::StorageWrite(e.to_string()))?;

        Ok(())
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .connect()
            .map_err(|e| SnipqlError::StorageRead(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SnipqlError::StorageRead(e.to_string())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .connect()
            .map_err(|e| SnipqlError::StorageWrite(e.to_string()))?;
        let now = chrono::Utc::now().to_rfc3339();

        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )
        .map_err(|e| SnipqlError::StorageWrite(e.to_string()))?;

        Ok(())
    }
}

/// In-memory key-value storage
///
/// Reads and writes can be made to fail, to exercise the store's recovery paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Raw document under `key`, bypassing failure injection
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(SnipqlError::StorageRead("storage is unavailable".into()));
        }
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if self.fail_writes {
            return Err(SnipqlError::StorageWrite("storage quota exceeded".into()));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
