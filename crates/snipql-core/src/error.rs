//! Error types for snipql

use thiserror::Error;

/// Core error type for snipql operations
#[derive(Error, Debug)]
pub enum SnipqlError {
    #[error("Failed to save queries: {0}")]
    StorageWrite(String),

    #[error("Failed to read stored queries: {0}")]
    StorageRead(String),

    #[error("Stored queries are corrupt: {0}")]
    Parse(String),

    #[error("Invalid file format: {0}")]
    ImportFormat(String),

    #[error("Query {position} has an invalid format: {reason}")]
    ImportRecord { position: usize, reason: String },

    #[error("Failed to copy query: {0}")]
    Clipboard(String),

    #[error("No query is selected")]
    NoSelection,

    #[error("Index {index} is out of range for {len} queries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("No queries to export")]
    NothingToExport,

    #[error("No import is waiting for a merge mode")]
    NoPendingImport,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for snipql operations
pub type Result<T> = std::result::Result<T, SnipqlError>;
