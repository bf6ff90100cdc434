//! Error types for the local job store

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur when reading or writing the local job store
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite operation failed
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Stored JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record for this job already exists in the pending or completed set
    #[error("Job {0} is already tracked")]
    Duplicate(String),

    /// A stored value does not decode into a domain type
    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}
