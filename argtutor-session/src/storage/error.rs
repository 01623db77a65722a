//! Error types for snapshot storage.

use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Database error from libSQL.
    #[error("database error: {0}")]
    Database(#[from] libsql::Error),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Database directory could not be created.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid data in the database.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Another snapshot already occupies this step of the project.
    #[error("project {project} already has a snapshot at step {step}")]
    StepTaken { project: String, step: u64 },

    /// Snapshot not found.
    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),
}
