//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Namespace does not exist.
    #[error("namespace not found: {0}")]
    NamespaceNotFound(String),

    /// Multipart upload is unknown, completed or aborted.
    #[error("multipart upload not found: {0}")]
    UploadNotFound(String),

    /// A part referenced on completion is missing or does not match.
    #[error("invalid part {part_number} for upload {upload_id}: {reason}")]
    InvalidPart {
        upload_id: String,
        part_number: u32,
        reason: String,
    },

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The backend could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
