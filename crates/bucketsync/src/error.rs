//! Error types for the bucketsync facade.

use bucketsync_store::StoreError;
use bucketsync_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during bucketsync operations.
#[derive(Debug, Error)]
pub enum BucketsyncError {
    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Sync pass aborted.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Local filesystem error outside a sync pass.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking task could not be joined.
    #[error("task failed: {0}")]
    Task(String),
}

/// Result type for bucketsync operations.
pub type Result<T> = std::result::Result<T, BucketsyncError>;
