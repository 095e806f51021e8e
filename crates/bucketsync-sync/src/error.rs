//! Error types for the sync module.

use std::path::PathBuf;

use thiserror::Error;

use bucketsync_core::ObjectKey;
use bucketsync_store::StoreError;

/// Two local paths that normalize to the same object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    pub key: ObjectKey,
    pub first: PathBuf,
    pub second: PathBuf,
}

/// Errors that abort a whole sync pass.
///
/// Per-file problems never surface here; they are recorded in the
/// [`SyncReport`](crate::SyncReport).
#[derive(Debug, Error)]
pub enum SyncError {
    /// The sync root is missing or not a directory.
    #[error("sync root not found or not a directory: {}", .path.display())]
    NotFound { path: PathBuf },

    /// The sync root exists but could not be listed.
    #[error("cannot read sync root {}: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Distinct local paths map to the same key.
    #[error("{} local path(s) collide with another path's key", .0.len())]
    DuplicateKey(Vec<KeyCollision>),

    /// The remote listing could not be loaded.
    #[error("manifest load failed: {0}")]
    ManifestLoad(#[source] StoreError),

    /// Configuration rejected before any work started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A background task could not be joined.
    #[error("task failed: {0}")]
    Task(String),
}

/// Failure of one file's transfer.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The local file could not be read for upload.
    #[error("reading {key} for upload failed: {source}")]
    Read {
        key: ObjectKey,
        #[source]
        source: std::io::Error,
    },

    /// The store rejected a request.
    #[error("uploading {key} failed: {source}")]
    Store {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },
}

impl TransferError {
    /// The key whose upload failed.
    pub fn key(&self) -> &ObjectKey {
        match self {
            TransferError::Read { key, .. } | TransferError::Store { key, .. } => key,
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
