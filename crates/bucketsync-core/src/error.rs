//! Error types for bucketsync core.

use thiserror::Error;

/// Errors raised while building core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid object key {path:?}: {reason}")]
    InvalidKey { path: String, reason: &'static str },

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("malformed fingerprint: {0}")]
    MalformedFingerprint(String),
}
