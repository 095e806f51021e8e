//! Local file entries produced by a tree walk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::key::ObjectKey;

/// A regular file under the sync root and the key it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path on the local filesystem.
    pub absolute_path: PathBuf,
    /// Key relative to the sync root, `/`-separated.
    pub key: ObjectKey,
    /// Size in bytes at walk time.
    pub size: u64,
}

impl FileEntry {
    pub fn new(absolute_path: PathBuf, key: ObjectKey, size: u64) -> Self {
        Self {
            absolute_path,
            key,
            size,
        }
    }
}
