//! Deterministic traversal of a local directory tree.
//!
//! Traversal is delegated to `walkdir`, which keeps its own stack of open
//! directories, so tree depth never grows the call stack. Siblings are
//! visited in sorted name order and yielded depth-first:
//!
//! ```text
//! a.txt
//! b/x.txt
//! b/y/z.txt
//! c.txt
//! ```
//!
//! Only regular files are yielded. Symbolic links (to files or
//! directories) and special files are skipped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use bucketsync_core::{FileEntry, ObjectKey};

use crate::error::{Result, SyncError};

/// A path below the root that could not be inspected or listed.
#[derive(Debug, Error)]
#[error("cannot read {}: {source}", .path.display())]
pub struct WalkError {
    pub path: PathBuf,
    pub key: ObjectKey,
    #[source]
    pub source: io::Error,
}

/// Lazy depth-first iterator over the regular files below a root.
pub struct TreeWalker {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

impl TreeWalker {
    /// Start a walk at `root`.
    ///
    /// The root is canonicalized and must be a readable directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let given = root.as_ref();
        let root = fs::canonicalize(given).map_err(|_| SyncError::NotFound {
            path: given.to_path_buf(),
        })?;

        if !root.is_dir() {
            return Err(SyncError::NotFound {
                path: given.to_path_buf(),
            });
        }

        fs::read_dir(&root).map_err(|source| SyncError::RootUnreadable {
            path: root.clone(),
            source,
        })?;

        let inner = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Ok(Self { root, inner })
    }

    /// The canonical root of this walk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_for(&self, path: &Path) -> io::Result<ObjectKey> {
        let relative = path
            .strip_prefix(&self.root)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        ObjectKey::from_relative_path(relative)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }

    fn error(&self, path: PathBuf, source: io::Error) -> WalkError {
        let key = self
            .key_for(&path)
            .unwrap_or_else(|_| ObjectKey::new(path.display().to_string()));
        WalkError { path, key, source }
    }

    fn walk_error(&self, err: walkdir::Error) -> WalkError {
        let path = err
            .path()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        self.error(path, io::Error::from(err))
    }
}

impl Iterator for TreeWalker {
    type Item = std::result::Result<FileEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(self.walk_error(err))),
            };
            let file_type = entry.file_type();

            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_file() {
                tracing::warn!(path = %entry.path().display(), "skipping non-regular file");
                continue;
            }

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(err) => return Some(Err(self.walk_error(err))),
            };
            let path = entry.into_path();
            return Some(match self.key_for(&path) {
                Ok(key) => Ok(FileEntry::new(path, key, metadata.len())),
                Err(source) => Err(self.error(path, source)),
            });
        }
    }
}
