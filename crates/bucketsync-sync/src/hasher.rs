//! File fingerprinting.

use std::fs::File;
use std::io;
use std::path::Path;

use bucketsync_core::{fingerprint_reader, Fingerprint};

/// Computes file fingerprints with a fixed chunk size.
///
/// The chunk size must equal the part size the transport uses, otherwise
/// local fingerprints of large files never match the stored ETags.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    chunk_size: usize,
}

impl Hasher {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Fingerprint the file at `path`.
    ///
    /// Blocking; run it off the async runtime.
    pub fn fingerprint(&self, path: &Path) -> io::Result<Fingerprint> {
        let file = File::open(path)?;
        fingerprint_reader(file, self.chunk_size)
    }
}
