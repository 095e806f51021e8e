//! Content fingerprints compatible with multipart object-store ETags.
//!
//! A fingerprint is computed over fixed-size chunks:
//!
//! - one chunk: `hex(md5(chunk))`
//! - `n >= 2` chunks: `hex(md5(md5(c1) || md5(c2) || ... || md5(cn))) + "-n"`
//!
//! where `||` concatenates the raw 16-byte digests. This is the format an
//! S3-style store reports for objects uploaded in parts of the same size,
//! so the chunk size used here must be the part size used for transfer.

use std::fmt;
use std::io::{self, Read};
use std::str::FromStr;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default chunk size: 8 MiB, the multipart threshold and part size of the
/// common S3 transfer managers.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Read buffer used when hashing from a reader.
const READ_BUFFER: usize = 64 * 1024;

/// MD5 of zero bytes, the ETag stores report for an empty object.
const EMPTY_MD5_HEX: &str = "d41d8cd98f00b204e9800998ecf8427e";

/// An opaque content identity token.
///
/// Only equality is meaningful. The textual form is either `"<hex32>"` or
/// `"<hex32>-<n>"`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a fingerprint reported by a remote store.
    ///
    /// Stores commonly quote ETags (`"\"abc\""`); surrounding quotes are
    /// dropped, nothing else is touched.
    pub fn from_remote(etag: impl AsRef<str>) -> Self {
        let etag = etag.as_ref().trim();
        let unquoted = etag
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(etag);
        Self(unquoted.to_string())
    }

    /// Parse and validate a fingerprint's textual form.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let (digest, count) = match s.split_once('-') {
            Some((digest, count)) => (digest, Some(count)),
            None => (s, None),
        };

        if digest.len() != 32 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::MalformedFingerprint(s.to_string()));
        }

        if let Some(count) = count {
            match count.parse::<u32>() {
                Ok(n) if n >= 1 => {}
                _ => return Err(CoreError::MalformedFingerprint(s.to_string())),
            }
        }

        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Fingerprint of zero-length content.
    pub fn empty() -> Self {
        Self(EMPTY_MD5_HEX.to_string())
    }

    /// Single-chunk fingerprint from a raw chunk digest.
    pub fn from_digest(digest: &[u8; 16]) -> Self {
        Self(hex::encode(digest))
    }

    /// Composite fingerprint from the raw digests of every chunk, in order.
    ///
    /// A single digest still yields the composite `-1` form; that is what a
    /// store reports for a multipart upload with one part.
    pub fn from_part_digests(digests: &[[u8; 16]]) -> Self {
        let mut outer = Md5::new();
        for digest in digests {
            outer.update(digest);
        }
        Self(format!("{}-{}", hex::encode(outer.finalize()), digests.len()))
    }

    /// The textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of chunks for composite fingerprints, `None` for single-chunk ones.
    pub fn chunk_count(&self) -> Option<u32> {
        self.0.split_once('-').and_then(|(_, n)| n.parse().ok())
    }

    /// Whether this fingerprint has the composite `-n` form.
    pub fn is_composite(&self) -> bool {
        self.chunk_count().is_some()
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Streaming chunked hasher.
///
/// Input may arrive in slices of any length; chunk boundaries are placed
/// every `chunk_size` bytes of total input.
pub struct ChunkHasher {
    chunk_size: usize,
    current: Md5,
    current_len: usize,
    digests: Vec<[u8; 16]>,
}

impl ChunkHasher {
    /// Create a hasher with the given chunk size.
    pub fn new(chunk_size: usize) -> Result<Self, CoreError> {
        if chunk_size == 0 {
            return Err(CoreError::ZeroChunkSize);
        }
        Ok(Self {
            chunk_size,
            current: Md5::new(),
            current_len: 0,
            digests: Vec::new(),
        })
    }

    /// Feed more content.
    pub fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            // A full chunk is only closed once more input shows up, so content
            // of exactly `chunk_size` bytes stays a single chunk.
            if self.current_len == self.chunk_size {
                self.close_chunk();
            }
            let take = data.len().min(self.chunk_size - self.current_len);
            self.current.update(&data[..take]);
            self.current_len += take;
            data = &data[take..];
        }
    }

    /// Number of chunks seen so far, counting a partially filled one.
    pub fn chunks(&self) -> usize {
        self.digests.len() + usize::from(self.current_len > 0)
    }

    /// Finish hashing.
    ///
    /// Returns `None` if no content was fed at all.
    pub fn finish(mut self) -> Option<Fingerprint> {
        if self.current_len > 0 {
            self.close_chunk();
        }

        match self.digests.as_slice() {
            [] => None,
            [single] => Some(Fingerprint::from_digest(single)),
            many => Some(Fingerprint::from_part_digests(many)),
        }
    }

    fn close_chunk(&mut self) {
        let hasher = std::mem::take(&mut self.current);
        self.digests.push(into_raw(hasher.finalize().as_slice()));
        self.current_len = 0;
    }
}

/// Raw MD5 digest of one chunk or part.
pub fn md5_digest(data: &[u8]) -> [u8; 16] {
    into_raw(Md5::digest(data).as_slice())
}

fn into_raw(digest: &[u8]) -> [u8; 16] {
    let mut raw = [0u8; 16];
    raw.copy_from_slice(digest);
    raw
}

/// Fingerprint an in-memory buffer.
///
/// Empty input maps to [`Fingerprint::empty`].
pub fn fingerprint_bytes(data: &[u8], chunk_size: usize) -> Result<Fingerprint, CoreError> {
    let mut hasher = ChunkHasher::new(chunk_size)?;
    hasher.update(data);
    Ok(hasher.finish().unwrap_or_else(Fingerprint::empty))
}

/// Fingerprint everything a reader yields.
///
/// Empty input maps to [`Fingerprint::empty`].
pub fn fingerprint_reader<R: Read>(mut reader: R, chunk_size: usize) -> io::Result<Fingerprint> {
    let mut hasher = ChunkHasher::new(chunk_size)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut buffer = vec![0u8; READ_BUFFER];

    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finish().unwrap_or_else(Fingerprint::empty))
}
