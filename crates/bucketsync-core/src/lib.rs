//! # Bucketsync Core
//!
//! Pure primitives for bucketsync: content fingerprints, object keys and
//! content-type guessing.
//!
//! This crate does no networking and touches the filesystem only through
//! the caller-supplied readers it hashes.
//!
//! ## Key Types
//!
//! - [`Fingerprint`] - Content identity token compatible with multipart ETags
//! - [`ChunkHasher`] - Streaming chunked MD5 hasher producing a [`Fingerprint`]
//! - [`ObjectKey`] - Slash-separated key of an object in a namespace
//! - [`FileEntry`] - A local file paired with the key it syncs to
//!
//! ## Fingerprints
//!
//! Content is split into fixed windows of [`CHUNK_SIZE`] bytes. A single
//! window hashes to its hex MD5; several windows hash to the MD5 of the
//! concatenated raw window digests, suffixed with `-<count>`. See
//! [`fingerprint`] module.

pub mod content_type;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod key;

pub use content_type::{content_type_for, DEFAULT_CONTENT_TYPE};
pub use entry::FileEntry;
pub use error::CoreError;
pub use fingerprint::{
    fingerprint_bytes, fingerprint_reader, md5_digest, ChunkHasher, Fingerprint, CHUNK_SIZE,
};
pub use key::{Namespace, ObjectKey};
