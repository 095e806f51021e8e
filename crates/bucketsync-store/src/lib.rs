//! # Bucketsync Store
//!
//! Object-store abstraction for bucketsync. Provides a trait-based interface
//! to a flat key/object namespace with SQLite and in-memory implementations.
//!
//! ## Overview
//!
//! The store module abstracts the remote bucket behind the [`ObjectStore`]
//! trait, so the sync engine never depends on a concrete cloud SDK. A
//! production deployment implements the trait over its SDK client;
//! [`SqliteStore`] is a persistent local target and [`MemoryStore`] serves
//! tests.
//!
//! ## Key Types
//!
//! - [`ObjectStore`] - The async trait for listing and uploading objects
//! - [`ObjectStoreExt`] - Paginated [`Listing`] and `list_all` helpers
//! - [`SqliteStore`] - SQLite-based persistent object store
//! - [`MemoryStore`] - In-memory object store for tests
//! - [`ObjectSummary`] - A listed object with its store-reported fingerprint
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bucketsync_core::{Namespace, ObjectKey};
//! use bucketsync_store::{ObjectStore, ObjectStoreExt, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("bucket.db").unwrap();
//!     let namespace = Namespace::from("my-site");
//!     store.create_namespace(&namespace).unwrap();
//!
//!     let key = ObjectKey::from("index.html");
//!     let etag = store
//!         .put_object(&namespace, &key, "<html/>".into(), "text/html")
//!         .await
//!         .unwrap();
//!
//!     let objects = store.list_all(&namespace, 1000).await.unwrap();
//!     assert_eq!(objects[0].fingerprint, etag);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **S3-compatible ETags**: single puts report the MD5 of the body;
//!   multipart uploads report the composite `<md5-of-part-digests>-<n>`.
//! - **Overwrite semantics**: writing an existing key replaces it.
//! - **Key-ordered listings**: pages are returned in ascending key order and
//!   the continuation token is the last key of the previous page.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    CompletedPart, Listing, ObjectPage, ObjectStore, ObjectStoreExt, ObjectSummary,
    StoredObject, UploadId,
};

/// Get current time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
