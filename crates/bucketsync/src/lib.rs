//! # Bucketsync
//!
//! Incremental synchronization of local directories into object-store
//! namespaces.
//!
//! ## Overview
//!
//! Bucketsync uploads exactly the files that changed since the last sync.
//! Change detection needs no local state: every file is fingerprinted the
//! way the store computes its ETag (plain MD5, or the multipart composite
//! for files above the chunk size) and compared against the remote listing.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bucketsync::{Syncer, SyncerConfig};
//! use bucketsync::store::SqliteStore;
//!
//! async fn example() {
//!     // Open storage
//!     let store = SqliteStore::open("objects.db").unwrap();
//!     store.create_namespace(&"site".into()).unwrap();
//!
//!     // Create the syncer
//!     let syncer = Syncer::new(store, SyncerConfig::default()).unwrap();
//!
//!     // Upload new and changed files
//!     let report = syncer.sync("./public", "site").await.unwrap();
//!     for failure in report.failures() {
//!         eprintln!("{}: {:?}", failure.key, failure.status);
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `bucketsync::core` - Fingerprints, keys and content types
//! - `bucketsync::store` - The object-store boundary, memory and SQLite stores
//! - `bucketsync::sync` - Walker, manifest, transport and sync engine

pub mod error;
pub mod syncer;

// Re-export component crates
pub use bucketsync_core as core;
pub use bucketsync_store as store;
pub use bucketsync_sync as sync;

// Re-export main types for convenience
pub use error::{BucketsyncError, Result};
pub use syncer::{Syncer, SyncerConfig};

pub use bucketsync_core::{Fingerprint, Namespace, ObjectKey, CHUNK_SIZE};
pub use bucketsync_sync::{FailureKind, FileOutcome, FileStatus, SyncConfig, SyncReport};
