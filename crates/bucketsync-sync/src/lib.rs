//! # Bucketsync Sync
//!
//! Incremental synchronization of a local directory tree into a flat object
//! namespace.
//!
//! ## Overview
//!
//! A pass walks the tree, loads the remote manifest once, fingerprints each
//! file and uploads only the files whose fingerprint is absent from or
//! different in the manifest. Fingerprints match the store's ETags, so an
//! unchanged tree costs one listing and zero uploads.
//!
//! ## Key Properties
//!
//! - **Idempotent**: a second pass over an unchanged tree uploads nothing
//! - **Deterministic**: files are visited and reported in sorted walk order
//! - **Isolated failures**: one unreadable file or failed upload never stops
//!   the rest of the pass
//! - **Additive**: remote objects without a local file are never deleted
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bucketsync_core::Namespace;
//! use bucketsync_store::MemoryStore;
//! use bucketsync_sync::{SyncConfig, SyncEngine};
//!
//! async fn example() {
//!     let store = Arc::new(MemoryStore::new());
//!     let bucket = Namespace::from("site");
//!     store.create_namespace(&bucket).unwrap();
//!
//!     let engine = SyncEngine::new(store, SyncConfig::default()).unwrap();
//!     let report = engine.sync("./public", &bucket).await.unwrap();
//!     println!("{} uploaded, {} skipped", report.uploaded, report.skipped);
//! }
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! TreeWalker --> Hasher --> Manifest lookup --> Transport (on mismatch)
//! ```

pub mod engine;
pub mod error;
pub mod hasher;
pub mod manifest;
pub mod report;
pub mod transport;
pub mod walker;

pub use engine::{detect_collisions, SyncConfig, SyncEngine};
pub use error::{KeyCollision, Result, SyncError, TransferError};
pub use hasher::Hasher;
pub use manifest::Manifest;
pub use report::{FailureKind, FileOutcome, FileStatus, SyncReport, UploadReason};
pub use transport::{StoreTransport, Transport, UploadReceipt};
pub use walker::{TreeWalker, WalkError};
