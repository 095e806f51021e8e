//! # Bucketsync Testkit
//!
//! Testing utilities for bucketsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known contents with the ETag an S3-compatible store
//!   reports for them
//! - **Generators**: Proptest strategies for contents, keys and trees
//! - **Fixtures**: Temporary directory trees and prepared stores
//! - **Failure injection**: A store wrapper that rejects chosen keys
//!
//! ## Golden Vectors
//!
//! ```rust
//! use bucketsync_core::fingerprint_bytes;
//! use bucketsync_testkit::vectors::all_vectors;
//!
//! for vector in all_vectors().iter().filter(|v| !v.is_large()) {
//!     let fp = fingerprint_bytes(&vector.content.bytes(), vector.chunk_size).unwrap();
//!     assert_eq!(fp.as_str(), vector.expected);
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use bucketsync_testkit::fixtures::TreeFixture;
//!
//! let tree = TreeFixture::new().unwrap();
//! tree.write("sub/dir/file.txt", "contents").unwrap();
//! ```

pub mod failing;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use failing::FailingStore;
pub use fixtures::{memory_store, site_fixture, TreeFixture};
pub use vectors::{all_vectors, GoldenVector, VectorContent};
