//! Golden fingerprint vectors.
//!
//! Each vector is checked three ways: hashing the bytes in memory, hashing
//! them from disk, and uploading them through a store, which must report
//! the same value as its ETag.

use std::sync::Arc;

use bucketsync::core::fingerprint_bytes;
use bucketsync::store::MemoryStore;
use bucketsync::{Namespace, SyncConfig, Syncer, SyncerConfig};
use bucketsync_testkit::{all_vectors, GoldenVector, TreeFixture};

fn small_vectors() -> Vec<GoldenVector> {
    all_vectors().into_iter().filter(|v| !v.is_large()).collect()
}

#[test]
fn test_vectors_in_memory() {
    for vector in all_vectors() {
        let fp = fingerprint_bytes(&vector.content.bytes(), vector.chunk_size).unwrap();
        assert_eq!(fp.as_str(), vector.expected, "vector: {}", vector.name);
    }
}

#[tokio::test]
async fn test_vectors_match_store_etags() {
    for vector in small_vectors() {
        let store = Arc::new(MemoryStore::new());
        let ns = Namespace::from("golden");
        store.create_namespace(&ns).unwrap();

        let config = SyncerConfig {
            sync: SyncConfig {
                chunk_size: vector.chunk_size,
                ..SyncConfig::default()
            },
        };
        let syncer = Syncer::with_shared_store(Arc::clone(&store), config).unwrap();

        let tree = TreeFixture::new().unwrap();
        let path = tree.write("vector.bin", vector.content.bytes()).unwrap();

        let local = syncer.fingerprint(&path).await.unwrap();
        assert_eq!(local.as_str(), vector.expected, "local: {}", vector.name);

        syncer.sync(tree.root(), ns.clone()).await.unwrap();
        let objects = syncer.list_objects(ns).await.unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(
            objects[0].fingerprint.as_str(),
            vector.expected,
            "remote: {}",
            vector.name
        );
    }
}

#[test]
fn test_composite_count_matches_chunks() {
    for vector in all_vectors() {
        let len = vector.content.len();
        let chunks = len.div_ceil(vector.chunk_size);
        match vector.expected.split_once('-') {
            Some((_, count)) => {
                assert!(chunks >= 2, "vector: {}", vector.name);
                assert_eq!(count.parse::<usize>().unwrap(), chunks, "vector: {}", vector.name);
            }
            None => assert!(chunks <= 1, "vector: {}", vector.name),
        }
    }
}
