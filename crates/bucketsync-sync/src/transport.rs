//! Transport abstraction for uploading local files.
//!
//! The engine hands a file to a [`Transport`] only once it has decided the
//! file must be uploaded. [`StoreTransport`] is the implementation over an
//! [`ObjectStore`]: a single put up to the chunk size, a multipart upload
//! with chunk-sized parts above it.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use bucketsync_core::{Fingerprint, Namespace, ObjectKey};
use bucketsync_store::{CompletedPart, ObjectStore, UploadId};

use crate::error::TransferError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransferError>;

/// What a finished upload reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// The fingerprint the store assigned to the object.
    pub fingerprint: Fingerprint,
    /// Bytes sent.
    pub bytes: u64,
    /// Number of parts; 1 for a single-request upload.
    pub parts: u32,
}

/// Transport trait for uploading one file to one key.
///
/// Implementations must be thread-safe (Send + Sync); the engine calls
/// `upload` from several workers at once, never twice for the same key in
/// one pass.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Upload the file at `path` as `key`.
    async fn upload(&self, path: &Path, key: &ObjectKey, content_type: &str) -> Result<UploadReceipt>;
}

/// Uploads into one namespace of an [`ObjectStore`].
pub struct StoreTransport<S> {
    store: S,
    namespace: Namespace,
    chunk_size: usize,
}

impl<S: ObjectStore> StoreTransport<S> {
    /// Create a transport splitting files larger than `chunk_size` into
    /// parts of exactly `chunk_size` bytes (the last part may be shorter).
    pub fn new(store: S, namespace: Namespace, chunk_size: usize) -> Self {
        Self {
            store,
            namespace,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    async fn upload_single(
        &self,
        path: &Path,
        key: &ObjectKey,
        content_type: &str,
    ) -> Result<UploadReceipt> {
        let body = tokio::fs::read(path)
            .await
            .map_err(|source| TransferError::Read {
                key: key.clone(),
                source,
            })?;
        let bytes = body.len() as u64;

        let fingerprint = self
            .store
            .put_object(&self.namespace, key, Bytes::from(body), content_type)
            .await
            .map_err(|source| TransferError::Store {
                key: key.clone(),
                source,
            })?;

        Ok(UploadReceipt {
            fingerprint,
            bytes,
            parts: 1,
        })
    }

    async fn upload_multipart(
        &self,
        path: &Path,
        key: &ObjectKey,
        content_type: &str,
    ) -> Result<UploadReceipt> {
        let upload_id = self
            .store
            .create_multipart_upload(&self.namespace, key, content_type)
            .await
            .map_err(|source| TransferError::Store {
                key: key.clone(),
                source,
            })?;

        match self.send_parts(path, key, &upload_id).await {
            Ok(receipt) => Ok(receipt),
            Err(e) => {
                if let Err(abort) = self.store.abort_multipart_upload(&upload_id).await {
                    tracing::warn!(
                        key = %key,
                        upload_id = %upload_id,
                        error = %abort,
                        "failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    async fn send_parts(
        &self,
        path: &Path,
        key: &ObjectKey,
        upload_id: &UploadId,
    ) -> Result<UploadReceipt> {
        let read_error = |source| TransferError::Read {
            key: key.clone(),
            source,
        };
        let store_error = |source| TransferError::Store {
            key: key.clone(),
            source,
        };

        let mut file = tokio::fs::File::open(path).await.map_err(read_error)?;
        let mut completed = Vec::new();
        let mut bytes = 0u64;

        loop {
            let mut chunk = Vec::with_capacity(self.chunk_size);
            (&mut file)
                .take(self.chunk_size as u64)
                .read_to_end(&mut chunk)
                .await
                .map_err(read_error)?;
            if chunk.is_empty() {
                break;
            }

            let part_number = completed.len() as u32 + 1;
            bytes += chunk.len() as u64;
            let fingerprint = self
                .store
                .upload_part(upload_id, part_number, Bytes::from(chunk))
                .await
                .map_err(store_error)?;

            tracing::trace!(key = %key, part_number, "uploaded part");
            completed.push(CompletedPart {
                part_number,
                fingerprint,
            });
        }

        let fingerprint = self
            .store
            .complete_multipart_upload(upload_id, &completed)
            .await
            .map_err(store_error)?;

        Ok(UploadReceipt {
            fingerprint,
            bytes,
            parts: completed.len() as u32,
        })
    }
}

#[async_trait]
impl<S: ObjectStore> Transport for StoreTransport<S> {
    async fn upload(&self, path: &Path, key: &ObjectKey, content_type: &str) -> Result<UploadReceipt> {
        let size = tokio::fs::metadata(path)
            .await
            .map_err(|source| TransferError::Read {
                key: key.clone(),
                source,
            })?
            .len();

        // Same rule as the hasher: content of at most one chunk is a single
        // object, anything larger is split on chunk boundaries.
        if size <= self.chunk_size as u64 {
            self.upload_single(path, key, content_type).await
        } else {
            self.upload_multipart(path, key, content_type).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::Hasher;
    use bucketsync_store::{MemoryStore, StoreError};
    use std::sync::Arc;

    fn setup() -> (Arc<MemoryStore>, Namespace) {
        let store = Arc::new(MemoryStore::new());
        let ns = Namespace::from("bucket");
        store.create_namespace(&ns).unwrap();
        (store, ns)
    }

    #[tokio::test]
    async fn test_small_file_single_put() {
        let (store, ns) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hi").unwrap();

        let transport = StoreTransport::new(Arc::clone(&store), ns.clone(), 16);
        let receipt = transport
            .upload(&path, &ObjectKey::from("a.txt"), "text/plain")
            .await
            .unwrap();

        assert_eq!(receipt.parts, 1);
        assert_eq!(receipt.bytes, 2);
        assert_eq!(receipt.fingerprint, Hasher::new(16).fingerprint(&path).unwrap());
    }

    #[tokio::test]
    async fn test_large_file_multipart_matches_hasher() {
        let (store, ns) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 256) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let transport = StoreTransport::new(Arc::clone(&store), ns.clone(), 256);
        let key = ObjectKey::from("big.bin");
        let receipt = transport
            .upload(&path, &key, "application/octet-stream")
            .await
            .unwrap();

        assert_eq!(receipt.parts, 4);
        assert_eq!(receipt.bytes, 1000);
        assert_eq!(receipt.fingerprint, Hasher::new(256).fingerprint(&path).unwrap());

        let stored = store.get_object(&ns, &key).unwrap().unwrap();
        assert_eq!(stored.body.as_ref(), data.as_slice());
        assert_eq!(store.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_exact_chunk_is_single_put() {
        let (store, ns) = setup();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exact.bin");
        std::fs::write(&path, vec![9u8; 256]).unwrap();

        let transport = StoreTransport::new(store, ns, 256);
        let receipt = transport
            .upload(&path, &ObjectKey::from("exact.bin"), "application/octet-stream")
            .await
            .unwrap();

        assert_eq!(receipt.parts, 1);
        assert!(!receipt.fingerprint.is_composite());
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let (store, ns) = setup();
        let dir = tempfile::tempdir().unwrap();

        let transport = StoreTransport::new(store, ns, 256);
        let err = transport
            .upload(&dir.path().join("gone"), &ObjectKey::from("gone"), "text/plain")
            .await
            .unwrap_err();

        assert!(matches!(err, TransferError::Read { .. }));
        assert_eq!(err.key().as_str(), "gone");
    }

    #[tokio::test]
    async fn test_store_rejection_is_transfer_error() {
        let store = Arc::new(MemoryStore::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, b"hi").unwrap();

        let transport = StoreTransport::new(store, Namespace::from("missing"), 256);
        let err = transport
            .upload(&path, &ObjectKey::from("a.txt"), "text/plain")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TransferError::Store {
                source: StoreError::NamespaceNotFound(_),
                ..
            }
        ));
    }
}
