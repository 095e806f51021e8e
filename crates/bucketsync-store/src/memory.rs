//! In-memory implementation of the ObjectStore trait.
//!
//! This is primarily for testing. It computes ETags exactly as an S3-style
//! store does, so fingerprints computed locally match what it lists.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use bucketsync_core::{md5_digest, Fingerprint, Namespace, ObjectKey};

use crate::error::{Result, StoreError};
use crate::traits::{
    CompletedPart, ObjectPage, ObjectStore, ObjectSummary, StoredObject, UploadId,
};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Objects per namespace, ordered by key for listing.
    namespaces: HashMap<Namespace, BTreeMap<ObjectKey, StoredObject>>,

    /// In-progress multipart uploads.
    uploads: HashMap<UploadId, PendingUpload>,

    /// Counter for upload IDs.
    next_upload: u64,

    /// Number of successful writes (puts and completed multipart uploads).
    writes: u64,
}

struct PendingUpload {
    namespace: Namespace,
    key: ObjectKey,
    content_type: String,
    parts: BTreeMap<u32, Bytes>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    /// Create a namespace. Creating an existing namespace is a no-op.
    pub fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        self.write()?
            .namespaces
            .entry(namespace.clone())
            .or_default();
        Ok(())
    }

    /// Fetch an object.
    pub fn get_object(&self, namespace: &Namespace, key: &ObjectKey) -> Result<Option<StoredObject>> {
        let inner = self.read()?;
        let objects = inner
            .namespaces
            .get(namespace)
            .ok_or_else(|| StoreError::NamespaceNotFound(namespace.to_string()))?;
        Ok(objects.get(key).cloned())
    }

    /// Number of objects in a namespace.
    pub fn object_count(&self, namespace: &Namespace) -> Result<usize> {
        let inner = self.read()?;
        inner
            .namespaces
            .get(namespace)
            .map(BTreeMap::len)
            .ok_or_else(|| StoreError::NamespaceNotFound(namespace.to_string()))
    }

    /// Number of writes served since creation.
    pub fn write_count(&self) -> u64 {
        self.read().map(|inner| inner.writes).unwrap_or(0)
    }

    /// Number of multipart uploads neither completed nor aborted.
    pub fn pending_uploads(&self) -> usize {
        self.read().map(|inner| inner.uploads.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_objects(
        &self,
        namespace: &Namespace,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        let inner = self.read()?;
        let objects = inner
            .namespaces
            .get(namespace)
            .ok_or_else(|| StoreError::NamespaceNotFound(namespace.to_string()))?;

        let start = match continuation {
            Some(token) => Bound::Excluded(ObjectKey::new(token)),
            None => Bound::Unbounded,
        };

        let max_keys = max_keys.max(1);
        let mut page: Vec<ObjectSummary> = objects
            .range::<ObjectKey, _>((start, Bound::Unbounded))
            .take(max_keys + 1)
            .map(|(key, object)| ObjectSummary {
                key: key.clone(),
                fingerprint: object.fingerprint.clone(),
                size: object.body.len() as u64,
            })
            .collect();

        let next_token = if page.len() > max_keys {
            page.truncate(max_keys);
            page.last().map(|last| last.key.to_string())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: page,
            next_token,
        })
    }

    async fn put_object(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> Result<Fingerprint> {
        let mut inner = self.write()?;
        let fingerprint = Fingerprint::from_digest(&md5_digest(&body));

        let objects = inner
            .namespaces
            .get_mut(namespace)
            .ok_or_else(|| StoreError::NamespaceNotFound(namespace.to_string()))?;
        objects.insert(
            key.clone(),
            StoredObject {
                body,
                fingerprint: fingerprint.clone(),
                content_type: content_type.to_string(),
            },
        );
        inner.writes += 1;

        Ok(fingerprint)
    }

    async fn create_multipart_upload(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        content_type: &str,
    ) -> Result<UploadId> {
        let mut inner = self.write()?;
        if !inner.namespaces.contains_key(namespace) {
            return Err(StoreError::NamespaceNotFound(namespace.to_string()));
        }

        inner.next_upload += 1;
        let upload_id = UploadId(format!("mem-upload-{}", inner.next_upload));
        inner.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                namespace: namespace.clone(),
                key: key.clone(),
                content_type: content_type.to_string(),
                parts: BTreeMap::new(),
            },
        );

        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> Result<Fingerprint> {
        if part_number == 0 {
            return Err(StoreError::InvalidPart {
                upload_id: upload_id.to_string(),
                part_number,
                reason: "part numbers start at 1".into(),
            });
        }

        let mut inner = self.write()?;
        let upload = inner
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::UploadNotFound(upload_id.to_string()))?;

        let fingerprint = Fingerprint::from_digest(&md5_digest(&body));
        upload.parts.insert(part_number, body);
        Ok(fingerprint)
    }

    async fn complete_multipart_upload(
        &self,
        upload_id: &UploadId,
        parts: &[CompletedPart],
    ) -> Result<Fingerprint> {
        let mut inner = self.write()?;
        let upload = inner
            .uploads
            .get(upload_id)
            .ok_or_else(|| StoreError::UploadNotFound(upload_id.to_string()))?;

        let assembled = assemble_parts(upload_id, &upload.parts, parts)?;
        let namespace = upload.namespace.clone();
        let key = upload.key.clone();
        let content_type = upload.content_type.clone();

        let objects = inner
            .namespaces
            .get_mut(&namespace)
            .ok_or_else(|| StoreError::NamespaceNotFound(namespace.to_string()))?;
        objects.insert(
            key,
            StoredObject {
                body: assembled.body,
                fingerprint: assembled.fingerprint.clone(),
                content_type,
            },
        );
        inner.uploads.remove(upload_id);
        inner.writes += 1;

        Ok(assembled.fingerprint)
    }

    async fn abort_multipart_upload(&self, upload_id: &UploadId) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .uploads
            .remove(upload_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::UploadNotFound(upload_id.to_string()))
    }
}

pub(crate) struct Assembled {
    pub body: Bytes,
    pub fingerprint: Fingerprint,
}

/// Validate the completion list against the uploaded parts and join them.
///
/// Parts must be listed in strictly ascending order and each listed
/// fingerprint must match what was uploaded under that number.
pub(crate) fn assemble_parts(
    upload_id: &UploadId,
    uploaded: &BTreeMap<u32, Bytes>,
    parts: &[CompletedPart],
) -> Result<Assembled> {
    if parts.is_empty() {
        return Err(StoreError::InvalidPart {
            upload_id: upload_id.to_string(),
            part_number: 0,
            reason: "no parts listed".into(),
        });
    }

    let mut body = BytesMut::new();
    let mut digests = Vec::with_capacity(parts.len());
    let mut previous = 0u32;

    for part in parts {
        if part.part_number <= previous {
            return Err(StoreError::InvalidPart {
                upload_id: upload_id.to_string(),
                part_number: part.part_number,
                reason: "parts must be listed in ascending order".into(),
            });
        }
        previous = part.part_number;

        let data = uploaded
            .get(&part.part_number)
            .ok_or_else(|| StoreError::InvalidPart {
                upload_id: upload_id.to_string(),
                part_number: part.part_number,
                reason: "part was never uploaded".into(),
            })?;

        let digest = md5_digest(data);
        if Fingerprint::from_digest(&digest) != part.fingerprint {
            return Err(StoreError::InvalidPart {
                upload_id: upload_id.to_string(),
                part_number: part.part_number,
                reason: "fingerprint mismatch".into(),
            });
        }

        digests.push(digest);
        body.extend_from_slice(data);
    }

    Ok(Assembled {
        body: body.freeze(),
        fingerprint: Fingerprint::from_part_digests(&digests),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ObjectStoreExt;
    use bucketsync_core::fingerprint_bytes;

    fn ns() -> Namespace {
        Namespace::from("site")
    }

    async fn store_with_namespace() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_namespace(&ns()).unwrap();
        store
    }

    #[tokio::test]
    async fn test_put_returns_md5_etag() {
        let store = store_with_namespace().await;
        let key = ObjectKey::from("a.txt");

        let fp = store
            .put_object(&ns(), &key, Bytes::from_static(b"hi"), "text/plain")
            .await
            .unwrap();
        assert_eq!(fp.as_str(), "49f68a5c8493ec2c0bf489821c21fc3b");

        let stored = store.get_object(&ns(), &key).unwrap().unwrap();
        assert_eq!(stored.body, Bytes::from_static(b"hi"));
        assert_eq!(stored.content_type, "text/plain");
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_namespace() {
        let store = MemoryStore::new();
        let result = store.list_objects(&ns(), None, 10).await;
        assert!(matches!(result, Err(StoreError::NamespaceNotFound(_))));
    }

    #[tokio::test]
    async fn test_pagination() {
        let store = store_with_namespace().await;
        for i in 0..7 {
            let key = ObjectKey::new(format!("k{}", i));
            store
                .put_object(&ns(), &key, Bytes::from(vec![i as u8]), "text/plain")
                .await
                .unwrap();
        }

        let first = store.list_objects(&ns(), None, 3).await.unwrap();
        assert_eq!(first.objects.len(), 3);
        assert_eq!(first.next_token.as_deref(), Some("k2"));

        let second = store.list_objects(&ns(), Some("k2"), 3).await.unwrap();
        assert_eq!(second.objects[0].key.as_str(), "k3");

        let all = store.list_all(&ns(), 3).await.unwrap();
        let keys: Vec<_> = all.iter().map(|o| o.key.as_str().to_string()).collect();
        assert_eq!(keys, vec!["k0", "k1", "k2", "k3", "k4", "k5", "k6"]);
    }

    #[tokio::test]
    async fn test_multipart_etag_matches_chunked_fingerprint() {
        let store = store_with_namespace().await;
        let key = ObjectKey::from("big.bin");
        let data: Vec<u8> = (0..25u8).collect();

        let upload = store
            .create_multipart_upload(&ns(), &key, "application/octet-stream")
            .await
            .unwrap();

        let mut completed = Vec::new();
        for (i, chunk) in data.chunks(10).enumerate() {
            let part_number = i as u32 + 1;
            let fingerprint = store
                .upload_part(&upload, part_number, Bytes::copy_from_slice(chunk))
                .await
                .unwrap();
            completed.push(CompletedPart {
                part_number,
                fingerprint,
            });
        }

        let etag = store
            .complete_multipart_upload(&upload, &completed)
            .await
            .unwrap();

        assert_eq!(etag, fingerprint_bytes(&data, 10).unwrap());
        assert_eq!(etag.chunk_count(), Some(3));

        let stored = store.get_object(&ns(), &key).unwrap().unwrap();
        assert_eq!(stored.body.as_ref(), data.as_slice());
        assert_eq!(store.pending_uploads(), 0);
    }

    #[tokio::test]
    async fn test_complete_rejects_bad_parts() {
        let store = store_with_namespace().await;
        let key = ObjectKey::from("x");
        let upload = store
            .create_multipart_upload(&ns(), &key, "text/plain")
            .await
            .unwrap();

        let fp = store
            .upload_part(&upload, 1, Bytes::from_static(b"abc"))
            .await
            .unwrap();

        let empty = store.complete_multipart_upload(&upload, &[]).await;
        assert!(matches!(empty, Err(StoreError::InvalidPart { .. })));

        let missing = store
            .complete_multipart_upload(
                &upload,
                &[CompletedPart {
                    part_number: 2,
                    fingerprint: fp.clone(),
                }],
            )
            .await;
        assert!(matches!(missing, Err(StoreError::InvalidPart { part_number: 2, .. })));

        let zero = store.upload_part(&upload, 0, Bytes::new()).await;
        assert!(matches!(zero, Err(StoreError::InvalidPart { part_number: 0, .. })));
    }

    #[tokio::test]
    async fn test_abort_discards_upload() {
        let store = store_with_namespace().await;
        let upload = store
            .create_multipart_upload(&ns(), &ObjectKey::from("x"), "text/plain")
            .await
            .unwrap();
        assert_eq!(store.pending_uploads(), 1);

        store.abort_multipart_upload(&upload).await.unwrap();
        assert_eq!(store.pending_uploads(), 0);

        let again = store.abort_multipart_upload(&upload).await;
        assert!(matches!(again, Err(StoreError::UploadNotFound(_))));
        assert_eq!(store.object_count(&ns()).unwrap(), 0);
    }

    proptest::proptest! {
        #[test]
        fn test_paged_listing_is_complete_and_ordered(
            keys in proptest::collection::btree_set("[a-z/]{1,8}", 0..40),
            page_size in 1usize..10,
        ) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let store = MemoryStore::new();
            store.create_namespace(&ns()).unwrap();

            rt.block_on(async {
                for key in &keys {
                    store
                        .put_object(&ns(), &ObjectKey::new(key.clone()), Bytes::new(), "text/plain")
                        .await
                        .unwrap();
                }
            });

            let listed = rt.block_on(store.list_all(&ns(), page_size)).unwrap();
            let listed: Vec<String> = listed.into_iter().map(|o| o.key.to_string()).collect();
            let expected: Vec<String> = keys.into_iter().collect();
            proptest::prop_assert_eq!(listed, expected);
        }
    }
}
