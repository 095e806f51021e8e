//! A store wrapper that fails on demand.
//!
//! Used to check that one failed upload never stops the rest of a pass and
//! that half-finished multipart uploads are aborted.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use bucketsync_core::{Fingerprint, Namespace, ObjectKey};
use bucketsync_store::{CompletedPart, ObjectPage, ObjectStore, Result, StoreError, UploadId};

/// Wraps a store, rejecting writes for chosen keys.
pub struct FailingStore<S> {
    inner: S,
    /// Keys whose put or multipart creation fails.
    reject: HashSet<ObjectKey>,
    /// Keys whose multipart upload starts but whose parts fail.
    reject_parts: HashSet<ObjectKey>,
    fail_listing: bool,
    doomed_uploads: Mutex<HashSet<UploadId>>,
    write_attempts: AtomicUsize,
    aborts: AtomicUsize,
}

impl<S: ObjectStore> FailingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reject: HashSet::new(),
            reject_parts: HashSet::new(),
            fail_listing: false,
            doomed_uploads: Mutex::new(HashSet::new()),
            write_attempts: AtomicUsize::new(0),
            aborts: AtomicUsize::new(0),
        }
    }

    /// Reject every upload of `key`.
    pub fn reject_key(mut self, key: impl Into<ObjectKey>) -> Self {
        self.reject.insert(key.into());
        self
    }

    /// Let multipart uploads of `key` start, then fail their parts.
    pub fn reject_parts_of(mut self, key: impl Into<ObjectKey>) -> Self {
        self.reject_parts.insert(key.into());
        self
    }

    /// Fail every listing request.
    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Puts and multipart creations attempted, including rejected ones.
    pub fn write_attempts(&self) -> usize {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Multipart uploads aborted through this wrapper.
    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    fn check_key(&self, key: &ObjectKey) -> Result<()> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if self.reject.contains(key) {
            return Err(StoreError::Unavailable(format!("injected failure for {}", key)));
        }
        Ok(())
    }

    fn doomed(&self) -> std::sync::MutexGuard<'_, HashSet<UploadId>> {
        // A poisoned set only happens after a panicking test.
        self.doomed_uploads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl<S: ObjectStore> ObjectStore for FailingStore<S> {
    async fn list_objects(
        &self,
        namespace: &Namespace,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        if self.fail_listing {
            return Err(StoreError::Unavailable("injected listing failure".into()));
        }
        self.inner
            .list_objects(namespace, continuation, max_keys)
            .await
    }

    async fn put_object(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> Result<Fingerprint> {
        self.check_key(key)?;
        self.inner
            .put_object(namespace, key, body, content_type)
            .await
    }

    async fn create_multipart_upload(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        content_type: &str,
    ) -> Result<UploadId> {
        self.check_key(key)?;
        let upload_id = self
            .inner
            .create_multipart_upload(namespace, key, content_type)
            .await?;
        if self.reject_parts.contains(key) {
            self.doomed().insert(upload_id.clone());
        }
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> Result<Fingerprint> {
        if self.doomed().contains(upload_id) {
            return Err(StoreError::Unavailable(format!(
                "injected failure for part {} of {}",
                part_number, upload_id
            )));
        }
        self.inner.upload_part(upload_id, part_number, body).await
    }

    async fn complete_multipart_upload(
        &self,
        upload_id: &UploadId,
        parts: &[CompletedPart],
    ) -> Result<Fingerprint> {
        self.inner.complete_multipart_upload(upload_id, parts).await
    }

    async fn abort_multipart_upload(&self, upload_id: &UploadId) -> Result<()> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.doomed().remove(upload_id);
        self.inner.abort_multipart_upload(upload_id).await
    }
}
