//! ObjectStore trait: the narrow interface bucketsync needs from a remote
//! object store.
//!
//! Implementations wrap a concrete backend (a cloud SDK, SQLite, memory).
//! Nothing above this trait knows which one is in use.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use bucketsync_core::{Fingerprint, Namespace, ObjectKey};

use crate::error::Result;

/// One object as reported by a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: ObjectKey,
    /// The store's own integrity tag (ETag), unquoted.
    pub fingerprint: Fingerprint,
    pub size: u64,
}

/// A stored object read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub fingerprint: Fingerprint,
    pub content_type: String,
}

/// One page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ObjectPage {
    /// Objects in ascending key order.
    pub objects: Vec<ObjectSummary>,
    /// Token to pass back for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

/// Identifier of an in-progress multipart upload.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadId(pub String);

impl UploadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UploadId({})", self.0)
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A part acknowledged by the store, passed back on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number.
    pub part_number: u32,
    /// The part's ETag as returned by `upload_part`.
    pub fingerprint: Fingerprint,
}

/// The ObjectStore trait: async interface to a flat key/object namespace.
///
/// # Design Notes
///
/// - **Paginated listing**: `list_objects` returns one page at a time in
///   ascending key order. The continuation token is opaque to callers.
/// - **Store-computed ETags**: every write returns the fingerprint the
///   store will report for the object in later listings.
/// - **Multipart**: large objects go through create / upload_part /
///   complete. Parts are numbered from 1. The resulting ETag is the
///   composite `<md5-of-part-digests>-<n>`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Listing
    // ─────────────────────────────────────────────────────────────────────────

    /// List up to `max_keys` objects after the given continuation token.
    async fn list_objects(
        &self,
        namespace: &Namespace,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage>;

    // ─────────────────────────────────────────────────────────────────────────
    // Single-request uploads
    // ─────────────────────────────────────────────────────────────────────────

    /// Store an object in one request, replacing any existing object.
    async fn put_object(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> Result<Fingerprint>;

    // ─────────────────────────────────────────────────────────────────────────
    // Multipart uploads
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a multipart upload.
    async fn create_multipart_upload(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        content_type: &str,
    ) -> Result<UploadId>;

    /// Upload one part. Re-uploading a part number replaces it.
    async fn upload_part(
        &self,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> Result<Fingerprint>;

    /// Assemble the listed parts into the final object.
    async fn complete_multipart_upload(
        &self,
        upload_id: &UploadId,
        parts: &[CompletedPart],
    ) -> Result<Fingerprint>;

    /// Discard an upload and its parts.
    async fn abort_multipart_upload(&self, upload_id: &UploadId) -> Result<()>;
}

/// Lazy, restartable walk over a namespace's full listing.
///
/// Each call to [`ObjectStoreExt::list`] starts from the first key.
pub struct Listing<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    namespace: Namespace,
    page_size: usize,
    token: Option<String>,
    done: bool,
}

impl<'a, S: ObjectStore + ?Sized> Listing<'a, S> {
    /// Fetch the next page, or `None` once the listing is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ObjectSummary>>> {
        if self.done {
            return Ok(None);
        }

        let page = self
            .store
            .list_objects(&self.namespace, self.token.as_deref(), self.page_size)
            .await?;

        match page.next_token {
            Some(token) => self.token = Some(token),
            None => self.done = true,
        }

        Ok(Some(page.objects))
    }
}

/// Extension trait for common store patterns.
pub trait ObjectStoreExt: ObjectStore {
    /// Start a paginated listing of `namespace`.
    fn list(&self, namespace: &Namespace, page_size: usize) -> Listing<'_, Self> {
        Listing {
            store: self,
            namespace: namespace.clone(),
            page_size: page_size.max(1),
            token: None,
            done: false,
        }
    }

    /// Collect every object in `namespace`.
    fn list_all(
        &self,
        namespace: &Namespace,
        page_size: usize,
    ) -> impl std::future::Future<Output = Result<Vec<ObjectSummary>>> + Send
    where
        Self: Sized,
    {
        async move {
            let mut listing = self.list(namespace, page_size);
            let mut all = Vec::new();
            while let Some(page) = listing.next_page().await? {
                all.extend(page);
            }
            Ok(all)
        }
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

#[async_trait]
impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    async fn list_objects(
        &self,
        namespace: &Namespace,
        continuation: Option<&str>,
        max_keys: usize,
    ) -> Result<ObjectPage> {
        (**self).list_objects(namespace, continuation, max_keys).await
    }

    async fn put_object(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        body: Bytes,
        content_type: &str,
    ) -> Result<Fingerprint> {
        (**self).put_object(namespace, key, body, content_type).await
    }

    async fn create_multipart_upload(
        &self,
        namespace: &Namespace,
        key: &ObjectKey,
        content_type: &str,
    ) -> Result<UploadId> {
        (**self)
            .create_multipart_upload(namespace, key, content_type)
            .await
    }

    async fn upload_part(
        &self,
        upload_id: &UploadId,
        part_number: u32,
        body: Bytes,
    ) -> Result<Fingerprint> {
        (**self).upload_part(upload_id, part_number, body).await
    }

    async fn complete_multipart_upload(
        &self,
        upload_id: &UploadId,
        parts: &[CompletedPart],
    ) -> Result<Fingerprint> {
        (**self).complete_multipart_upload(upload_id, parts).await
    }

    async fn abort_multipart_upload(&self, upload_id: &UploadId) -> Result<()> {
        (**self).abort_multipart_upload(upload_id).await
    }
}
