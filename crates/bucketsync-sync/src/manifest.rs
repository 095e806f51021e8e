//! Snapshot of a namespace's remote fingerprints.
//!
//! A manifest is loaded once, before any upload decision, and is read-only
//! afterwards. Every decision in a pass is made against the same snapshot.

use std::collections::HashMap;

use bucketsync_core::{Fingerprint, Namespace, ObjectKey};
use bucketsync_store::{ObjectStore, ObjectStoreExt, StoreError};

/// Key → fingerprint mapping of one namespace.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    namespace: Namespace,
    entries: HashMap<ObjectKey, Fingerprint>,
}

impl Manifest {
    /// Load the full listing of `namespace`, following every page.
    ///
    /// Fingerprints are recorded exactly as the store reports them.
    pub async fn load<S: ObjectStore + ?Sized>(
        store: &S,
        namespace: &Namespace,
        page_size: usize,
    ) -> Result<Self, StoreError> {
        let mut entries = HashMap::new();
        let mut listing = store.list(namespace, page_size);
        let mut pages = 0usize;

        while let Some(page) = listing.next_page().await? {
            pages += 1;
            for object in page {
                entries.insert(object.key, object.fingerprint);
            }
        }

        tracing::debug!(
            namespace = %namespace,
            objects = entries.len(),
            pages,
            "loaded manifest"
        );

        Ok(Self {
            namespace: namespace.clone(),
            entries,
        })
    }

    /// Build a manifest from known entries.
    pub fn from_entries(
        namespace: Namespace,
        entries: impl IntoIterator<Item = (ObjectKey, Fingerprint)>,
    ) -> Self {
        Self {
            namespace,
            entries: entries.into_iter().collect(),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The remote fingerprint for `key`, if the object exists.
    pub fn lookup(&self, key: &ObjectKey) -> Option<&Fingerprint> {
        self.entries.get(key)
    }

    /// Whether the remote object for `key` has exactly this fingerprint.
    pub fn matches(&self, key: &ObjectKey, fingerprint: &Fingerprint) -> bool {
        self.lookup(key) == Some(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
