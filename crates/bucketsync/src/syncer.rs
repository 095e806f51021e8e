//! The Syncer: the context object every bucketsync operation runs through.
//!
//! A `Syncer` owns the store handle and the configuration. There is no
//! process-wide session; two syncers over different stores never interact.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;

use bucketsync_core::{Fingerprint, Namespace};
use bucketsync_store::{ObjectStore, ObjectStoreExt, ObjectSummary};
use bucketsync_sync::{Hasher, SyncConfig, SyncEngine, SyncReport};

use crate::error::{BucketsyncError, Result};

/// Configuration for the Syncer.
#[derive(Debug, Clone, Default)]
pub struct SyncerConfig {
    /// Sync configuration.
    pub sync: SyncConfig,
}

/// Synchronizes local directories into one object store.
pub struct Syncer<S: ObjectStore> {
    engine: SyncEngine<S>,
    config: SyncerConfig,
}

impl<S: ObjectStore + 'static> Syncer<S> {
    /// Create a syncer owning `store`.
    pub fn new(store: S, config: SyncerConfig) -> Result<Self> {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Create a syncer over a store shared with other owners.
    pub fn with_shared_store(store: Arc<S>, config: SyncerConfig) -> Result<Self> {
        let engine = SyncEngine::new(store, config.sync.clone())?;
        Ok(Self { engine, config })
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        self.engine.store()
    }

    pub fn config(&self) -> &SyncerConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sync Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Upload every file under `root` that is new or changed relative to
    /// `namespace`.
    ///
    /// Per-file failures are recorded in the report. The returned error is
    /// reserved for problems that stop the whole pass: a missing root,
    /// colliding keys or an unreadable remote listing.
    pub async fn sync(
        &self,
        root: impl AsRef<Path>,
        namespace: impl Into<Namespace>,
    ) -> Result<SyncReport> {
        let root = root.as_ref();
        let namespace = namespace.into();
        tracing::debug!(root = %root.display(), namespace = %namespace, "sync requested");
        Ok(self.engine.sync(root, &namespace).await?)
    }

    /// Like [`sync`](Self::sync), stopping once `cancel` turns `true`.
    pub async fn sync_until_cancelled(
        &self,
        root: impl AsRef<Path>,
        namespace: impl Into<Namespace>,
        cancel: watch::Receiver<bool>,
    ) -> Result<SyncReport> {
        let root = root.as_ref();
        let namespace = namespace.into();
        tracing::debug!(root = %root.display(), namespace = %namespace, "cancellable sync requested");
        Ok(self
            .engine
            .sync_until_cancelled(root, &namespace, cancel)
            .await?)
    }

    /// Report what [`sync`](Self::sync) would do without uploading.
    pub async fn plan(
        &self,
        root: impl AsRef<Path>,
        namespace: impl Into<Namespace>,
    ) -> Result<SyncReport> {
        let root = root.as_ref();
        let namespace = namespace.into();
        tracing::debug!(root = %root.display(), namespace = %namespace, "plan requested");
        Ok(self.engine.plan(root, &namespace).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Every object in `namespace`, in key order.
    pub async fn list_objects(&self, namespace: impl Into<Namespace>) -> Result<Vec<ObjectSummary>> {
        let namespace = namespace.into();
        let objects = self
            .engine
            .store()
            .list_all(&namespace, self.config.sync.page_size)
            .await?;
        tracing::debug!(namespace = %namespace, objects = objects.len(), "listed objects");
        Ok(objects)
    }

    /// Fingerprint a local file with the configured chunk size.
    ///
    /// The result is what the store reports as the ETag once the file is
    /// uploaded through this syncer.
    pub async fn fingerprint(&self, path: impl AsRef<Path>) -> Result<Fingerprint> {
        let hasher = Hasher::new(self.config.sync.chunk_size);
        let path = path.as_ref().to_path_buf();
        let fingerprint = tokio::task::spawn_blocking(move || hasher.fingerprint(&path))
            .await
            .map_err(|e| BucketsyncError::Task(e.to_string()))??;
        Ok(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bucketsync_store::MemoryStore;
    use bucketsync_sync::SyncError;

    fn syncer() -> Syncer<MemoryStore> {
        let store = MemoryStore::new();
        store.create_namespace(&Namespace::from("site")).unwrap();
        let config = SyncerConfig {
            sync: SyncConfig {
                chunk_size: 32,
                ..SyncConfig::default()
            },
        };
        Syncer::new(store, config).unwrap()
    }

    #[tokio::test]
    async fn test_sync_and_list() {
        let syncer = syncer();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), b"<html></html>").unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), b"body {}").unwrap();

        let report = syncer.sync(dir.path(), "site").await.unwrap();
        assert_eq!(report.uploaded, 2);

        let objects = syncer.list_objects("site").await.unwrap();
        let keys: Vec<_> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["css/site.css", "index.html"]);

        let fingerprint = syncer
            .fingerprint(dir.path().join("index.html"))
            .await
            .unwrap();
        assert_eq!(objects[1].fingerprint, fingerprint);
    }

    #[tokio::test]
    async fn test_errors_convert() {
        let syncer = syncer();
        let dir = tempfile::tempdir().unwrap();

        let err = syncer.sync(dir.path().join("missing"), "site").await.unwrap_err();
        assert!(matches!(err, BucketsyncError::Sync(SyncError::NotFound { .. })));

        let err = syncer.list_objects("nope").await.unwrap_err();
        assert!(matches!(err, BucketsyncError::Store(_)));

        let err = syncer.fingerprint(dir.path().join("missing")).await.unwrap_err();
        assert!(matches!(err, BucketsyncError::Io(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SyncerConfig {
            sync: SyncConfig {
                chunk_size: 0,
                ..SyncConfig::default()
            },
        };
        let result = Syncer::new(MemoryStore::new(), config);
        assert!(matches!(
            result,
            Err(BucketsyncError::Sync(SyncError::InvalidConfig(_)))
        ));
    }
}
