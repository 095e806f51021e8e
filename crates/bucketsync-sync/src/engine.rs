//! The sync engine.
//!
//! A pass runs in four stages:
//!
//! 1. Walk the local tree and collect every regular file.
//! 2. Reject the pass if two paths map to the same key.
//! 3. Load the remote manifest.
//! 4. Fingerprint each file and upload it when the manifest disagrees,
//!    on a bounded pool of workers.
//!
//! Nothing is uploaded before stage 3 completes, and remote objects with no
//! local counterpart are left alone.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use bucketsync_core::{content_type_for, FileEntry, Namespace, ObjectKey, CHUNK_SIZE};
use bucketsync_store::ObjectStore;

use crate::error::{KeyCollision, Result, SyncError};
use crate::hasher::Hasher;
use crate::manifest::Manifest;
use crate::report::{FailureKind, FileOutcome, FileStatus, SyncReport, UploadReason};
use crate::transport::{StoreTransport, Transport};
use crate::walker::{TreeWalker, WalkError};

/// Configuration for a sync pass.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Chunk size for both fingerprints and multipart parts.
    pub chunk_size: usize,
    /// Maximum files processed at once.
    pub concurrency: usize,
    /// Keys requested per listing page while loading the manifest.
    pub page_size: usize,
    /// Decide but never upload.
    pub dry_run: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            concurrency: 4,
            page_size: 1000,
            dry_run: false,
        }
    }
}

impl SyncConfig {
    /// Check the configuration before any work starts.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SyncError::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(SyncError::InvalidConfig("concurrency must be at least 1".into()));
        }
        if self.page_size == 0 {
            return Err(SyncError::InvalidConfig("page_size must be positive".into()));
        }
        Ok(())
    }
}

/// Synchronizes local trees into namespaces of one store.
pub struct SyncEngine<S> {
    store: Arc<S>,
    config: SyncConfig,
}

impl<S: ObjectStore + 'static> SyncEngine<S> {
    /// Create an engine. Fails if the configuration is invalid.
    pub fn new(store: Arc<S>, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The transport used by [`sync`](Self::sync) for `namespace`.
    ///
    /// Built from the same chunk size as the hasher.
    pub fn transport(&self, namespace: &Namespace) -> StoreTransport<Arc<S>> {
        StoreTransport::new(
            Arc::clone(&self.store),
            namespace.clone(),
            self.config.chunk_size,
        )
    }

    /// Upload every file under `root` whose fingerprint differs from the
    /// remote object of the same key.
    pub async fn sync(&self, root: impl AsRef<Path>, namespace: &Namespace) -> Result<SyncReport> {
        let transport = Arc::new(self.transport(namespace));
        self.run(root.as_ref(), namespace, Some(transport), None).await
    }

    /// Like [`sync`](Self::sync), but stops scheduling files once `cancel`
    /// reads `true`. Files already in flight finish; the rest are reported
    /// as cancelled.
    pub async fn sync_until_cancelled(
        &self,
        root: impl AsRef<Path>,
        namespace: &Namespace,
        cancel: watch::Receiver<bool>,
    ) -> Result<SyncReport> {
        let transport = Arc::new(self.transport(namespace));
        self.run(root.as_ref(), namespace, Some(transport), Some(cancel))
            .await
    }

    /// Sync through a caller-supplied transport.
    pub async fn sync_with<T: Transport + 'static>(
        &self,
        root: impl AsRef<Path>,
        namespace: &Namespace,
        transport: Arc<T>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<SyncReport> {
        self.run(root.as_ref(), namespace, Some(transport), cancel)
            .await
    }

    /// Compute the decisions of a pass without uploading anything.
    pub async fn plan(&self, root: impl AsRef<Path>, namespace: &Namespace) -> Result<SyncReport> {
        self.run::<StoreTransport<Arc<S>>>(root.as_ref(), namespace, None, None)
            .await
    }

    async fn run<T: Transport + 'static>(
        &self,
        root: &Path,
        namespace: &Namespace,
        transport: Option<Arc<T>>,
        cancel: Option<watch::Receiver<bool>>,
    ) -> Result<SyncReport> {
        let transport = if self.config.dry_run { None } else { transport };

        let walk_root = root.to_path_buf();
        let (entries, walk_errors) = tokio::task::spawn_blocking(move || walk(&walk_root))
            .await
            .map_err(|e| SyncError::Task(e.to_string()))??;

        let collisions = detect_collisions(&entries);
        if !collisions.is_empty() {
            for collision in &collisions {
                tracing::warn!(
                    key = %collision.key,
                    first = %collision.first.display(),
                    second = %collision.second.display(),
                    "duplicate key"
                );
            }
            return Err(SyncError::DuplicateKey(collisions));
        }

        let manifest = Manifest::load(self.store.as_ref(), namespace, self.config.page_size)
            .await
            .map_err(SyncError::ManifestLoad)?;
        let manifest = Arc::new(manifest);

        tracing::debug!(
            namespace = %namespace,
            files = entries.len(),
            remote = manifest.len(),
            dry_run = transport.is_none(),
            "starting sync"
        );

        let hasher = Hasher::new(self.config.chunk_size);
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        let mut scheduled = 0usize;

        for (index, entry) in entries.iter().enumerate() {
            if is_cancelled(cancel.as_ref()) {
                break;
            }
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| SyncError::Task(e.to_string()))?;
            // The wait for a permit is where cancellation usually lands.
            if is_cancelled(cancel.as_ref()) {
                break;
            }

            let entry = entry.clone();
            let manifest = Arc::clone(&manifest);
            let transport = transport.clone();
            tasks.spawn(async move {
                let outcome = process(entry, &manifest, hasher, transport.as_deref()).await;
                drop(permit);
                (index, outcome)
            });
            scheduled = index + 1;
        }

        if scheduled < entries.len() {
            tracing::warn!(
                namespace = %namespace,
                remaining = entries.len() - scheduled,
                "sync cancelled"
            );
        }

        let mut slots: Vec<Option<FileOutcome>> = vec![None; entries.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::warn!(error = %e, "sync worker failed"),
            }
        }

        let mut outcomes: Vec<FileOutcome> = slots
            .into_iter()
            .zip(entries)
            .enumerate()
            .map(|(index, (slot, entry))| match slot {
                Some(outcome) => outcome,
                None if index < scheduled => {
                    FileOutcome::failed(entry.key, FailureKind::Internal, "worker did not complete")
                }
                None => FileOutcome::new(entry.key, FileStatus::Cancelled),
            })
            .collect();

        outcomes.extend(walk_errors.into_iter().map(|error| {
            let message = error.to_string();
            FileOutcome::failed(error.key, FailureKind::Walk, message)
        }));

        let report = SyncReport::from_outcomes(namespace.clone(), outcomes);
        tracing::info!(
            namespace = %namespace,
            uploaded = report.uploaded,
            skipped = report.skipped,
            planned = report.planned,
            failed = report.failed,
            cancelled = report.cancelled,
            bytes = report.bytes_uploaded,
            "sync complete"
        );

        Ok(report)
    }
}

/// Fingerprint one file, compare it and upload it if needed.
async fn process<T: Transport + ?Sized>(
    entry: FileEntry,
    manifest: &Manifest,
    hasher: Hasher,
    transport: Option<&T>,
) -> FileOutcome {
    let path = entry.absolute_path.clone();
    let fingerprint = match tokio::task::spawn_blocking(move || hasher.fingerprint(&path)).await {
        Ok(Ok(fingerprint)) => fingerprint,
        Ok(Err(e)) => {
            tracing::warn!(key = %entry.key, error = %e, "cannot fingerprint file");
            return FileOutcome::failed(entry.key, FailureKind::Read, e.to_string());
        }
        Err(e) => return FileOutcome::failed(entry.key, FailureKind::Internal, e.to_string()),
    };

    let reason = match manifest.lookup(&entry.key) {
        Some(remote) if *remote == fingerprint => {
            tracing::debug!(key = %entry.key, fingerprint = %fingerprint, "unchanged, skipping");
            return FileOutcome::new(entry.key, FileStatus::Skipped { fingerprint });
        }
        Some(_) => UploadReason::Changed,
        None => UploadReason::New,
    };

    let Some(transport) = transport else {
        tracing::debug!(key = %entry.key, ?reason, "would upload");
        return FileOutcome::new(entry.key, FileStatus::WouldUpload { fingerprint, reason });
    };

    let content_type = content_type_for(&entry.key);
    match transport
        .upload(&entry.absolute_path, &entry.key, content_type)
        .await
    {
        Ok(receipt) => {
            if receipt.fingerprint != fingerprint {
                // The file changed while it was read, or the store computes
                // ETags differently; the next pass will upload it again.
                tracing::warn!(
                    key = %entry.key,
                    local = %fingerprint,
                    remote = %receipt.fingerprint,
                    "stored fingerprint differs from local fingerprint"
                );
            }
            tracing::info!(
                key = %entry.key,
                bytes = receipt.bytes,
                parts = receipt.parts,
                content_type,
                "uploaded"
            );
            FileOutcome::new(
                entry.key,
                FileStatus::Uploaded {
                    fingerprint: receipt.fingerprint,
                    bytes: receipt.bytes,
                    parts: receipt.parts,
                    reason,
                },
            )
        }
        Err(e) => {
            tracing::warn!(key = %entry.key, error = %e, "upload failed");
            FileOutcome::failed(entry.key, FailureKind::Transfer, e.to_string())
        }
    }
}

/// Drain a walk of `root`, separating files from per-path failures.
fn walk(root: &Path) -> Result<(Vec<FileEntry>, Vec<WalkError>)> {
    let mut entries = Vec::new();
    let mut errors = Vec::new();

    for item in TreeWalker::new(root)? {
        match item {
            Ok(entry) => entries.push(entry),
            Err(error) => {
                tracing::warn!(path = %error.path.display(), error = %error.source, "walk failure");
                errors.push(error);
            }
        }
    }

    Ok((entries, errors))
}

/// Every pair of entries sharing a key, in walk order.
pub fn detect_collisions(entries: &[FileEntry]) -> Vec<KeyCollision> {
    let mut seen: HashMap<&ObjectKey, &PathBuf> = HashMap::with_capacity(entries.len());
    let mut collisions = Vec::new();

    for entry in entries {
        if let Some(first) = seen.get(&entry.key) {
            collisions.push(KeyCollision {
                key: entry.key.clone(),
                first: (*first).clone(),
                second: entry.absolute_path.clone(),
            });
        } else {
            seen.insert(&entry.key, &entry.absolute_path);
        }
    }

    collisions
}

fn is_cancelled(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.map(|rx| *rx.borrow()).unwrap_or(false)
}
