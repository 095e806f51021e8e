//! Per-file outcomes and the summary of a sync pass.

use serde::Serialize;

use bucketsync_core::{Fingerprint, Namespace, ObjectKey};

/// Why a file was (or would be) uploaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadReason {
    /// No remote object exists for the key.
    New,
    /// A remote object exists with a different fingerprint.
    Changed,
}

/// Where a per-file failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The file could not be read while fingerprinting.
    Read,
    /// The upload itself failed.
    Transfer,
    /// The path could not be inspected during the walk.
    Walk,
    /// The worker handling the file did not finish.
    Internal,
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded {
        fingerprint: Fingerprint,
        bytes: u64,
        parts: u32,
        reason: UploadReason,
    },
    Skipped {
        fingerprint: Fingerprint,
    },
    /// Dry run only.
    WouldUpload {
        fingerprint: Fingerprint,
        reason: UploadReason,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
    /// Never processed because the pass was cancelled.
    Cancelled,
}

/// Outcome for a single key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileOutcome {
    pub key: ObjectKey,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileOutcome {
    pub fn new(key: ObjectKey, status: FileStatus) -> Self {
        Self { key, status }
    }

    pub(crate) fn failed(key: ObjectKey, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::new(
            key,
            FileStatus::Failed {
                kind,
                message: message.into(),
            },
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

/// Report from a sync pass.
///
/// Outcomes are in walk order; walk failures follow the walked files.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub namespace: Namespace,
    pub outcomes: Vec<FileOutcome>,
    /// Files uploaded.
    pub uploaded: usize,
    /// Files whose remote fingerprint already matched.
    pub skipped: usize,
    /// Files that would have been uploaded (dry run).
    pub planned: usize,
    /// Files that failed.
    pub failed: usize,
    /// Files not processed because of cancellation.
    pub cancelled: usize,
    /// Total bytes sent.
    pub bytes_uploaded: u64,
}

impl SyncReport {
    /// Tally the counters from a list of outcomes.
    pub fn from_outcomes(namespace: Namespace, outcomes: Vec<FileOutcome>) -> Self {
        let mut report = Self {
            namespace,
            ..Default::default()
        };

        for outcome in &outcomes {
            match &outcome.status {
                FileStatus::Uploaded { bytes, .. } => {
                    report.uploaded += 1;
                    report.bytes_uploaded += bytes;
                }
                FileStatus::Skipped { .. } => report.skipped += 1,
                FileStatus::WouldUpload { .. } => report.planned += 1,
                FileStatus::Failed { .. } => report.failed += 1,
                FileStatus::Cancelled => report.cancelled += 1,
            }
        }

        report.outcomes = outcomes;
        report
    }

    /// Outcomes that are failures.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    pub fn failed_keys(&self) -> Vec<&ObjectKey> {
        self.failures().map(|o| &o.key).collect()
    }

    /// The status recorded for `key`.
    pub fn status_of(&self, key: &str) -> Option<&FileStatus> {
        self.outcomes
            .iter()
            .find(|o| o.key.as_str() == key)
            .map(|o| &o.status)
    }

    /// No failures and nothing cancelled.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }

    /// Total number of files accounted for.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}
