//! Core type definitions: the upload queue, per-file outcomes and the run report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered list of file names (relative to the source directory) to upload.
///
/// Built once from a directory snapshot; later passes work on subsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadQueue(Vec<String>);

impl UploadQueue {
    pub fn new(files: Vec<String>) -> Self {
        Self(files)
    }

    pub fn files(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, file: &str) -> bool {
        self.0.iter().any(|f| f == file)
    }

    /// Queue holding only the given files, in the given order
    pub fn subset<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(files.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl From<Vec<String>> for UploadQueue {
    fn from(files: Vec<String>) -> Self {
        Self(files)
    }
}

/// Result of processing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    Succeeded,
    Failed { reason: String },
}

impl UploadOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// A file that failed, with the message of the error that stopped it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUpload {
    pub file: String,
    pub reason: String,
}

/// Running success and failure sets.
///
/// A file is in at most one of the two sets. It only leaves the failure set
/// through [`Ledger::begin_retry`], and only enters the success set when an
/// attempt was observed to succeed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    succeeded: Vec<String>,
    failed: Vec<FailedUpload>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of one attempt
    pub fn record(&mut self, file: &str, outcome: UploadOutcome) {
        match outcome {
            UploadOutcome::Succeeded => self.record_success(file),
            UploadOutcome::Failed { reason } => self.record_failure(file, reason),
        }
    }

    pub fn record_success(&mut self, file: &str) {
        self.failed.retain(|f| f.file != file);
        if !self.succeeded.iter().any(|f| f == file) {
            self.succeeded.push(file.to_string());
        }
    }

    pub fn record_failure(&mut self, file: &str, reason: impl Into<String>) {
        let reason = reason.into();
        if let Some(existing) = self.failed.iter_mut().find(|f| f.file == file) {
            existing.reason = reason;
        } else {
            self.failed.push(FailedUpload {
                file: file.to_string(),
                reason,
            });
        }
    }

    /// Drop the files about to be retried from the failure set so the retry
    /// pass can re-mark them either way
    pub fn begin_retry(&mut self, queue: &UploadQueue) {
        self.failed.retain(|f| !queue.contains(&f.file));
    }

    pub fn succeeded(&self) -> &[String] {
        &self.succeeded
    }

    pub fn failed(&self) -> &[FailedUpload] {
        &self.failed
    }

    pub fn failed_files(&self) -> Vec<String> {
        self.failed.iter().map(|f| f.file.clone()).collect()
    }

    pub fn is_failed(&self, file: &str) -> bool {
        self.failed.iter().any(|f| f.file == file)
    }

    pub fn summary(&self) -> PassSummary {
        PassSummary {
            succeeded: self.succeeded.len(),
            failed: self.failed.len(),
        }
    }
}

/// Success and failure counts, for one pass or for the whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl PassSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// How the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunExit {
    /// Every pass finished, or the user chose to stop
    Completed,
    /// Menu input was rejected
    InvalidInput,
}

impl RunExit {
    /// Process exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Completed => 0,
            Self::InvalidInput => 2,
        }
    }
}

/// Machine-readable summary of a run, written with `--report`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passes: usize,
    pub queued: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<FailedUpload>,
    pub exit: RunExit,
}

impl RunReport {
    pub fn new(
        started_at: DateTime<Utc>,
        passes: usize,
        queued: usize,
        ledger: &Ledger,
        exit: RunExit,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            passes,
            queued,
            succeeded: ledger.succeeded().to_vec(),
            failed: ledger.failed().to_vec(),
            exit,
        }
    }

    /// Write as pretty JSON
    pub fn write_to(&self, path: &std::path::Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
