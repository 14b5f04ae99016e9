//! Job lifecycle types.
//!
//! A job moves `queued -> running -> {done | error}`. `done` and `error`
//! are terminal. [`JobState`] carries exactly the data valid for its
//! status, so a record can never hold both download URLs and an error.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sanitize::sanitize_message;
use crate::stems::StemUrls;
use crate::types::{JobId, Timestamp};

/// Message stored when the separation engine itself fails. Engine
/// diagnostics are logged, never stored.
pub const ENGINE_FAILURE_MESSAGE: &str = "Processing failed (model)";

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Externally visible job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running) | (Self::Running, Self::Done) | (Self::Running, Self::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

/// Classification of a terminal job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Workspace could not be created or written.
    Resource,
    /// Separation engine exited abnormally.
    Engine,
    /// Engine exited cleanly but an expected stem file is absent.
    MissingArtifact,
    /// Upload to the object store failed.
    Publish,
    /// Anything else.
    Unclassified,
}

/// A terminal failure: its kind plus a sanitized, bounded message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    kind: FailureKind,
    message: String,
}

impl JobFailure {
    /// Build a failure from a raw diagnostic. The message is sanitized
    /// (paths in `redact` hidden, first line only, bounded length).
    pub fn new(kind: FailureKind, raw: &str, redact: &[&Path]) -> Self {
        Self {
            kind,
            message: sanitize_message(raw, redact),
        }
    }

    /// Engine failure with the fixed, non-detailed message.
    pub fn engine() -> Self {
        Self {
            kind: FailureKind::Engine,
            message: ENGINE_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle state together with the data that state carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Running { detail: String },
    Done { downloads: StemUrls },
    Error { failure: JobFailure },
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            Self::Queued => JobStatus::Queued,
            Self::Running { .. } => JobStatus::Running,
            Self::Done { .. } => JobStatus::Done,
            Self::Error { .. } => JobStatus::Error,
        }
    }
}

/// A tracked job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub state: JobState,
    pub submitted_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Job {
    /// A freshly submitted job in `queued` state.
    pub fn queued(id: JobId, now: Timestamp) -> Self {
        Self {
            id,
            state: JobState::Queued,
            submitted_at: now,
            updated_at: now,
        }
    }

    /// Flatten into the read-only shape exposed to clients.
    pub fn view(&self) -> JobView {
        let mut view = JobView {
            id: self.id,
            status: self.state.status(),
            detail: None,
            downloads: None,
            error: None,
            error_kind: None,
            submitted_at: self.submitted_at,
            updated_at: self.updated_at,
        };
        match &self.state {
            JobState::Queued => {}
            JobState::Running { detail } => view.detail = Some(detail.clone()),
            JobState::Done { downloads } => view.downloads = Some(downloads.clone()),
            JobState::Error { failure } => {
                view.error = Some(failure.message().to_string());
                view.error_kind = Some(failure.kind());
            }
        }
        view
    }
}

/// Snapshot of a job as reported by status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<StemUrls>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    pub submitted_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Number of tracked jobs per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub running: usize,
    pub done: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: JobStatus) {
        match status {
            JobStatus::Queued => self.queued += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Done => self.done += 1,
            JobStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.queued + self.running + self.done + self.error
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
