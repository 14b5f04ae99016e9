//! In-memory job registry.
//!
//! Process-wide map from [`JobId`] to [`Job`], the single source of truth
//! for status queries. Nothing is persisted; every job is lost on restart.

use std::collections::HashMap;

use chrono::Utc;
use stemsplit_core::error::CoreError;
use stemsplit_core::job::{Job, JobState, JobStatus, JobView, StatusCounts};
use stemsplit_core::types::JobId;
use tokio::sync::RwLock;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("job {0} is already registered")]
    Duplicate(JobId),

    #[error("job {0} is not registered")]
    NotFound(JobId),

    #[error("job {id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },
}

impl From<RegistryError> for CoreError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => CoreError::missing_job(&id),
            RegistryError::Duplicate(_) => CoreError::Conflict(err.to_string()),
            RegistryError::IllegalTransition { .. } => CoreError::Internal(err.to_string()),
        }
    }
}

/// Concurrent job map.
///
/// Each transition replaces a job's whole [`JobState`] under the write
/// lock, so readers always see one complete state.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in `queued` state.
    pub async fn create(&self, id: JobId) -> Result<JobView, RegistryError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&id) {
            return Err(RegistryError::Duplicate(id));
        }
        let job = Job::queued(id, Utc::now());
        let view = job.view();
        jobs.insert(id, job);
        Ok(view)
    }

    /// Move a job to `next`, rejecting any edge the lifecycle forbids.
    pub async fn transition(&self, id: &JobId, next: JobState) -> Result<JobView, RegistryError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or(RegistryError::NotFound(*id))?;

        let from = job.state.status();
        let to = next.status();
        if !from.can_transition_to(to) {
            return Err(RegistryError::IllegalTransition { id: *id, from, to });
        }

        job.state = next;
        job.updated_at = Utc::now();
        Ok(job.view())
    }

    /// Snapshot of one job.
    pub async fn get(&self, id: &JobId) -> Option<JobView> {
        self.jobs.read().await.get(id).map(Job::view)
    }

    /// Per-status tally of every tracked job.
    pub async fn counts(&self) -> StatusCounts {
        let jobs = self.jobs.read().await;
        let mut counts = StatusCounts::default();
        for job in jobs.values() {
            counts.record(job.state.status());
        }
        counts
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
