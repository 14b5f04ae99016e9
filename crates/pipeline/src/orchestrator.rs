//! Job orchestrator.
//!
//! [`Orchestrator::submit`] persists the upload into a fresh workspace,
//! registers the job as `queued` and spawns its background execution
//! without waiting on it. The background task waits for a worker slot,
//! runs the separation engine, publishes the stems and records exactly
//! one terminal state. The workspace is released before that terminal
//! state becomes visible.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use stemsplit_cloud::ArtifactPublisher;
use stemsplit_core::error::CoreError;
use stemsplit_core::job::{FailureKind, JobFailure, JobState, JobView};
use stemsplit_core::separation::{RunOutcome, SeparationEngine};
use stemsplit_core::stems::StemUrls;
use stemsplit_core::types::JobId;
use stemsplit_core::workspace::Workspace;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::registry::JobRegistry;

/// Progress note shown while a job holds a worker slot.
pub const RUNNING_DETAIL: &str = "Separating stems";

/// Submits jobs and drives them to a terminal state in the background.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
    tracker: TaskTracker,
}

struct Inner {
    registry: JobRegistry,
    engine: Arc<dyn SeparationEngine>,
    publisher: ArtifactPublisher,
    workspace_root: PathBuf,
    slots: Semaphore,
}

impl Orchestrator {
    /// `max_concurrent_jobs` bounds simultaneous engine invocations; extra
    /// jobs wait in `queued`.
    pub fn new(
        engine: Arc<dyn SeparationEngine>,
        publisher: ArtifactPublisher,
        workspace_root: impl Into<PathBuf>,
        max_concurrent_jobs: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: JobRegistry::new(),
                engine,
                publisher,
                workspace_root: workspace_root.into(),
                slots: Semaphore::new(max_concurrent_jobs.max(1)),
            }),
            tracker: TaskTracker::new(),
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    /// `false` once [`Orchestrator::shutdown`] has begun.
    pub fn is_accepting(&self) -> bool {
        !self.tracker.is_closed()
    }

    /// Number of background executions not yet finished.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Accept an upload and schedule its processing.
    ///
    /// Returns the `queued` snapshot as soon as the input is on disk. Only
    /// an unusable upload or a workspace that cannot be created fails
    /// here; every later failure is recorded on the job itself.
    pub async fn submit(&self, file_name: &str, bytes: &[u8]) -> Result<JobView, CoreError> {
        if !self.is_accepting() {
            return Err(CoreError::Conflict(
                "Service is shutting down and not accepting jobs".into(),
            ));
        }
        if bytes.is_empty() {
            return Err(CoreError::Validation("Uploaded file is empty".into()));
        }

        let id = JobId::new();
        let workspace = Workspace::acquire(&self.inner.workspace_root, &id).await?;
        let input = workspace.write_input(file_name, bytes).await?;
        let view = self.inner.registry.create(id).await?;

        tracing::info!(
            job_id = %id,
            file_name = %input.file_name().unwrap_or_default().to_string_lossy(),
            size_bytes = bytes.len(),
            "Job submitted",
        );

        let inner = Arc::clone(&self.inner);
        self.tracker.spawn(inner.execute(id, workspace, input));
        Ok(view)
    }

    /// Current snapshot of a job, or `None` for an unknown id.
    pub async fn status(&self, id: &JobId) -> Option<JobView> {
        self.inner.registry.get(id).await
    }

    /// Stop accepting jobs and wait up to `timeout` for in-flight ones.
    ///
    /// Returns `true` if every background execution finished in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight jobs");
        }
        tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok()
    }
}

impl Inner {
    /// Background execution of one job. Never returns an error: every
    /// outcome, including a panic, ends in a terminal registry state.
    async fn execute(self: Arc<Self>, id: JobId, mut workspace: Workspace, input: PathBuf) {
        // The semaphore is never closed, so the permit is always granted.
        let _slot = self.slots.acquire().await.ok();

        let running = JobState::Running {
            detail: RUNNING_DETAIL.to_string(),
        };
        if let Err(e) = self.registry.transition(&id, running).await {
            tracing::error!(job_id = %id, error = %e, "Failed to start job");
            workspace.release().await;
            return;
        }
        tracing::info!(job_id = %id, model = self.engine.model(), "Job running");

        let outcome = AssertUnwindSafe(self.process(&id, &workspace, &input))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(downloads)) => Ok(downloads),
            Ok(Err(failure)) => Err(failure),
            Err(payload) => {
                let raw = format!("Unexpected internal error: {}", panic_message(payload.as_ref()));
                tracing::error!(job_id = %id, error = %raw, "Job execution panicked");
                Err(JobFailure::new(
                    FailureKind::Unclassified,
                    &raw,
                    &[workspace.root()],
                ))
            }
        };

        workspace.release().await;

        let terminal = match result {
            Ok(downloads) => JobState::Done { downloads },
            Err(failure) => JobState::Error { failure },
        };
        match self.registry.transition(&id, terminal).await {
            Ok(view) => match view.error_kind {
                None => tracing::info!(job_id = %id, "Job done"),
                Some(kind) => tracing::warn!(
                    job_id = %id,
                    error_kind = ?kind,
                    error = view.error.as_deref().unwrap_or_default(),
                    "Job failed",
                ),
            },
            Err(e) => tracing::error!(job_id = %id, error = %e, "Failed to record job outcome"),
        }
    }

    /// Run the engine and publish its stems.
    async fn process(
        &self,
        id: &JobId,
        workspace: &Workspace,
        input: &Path,
    ) -> Result<StemUrls, JobFailure> {
        let redact = [workspace.root()];

        let output_dir = workspace
            .prepare_output()
            .await
            .map_err(|e| JobFailure::new(FailureKind::Resource, &e.to_string(), &redact))?;

        match self.engine.run(input, &output_dir).await {
            Ok(RunOutcome::Success) => {}
            Ok(RunOutcome::EngineFailure(info)) => {
                tracing::warn!(
                    job_id = %id,
                    exit_code = ?info.exit_code,
                    timed_out = info.timed_out,
                    duration_ms = info.duration_ms,
                    stderr_tail = %info.stderr_tail,
                    "Separation engine failed",
                );
                return Err(JobFailure::engine());
            }
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Separation engine could not run");
                return Err(JobFailure::new(
                    FailureKind::Unclassified,
                    &e.to_string(),
                    &redact,
                ));
            }
        }

        let stems_dir = self.engine.stems_dir(input, &output_dir);
        self.publisher
            .publish_all(id, &stems_dir)
            .await
            .map_err(|e| JobFailure::new(e.failure_kind(), &e.to_string(), &redact))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "panic"
    }
}
