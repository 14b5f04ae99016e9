//! Fake engines and stores shared by the orchestrator tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use stemsplit_cloud::{ArtifactPublisher, LocalStore, ObjectStore, StoreError};
use stemsplit_core::job::{JobStatus, JobView};
use stemsplit_core::separation::{ExitInfo, RunOutcome, SeparationEngine, SeparationError};
use stemsplit_core::stems::{artifact_key, Stem};
use stemsplit_core::types::JobId;
use stemsplit_pipeline::Orchestrator;

pub const PUBLIC_BASE: &str = "https://cdn.example.com/stems-bucket";
pub const FAKE_MODEL: &str = "fake_model";

/// Bytes a fake engine writes for `stem` when separating `input`.
pub fn placeholder_contents(input: &[u8], stem: Stem) -> Vec<u8> {
    let mut contents = input.to_vec();
    contents.extend_from_slice(format!("|{stem}").as_bytes());
    contents
}

/// Write placeholder stem files where a real engine would. Each stem
/// echoes the input, so stored objects can be traced back to their job.
fn write_placeholders(input: &Path, stems_dir: &Path, skip: Option<Stem>) -> std::io::Result<()> {
    let source = std::fs::read(input)?;
    std::fs::create_dir_all(stems_dir)?;
    for stem in Stem::ALL {
        if Some(stem) != skip {
            std::fs::write(stems_dir.join(stem.file_name()), placeholder_contents(&source, stem))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Engines
// ---------------------------------------------------------------------------

/// Succeeds and writes placeholder stems, optionally leaving one out.
#[derive(Default)]
pub struct PlaceholderEngine {
    pub skip: Option<Stem>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl SeparationEngine for PlaceholderEngine {
    fn model(&self) -> &str {
        FAKE_MODEL
    }

    async fn run(&self, input: &Path, output_dir: &Path) -> Result<RunOutcome, SeparationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        write_placeholders(input, &self.stems_dir(input, output_dir), self.skip)?;
        Ok(RunOutcome::Success)
    }
}

/// Exits non-zero.
pub struct FailingEngine;

#[async_trait]
impl SeparationEngine for FailingEngine {
    fn model(&self) -> &str {
        FAKE_MODEL
    }

    async fn run(&self, input: &Path, _output_dir: &Path) -> Result<RunOutcome, SeparationError> {
        Ok(RunOutcome::EngineFailure(ExitInfo {
            exit_code: Some(1),
            timed_out: false,
            stderr_tail: format!("Traceback: cannot decode {}", input.display()),
            duration_ms: 12,
        }))
    }
}

/// Binary could not be launched.
pub struct MissingBinaryEngine;

#[async_trait]
impl SeparationEngine for MissingBinaryEngine {
    fn model(&self) -> &str {
        FAKE_MODEL
    }

    async fn run(&self, _input: &Path, _output_dir: &Path) -> Result<RunOutcome, SeparationError> {
        Err(SeparationError::NotFound {
            program: "demucs".into(),
        })
    }
}

pub struct PanickingEngine;

#[async_trait]
impl SeparationEngine for PanickingEngine {
    fn model(&self) -> &str {
        FAKE_MODEL
    }

    async fn run(&self, _input: &Path, _output_dir: &Path) -> Result<RunOutcome, SeparationError> {
        panic!("engine adapter bug");
    }
}

/// Blocks each run until the test releases a permit, then succeeds.
pub struct GatedEngine {
    pub gate: Semaphore,
    pub started: AtomicUsize,
}

impl GatedEngine {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
        }
    }

    /// Let `n` blocked runs finish.
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SeparationEngine for GatedEngine {
    fn model(&self) -> &str {
        FAKE_MODEL
    }

    async fn run(&self, input: &Path, output_dir: &Path) -> Result<RunOutcome, SeparationError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        write_placeholders(input, &self.stems_dir(input, output_dir), None)?;
        Ok(RunOutcome::Success)
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Rejects every upload.
pub struct RejectingStore;

#[async_trait]
impl ObjectStore for RejectingStore {
    fn name(&self) -> &'static str {
        "rejecting"
    }

    async fn put_file(&self, key: &str, _path: &Path, _content_type: &str) -> Result<(), StoreError> {
        Err(StoreError::Upload {
            key: key.to_string(),
            message: "403 AccessDenied".into(),
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Temp directories backing one orchestrator under test.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub workspaces: TempDir,
    pub bucket: TempDir,
}

impl Harness {
    pub fn new(engine: Arc<dyn SeparationEngine>, slots: usize) -> Self {
        let bucket = TempDir::new().unwrap();
        let store: Arc<dyn ObjectStore> = Arc::new(LocalStore::new(bucket.path()));
        Self::with_store(engine, store, bucket, slots)
    }

    pub fn with_store(
        engine: Arc<dyn SeparationEngine>,
        store: Arc<dyn ObjectStore>,
        bucket: TempDir,
        slots: usize,
    ) -> Self {
        let workspaces = TempDir::new().unwrap();
        let publisher = ArtifactPublisher::new(store, PUBLIC_BASE);
        let orchestrator = Orchestrator::new(engine, publisher, workspaces.path(), slots);
        Self {
            orchestrator,
            workspaces,
            bucket,
        }
    }

    pub async fn submit(&self, name: &str) -> JobView {
        self.submit_bytes(name, b"RIFF....WAVEfmt ").await
    }

    pub async fn submit_bytes(&self, name: &str, bytes: &[u8]) -> JobView {
        self.orchestrator.submit(name, bytes).await.unwrap()
    }

    /// Bytes stored in the bucket under `id`'s key for `stem`.
    pub fn stored(&self, id: &JobId, stem: Stem) -> Vec<u8> {
        std::fs::read(self.bucket.path().join(artifact_key(id, stem))).unwrap()
    }

    /// Poll until the job is terminal, recording every status observed.
    pub async fn wait_terminal(&self, id: &JobId) -> (JobView, Vec<JobStatus>) {
        let mut seen = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let view = self.orchestrator.status(id).await.expect("job is registered");
            if seen.last() != Some(&view.status) {
                seen.push(view.status);
            }
            if view.status.is_terminal() {
                return (view, seen);
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "job {id} did not finish; last status {}",
                view.status
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Poll until the job reaches `status`.
    pub async fn wait_for(&self, id: &JobId, status: JobStatus) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        while self.orchestrator.status(id).await.map(|v| v.status) != Some(status) {
            assert!(tokio::time::Instant::now() < deadline, "job {id} never reached {status}");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Entries left under the workspace root.
    pub fn leftover_workspaces(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.workspaces.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }
}
