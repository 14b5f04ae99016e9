//! Per-job temporary workspace.
//!
//! Each job owns one directory `{root}/job_{job_id}` holding the uploaded
//! input and the engine's output tree:
//!
//! ```text
//! job_{id}/
//!   input/{sanitized file name}
//!   output/{model}/{track}/{stem}.wav
//! ```
//!
//! A [`Workspace`] is removed by [`Workspace::release`], and again (as a
//! no-op or fallback) when the value is dropped, so no exit path of the
//! owning task can leak the directory.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::sanitize::sanitize_filename;
use crate::types::JobId;

/// Sub-directory holding the uploaded source file.
pub const INPUT_DIR: &str = "input";

/// Sub-directory handed to the separation engine.
pub const OUTPUT_DIR: &str = "output";

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace directory {path}: {source}")]
    Create { path: PathBuf, source: io::Error },

    #[error("failed to write input file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error(transparent)]
    InvalidFilename(CoreError),
}

impl From<WorkspaceError> for CoreError {
    fn from(err: WorkspaceError) -> Self {
        match err {
            WorkspaceError::InvalidFilename(core) => core,
            other => CoreError::Internal(other.to_string()),
        }
    }
}

/// Exclusive handle on one job's workspace directory.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create the workspace for `job_id` under `base`.
    ///
    /// The directory name derives from the job id only; creation fails
    /// rather than reusing an existing directory.
    pub async fn acquire(base: &Path, job_id: &JobId) -> Result<Self, WorkspaceError> {
        tokio::fs::create_dir_all(base)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: base.to_path_buf(),
                source,
            })?;

        let root = base.join(format!("job_{job_id}"));
        tokio::fs::create_dir(&root)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: root.clone(),
                source,
            })?;

        // From here on the directory exists, so `Drop` covers cleanup.
        let workspace = Self {
            root,
            released: false,
        };
        let input_dir = workspace.input_dir();
        tokio::fs::create_dir(&input_dir)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: input_dir.clone(),
                source,
            })?;

        tracing::debug!(job_id = %job_id, path = %workspace.root.display(), "Workspace acquired");
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join(INPUT_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Persist the uploaded payload and return its absolute path.
    ///
    /// `file_name` is untrusted; it is reduced to a single safe path
    /// component before use.
    pub async fn write_input(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, WorkspaceError> {
        let safe_name = sanitize_filename(file_name).map_err(WorkspaceError::InvalidFilename)?;
        let path = self.input_dir().join(safe_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| WorkspaceError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }

    /// Create the output directory handed to the separation engine.
    pub async fn prepare_output(&self) -> Result<PathBuf, WorkspaceError> {
        let dir = self.output_dir();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }

    /// Recursively delete the workspace.
    ///
    /// Idempotent and infallible: a missing directory is fine, other
    /// removal errors are logged.
    pub async fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        log_removal(&self.root, tokio::fs::remove_dir_all(&self.root).await);
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            log_removal(&self.root, std::fs::remove_dir_all(&self.root));
        }
    }
}

fn log_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Workspace released"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to remove workspace directory",
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn acquire_creates_job_directory() {
        let base = TempDir::new().unwrap();
        let id = JobId::new();
        let ws = Workspace::acquire(base.path(), &id).await.unwrap();

        assert_eq!(ws.root(), base.path().join(format!("job_{id}")));
        assert!(ws.root().is_dir());
        assert!(ws.input_dir().is_dir());
    }

    #[tokio::test]
    async fn acquire_creates_missing_base() {
        let base = TempDir::new().unwrap();
        let nested = base.path().join("a").join("b");
        let ws = Workspace::acquire(&nested, &JobId::new()).await.unwrap();
        assert!(ws.root().starts_with(&nested));
    }

    #[tokio::test]
    async fn acquire_refuses_existing_directory() {
        let base = TempDir::new().unwrap();
        let id = JobId::new();
        let _first = Workspace::acquire(base.path(), &id).await.unwrap();
        let second = Workspace::acquire(base.path(), &id).await;
        assert_matches!(second, Err(WorkspaceError::Create { .. }));
    }

    #[tokio::test]
    async fn write_input_stays_inside_workspace() {
        let base = TempDir::new().unwrap();
        let ws = Workspace::acquire(base.path(), &JobId::new()).await.unwrap();

        let path = ws.write_input("../../escape.wav", b"RIFF").await.unwrap();

        assert_eq!(path, ws.input_dir().join("escape.wav"));
        assert_eq!(std::fs::read(&path).unwrap(), b"RIFF");
        assert!(!base.path().join("escape.wav").exists());
    }

    #[tokio::test]
    async fn write_input_rejects_unusable_name() {
        let base = TempDir::new().unwrap();
        let ws = Workspace::acquire(base.path(), &JobId::new()).await.unwrap();
        let err = ws.write_input("..", b"x").await.unwrap_err();
        assert_matches!(err, WorkspaceError::InvalidFilename(CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn prepare_output_creates_directory() {
        let base = TempDir::new().unwrap();
        let ws = Workspace::acquire(base.path(), &JobId::new()).await.unwrap();
        let out = ws.prepare_output().await.unwrap();
        assert!(out.is_dir());
        assert_eq!(out, ws.output_dir());
    }

    #[tokio::test]
    async fn release_removes_tree_and_is_idempotent() {
        let base = TempDir::new().unwrap();
        let mut ws = Workspace::acquire(base.path(), &JobId::new()).await.unwrap();
        ws.write_input("song.wav", b"data").await.unwrap();
        ws.prepare_output().await.unwrap();
        let root = ws.root().to_path_buf();

        ws.release().await;
        assert!(!root.exists());
        assert!(ws.is_released());

        ws.release().await;
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn release_tolerates_already_deleted_directory() {
        let base = TempDir::new().unwrap();
        let mut ws = Workspace::acquire(base.path(), &JobId::new()).await.unwrap();
        std::fs::remove_dir_all(ws.root()).unwrap();
        ws.release().await;
        assert!(ws.is_released());
    }

    #[tokio::test]
    async fn drop_releases_unreleased_workspace() {
        let base = TempDir::new().unwrap();
        let root = {
            let ws = Workspace::acquire(base.path(), &JobId::new()).await.unwrap();
            ws.root().to_path_buf()
        };
        assert!(!root.exists());
    }

    #[test]
    fn invalid_filename_maps_to_validation() {
        let err = WorkspaceError::InvalidFilename(CoreError::Validation("bad".into()));
        assert_matches!(CoreError::from(err), CoreError::Validation(_));
    }

    #[test]
    fn io_failures_map_to_internal() {
        let err = WorkspaceError::Write {
            path: PathBuf::from("/x"),
            source: io::Error::other("disk full"),
        };
        assert_matches!(CoreError::from(err), CoreError::Internal(_));
    }
}
