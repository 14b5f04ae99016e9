//! Publishes a job's stems to the object store.
//!
//! Each stem goes to `stems/{job_id}/{stem}.wav` and is reported back as
//! `{public_base}/{key}`. A job's URLs are returned only once all four
//! uploads succeed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stemsplit_core::job::FailureKind;
use stemsplit_core::stems::{artifact_key, public_url, Stem, StemUrls, STEM_CONTENT_TYPE};
use stemsplit_core::types::JobId;

use crate::provider::{ObjectStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("expected {stem} stem at {path} was not produced")]
    MissingArtifact { stem: Stem, path: PathBuf },

    #[error("failed to publish {stem} stem: {source}")]
    Upload {
        stem: Stem,
        #[source]
        source: StoreError,
    },
}

impl PublishError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::MissingArtifact { .. } => FailureKind::MissingArtifact,
            Self::Upload { .. } => FailureKind::Publish,
        }
    }
}

/// Applies the key and URL conventions on top of an [`ObjectStore`].
#[derive(Clone)]
pub struct ArtifactPublisher {
    store: Arc<dyn ObjectStore>,
    public_base: String,
}

impl ArtifactPublisher {
    pub fn new(store: Arc<dyn ObjectStore>, public_base: impl Into<String>) -> Self {
        Self {
            store,
            public_base: public_base.into(),
        }
    }

    /// Upload one stem file and return its public URL.
    ///
    /// A file that is not on disk is a [`PublishError::MissingArtifact`],
    /// never an upload failure.
    pub async fn publish(&self, job_id: &JobId, stem: Stem, path: &Path) -> Result<String, PublishError> {
        ensure_artifact(stem, path).await?;
        let key = artifact_key(job_id, stem);
        self.store
            .put_file(&key, path, STEM_CONTENT_TYPE)
            .await
            .map_err(|source| PublishError::Upload { stem, source })?;
        Ok(public_url(&self.public_base, &key))
    }

    /// Publish all four stems found in `stems_dir`.
    ///
    /// Every stem file is checked before anything is uploaded, so a missing
    /// artifact never leaves a partial upload behind. Uploads then run in
    /// fixed order and stop at the first failure.
    pub async fn publish_all(&self, job_id: &JobId, stems_dir: &Path) -> Result<StemUrls, PublishError> {
        let path_of = |stem: Stem| stems_dir.join(stem.file_name());
        for stem in Stem::ALL {
            ensure_artifact(stem, &path_of(stem)).await?;
        }

        let urls = StemUrls {
            vocals: self.publish(job_id, Stem::Vocals, &path_of(Stem::Vocals)).await?,
            drums: self.publish(job_id, Stem::Drums, &path_of(Stem::Drums)).await?,
            bass: self.publish(job_id, Stem::Bass, &path_of(Stem::Bass)).await?,
            other: self.publish(job_id, Stem::Other, &path_of(Stem::Other)).await?,
        };

        tracing::info!(
            job_id = %job_id,
            store = self.store.name(),
            "Published stems",
        );
        Ok(urls)
    }
}

async fn ensure_artifact(stem: Stem, path: &Path) -> Result<(), PublishError> {
    let is_file = tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if is_file {
        Ok(())
    } else {
        Err(PublishError::MissingArtifact {
            stem,
            path: path.to_path_buf(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
