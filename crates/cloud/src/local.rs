//! Directory-backed object store for development and tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::provider::{ObjectStore, StoreError};

/// Copies objects to `{root}/{key}`.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        // Keys are generated internally, but never let one climb out of root.
        if key.split('/').any(|part| part.is_empty() || part == "." || part == "..") {
            return Err(StoreError::Upload {
                key: key.to_string(),
                message: "invalid object key".into(),
            });
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put_file(&self, key: &str, path: &Path, _content_type: &str) -> Result<(), StoreError> {
        let dest = self.object_path(key)?;
        let upload_err = |e: std::io::Error| StoreError::Upload {
            key: key.to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(upload_err)?;
        }

        match tokio::fs::copy(path, &dest).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !path.exists() => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            }
            Err(e) => return Err(upload_err(e)),
        }

        tracing::debug!(key, dest = %dest.display(), "Object stored locally");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
