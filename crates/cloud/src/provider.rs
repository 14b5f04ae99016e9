//! Storage provider trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read local file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("upload of '{key}' failed: {message}")]
    Upload { key: String, message: String },
}

/// A put-object style blob store.
///
/// Implementations are shared across concurrently running jobs; keys from
/// different jobs never overlap so no coordination is needed.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short backend name for logs (`"s3"`, `"local"`).
    fn name(&self) -> &'static str;

    /// Upload the file at `path` under `key` with the given content type.
    async fn put_file(&self, key: &str, path: &Path, content_type: &str) -> Result<(), StoreError>;
}
