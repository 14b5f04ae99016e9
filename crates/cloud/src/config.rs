//! Object storage configuration.
//!
//! | Env Var                 | Backend | Default                          |
//! |-------------------------|---------|----------------------------------|
//! | `STORAGE_BACKEND`       | all     | `s3`                             |
//! | `S3_BUCKET`             | s3      | required                         |
//! | `S3_PUBLIC_BASE`        | s3      | required                         |
//! | `AWS_ENDPOINT_URL`      | s3      | required                         |
//! | `AWS_ACCESS_KEY_ID`     | s3      | required                         |
//! | `AWS_SECRET_ACCESS_KEY` | s3      | required                         |
//! | `AWS_REGION`            | s3      | `auto`                           |
//! | `LOCAL_STORAGE_PATH`    | local   | required                         |
//! | `S3_PUBLIC_BASE`        | local   | `http://localhost:{PORT}/files`  |

use std::fmt;
use std::path::PathBuf;

use stemsplit_core::config::{optional, parse_or, required, ConfigError};

/// Route under which the API serves the local backend's directory.
pub const LOCAL_FILES_ROUTE: &str = "/files";

/// Region used when `AWS_REGION` is unset. Cloudflare R2 expects `auto`.
pub const DEFAULT_REGION: &str = "auto";

/// Connection details for an S3-compatible store.
#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub public_base: String,
    pub endpoint_url: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

// Hand-written so the secret never lands in logs.
impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("public_base", &self.public_base)
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Filesystem-backed store for development.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub root: PathBuf,
    pub public_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    S3(S3Config),
    Local(LocalConfig),
}

impl StorageConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` for each key. Missing required keys fail here,
    /// at startup, never per job.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = optional(&lookup, "STORAGE_BACKEND").unwrap_or_else(|| "s3".into());

        match backend.to_ascii_lowercase().as_str() {
            "s3" => Ok(Self::S3(S3Config {
                bucket: required(&lookup, "S3_BUCKET")?,
                public_base: required(&lookup, "S3_PUBLIC_BASE")?,
                endpoint_url: required(&lookup, "AWS_ENDPOINT_URL")?,
                region: optional(&lookup, "AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.into()),
                access_key_id: required(&lookup, "AWS_ACCESS_KEY_ID")?,
                secret_access_key: required(&lookup, "AWS_SECRET_ACCESS_KEY")?,
            })),
            "local" => {
                let root = PathBuf::from(required(&lookup, "LOCAL_STORAGE_PATH")?);
                let public_base = match optional(&lookup, "S3_PUBLIC_BASE") {
                    Some(base) => base,
                    None => {
                        let port: u16 = parse_or(&lookup, "PORT", 3000)?;
                        format!("http://localhost:{port}{LOCAL_FILES_ROUTE}")
                    }
                };
                Ok(Self::Local(LocalConfig { root, public_base }))
            }
            _ => Err(ConfigError::Invalid {
                key: "STORAGE_BACKEND",
                value: backend,
                reason: "must be one of: s3, local".into(),
            }),
        }
    }

    pub fn public_base(&self) -> &str {
        match self {
            Self::S3(c) => &c.public_base,
            Self::Local(c) => &c.public_base,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::S3(_) => "s3",
            Self::Local(_) => "local",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
