//! Background execution configuration.
//!
//! | Env Var                   | Default           |
//! |---------------------------|-------------------|
//! | `WORKSPACE_ROOT`          | system temp dir   |
//! | `MAX_CONCURRENT_JOBS`     | `2`               |
//! | `SEPARATION_PROGRAM`      | `demucs`          |
//! | `SEPARATION_MODEL`        | `htdemucs_ft`     |
//! | `SEPARATION_TIMEOUT_SECS` | unset (no limit)  |

use std::path::PathBuf;
use std::time::Duration;

use stemsplit_core::config::{optional, parse_optional, parse_or, ConfigError};
use stemsplit_core::separation::demucs::{DEFAULT_MODEL, DEFAULT_PROGRAM};
use stemsplit_core::separation::DemucsEngine;

/// Default number of simultaneous engine invocations.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;

/// Directory name created under the system temp dir when
/// `WORKSPACE_ROOT` is unset.
const DEFAULT_WORKSPACE_DIR: &str = "stemsplit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Parent directory of every per-job workspace.
    pub workspace_root: PathBuf,
    pub max_concurrent_jobs: usize,
    pub separation_program: String,
    pub separation_model: String,
    pub separation_timeout: Option<Duration>,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workspace_root = optional(&lookup, "WORKSPACE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_WORKSPACE_DIR));

        let max_concurrent_jobs: usize =
            parse_or(&lookup, "MAX_CONCURRENT_JOBS", DEFAULT_MAX_CONCURRENT_JOBS)?;
        if max_concurrent_jobs == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_CONCURRENT_JOBS",
                value: "0".into(),
                reason: "must be at least 1".into(),
            });
        }

        let separation_timeout =
            parse_optional::<_, u64>(&lookup, "SEPARATION_TIMEOUT_SECS")?.map(Duration::from_secs);

        Ok(Self {
            workspace_root,
            max_concurrent_jobs,
            separation_program: optional(&lookup, "SEPARATION_PROGRAM")
                .unwrap_or_else(|| DEFAULT_PROGRAM.into()),
            separation_model: optional(&lookup, "SEPARATION_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.into()),
            separation_timeout,
        })
    }

    /// The engine described by this config.
    pub fn engine(&self) -> DemucsEngine {
        DemucsEngine::new(&self.separation_program, &self.separation_model)
            .with_timeout(self.separation_timeout)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
