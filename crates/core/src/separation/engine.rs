//! Engine interface and outcome types.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::stems::engine_stems_dir;

/// Diagnostics about an abnormal engine exit. Logged, never stored on the
/// job record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitInfo {
    /// Process exit code; `None` when killed by a signal or timed out.
    pub exit_code: Option<i32>,
    /// Whether the run was killed for exceeding its time limit.
    pub timed_out: bool,
    /// Last bytes of stderr, lossily decoded.
    pub stderr_tail: String,
    /// Wall-clock run time in milliseconds.
    pub duration_ms: u64,
}

/// Result of an engine invocation that actually ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    EngineFailure(ExitInfo),
}

/// Operational failures around the engine (distinct from the engine
/// reporting failure itself).
#[derive(Debug, thiserror::Error)]
pub enum SeparationError {
    #[error("separation engine '{program}' could not be found")]
    NotFound { program: String },

    #[error("failed to run separation engine: {0}")]
    Io(#[from] io::Error),
}

/// A source-separation engine.
///
/// `run` may take minutes. Implementations must not block the async
/// runtime while the engine works.
#[async_trait]
pub trait SeparationEngine: Send + Sync {
    /// Model identifier passed to the engine; also names its output folder.
    fn model(&self) -> &str;

    /// Separate `input` into stems under `output_dir`. No retries.
    async fn run(&self, input: &Path, output_dir: &Path) -> Result<RunOutcome, SeparationError>;

    /// Where a successful run leaves the stem files for `input`.
    fn stems_dir(&self, input: &Path, output_dir: &Path) -> PathBuf {
        engine_stems_dir(output_dir, self.model(), input)
    }
}
