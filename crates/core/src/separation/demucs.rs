//! Demucs command-line engine.
//!
//! Invocation: `{program} -n {model} -o {output_dir} {input}`. A clean
//! run leaves `{output_dir}/{model}/{track}/{vocals,drums,bass,other}.wav`.

use std::io;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::engine::{ExitInfo, RunOutcome, SeparationEngine, SeparationError};
use super::subprocess::{run_command, Completion};

/// Default engine executable, resolved through `PATH`.
pub const DEFAULT_PROGRAM: &str = "demucs";

/// Default model: the fine-tuned four-stem hybrid transformer.
pub const DEFAULT_MODEL: &str = "htdemucs_ft";

/// Runs the Demucs CLI as a child process.
#[derive(Debug, Clone)]
pub struct DemucsEngine {
    program: String,
    model: String,
    timeout: Option<Duration>,
}

impl DemucsEngine {
    pub fn new(program: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            model: model.into(),
            timeout: None,
        }
    }

    /// Kill runs that exceed `timeout`. `None` (the default) waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self, input: &Path, output_dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-n")
            .arg(&self.model)
            .arg("-o")
            .arg(output_dir)
            .arg(input);
        cmd
    }
}

impl Default for DemucsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM, DEFAULT_MODEL)
    }
}

#[async_trait]
impl SeparationEngine for DemucsEngine {
    fn model(&self) -> &str {
        &self.model
    }

    async fn run(&self, input: &Path, output_dir: &Path) -> Result<RunOutcome, SeparationError> {
        let mut cmd = self.command(input, output_dir);

        tracing::debug!(
            program = %self.program,
            model = %self.model,
            input = %input.display(),
            "Spawning separation engine",
        );

        let output = match run_command(&mut cmd, self.timeout).await {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SeparationError::NotFound {
                    program: self.program.clone(),
                });
            }
            Err(e) => return Err(SeparationError::Io(e)),
        };

        let outcome = match output.completion {
            Completion::Exited(status) if status.success() => RunOutcome::Success,
            Completion::Exited(status) => RunOutcome::EngineFailure(ExitInfo {
                exit_code: status.code(),
                timed_out: false,
                stderr_tail: output.stderr_tail,
                duration_ms: output.duration_ms,
            }),
            Completion::TimedOut => RunOutcome::EngineFailure(ExitInfo {
                exit_code: None,
                timed_out: true,
                stderr_tail: output.stderr_tail,
                duration_ms: output.duration_ms,
            }),
        };

        tracing::debug!(
            model = %self.model,
            duration_ms = output.duration_ms,
            success = matches!(outcome, RunOutcome::Success),
            "Separation engine finished",
        );

        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
