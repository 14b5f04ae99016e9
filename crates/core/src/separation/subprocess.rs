//! Child-process plumbing for engine runs.
//!
//! [`run_command`] spawns the prepared [`Command`], drains stdout and
//! stderr concurrently (keeping only a bounded tail of stderr), and
//! enforces an optional timeout. The child is killed if the wait is
//! abandoned.

use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Bytes of stderr retained for diagnostics.
pub(crate) const STDERR_TAIL_BYTES: usize = 4 * 1024;

/// How long to keep draining pipes after the child is gone. Grandchildren
/// that inherited the pipes can otherwise hold them open indefinitely.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// How the child finished.
#[derive(Debug)]
pub(crate) enum Completion {
    Exited(ExitStatus),
    TimedOut,
}

#[derive(Debug)]
pub(crate) struct CommandOutput {
    pub completion: Completion,
    pub stderr_tail: String,
    pub duration_ms: u64,
}

/// Run `cmd` to completion (or until `timeout` elapses).
///
/// Spawn failures are returned as `Err`; anything the child does after
/// starting is reported through [`CommandOutput`].
pub(crate) async fn run_command(
    cmd: &mut Command,
    timeout: Option<Duration>,
) -> io::Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn()?;

    // Both pipes must be drained or a chatty engine blocks on a full pipe.
    let mut stdout_task = tokio::spawn(read_tail(child.stdout.take(), 0));
    let mut stderr_task = tokio::spawn(read_tail(child.stderr.take(), STDERR_TAIL_BYTES));

    let completion = match timeout {
        None => Completion::Exited(child.wait().await?),
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => Completion::Exited(status?),
            Err(_elapsed) => {
                let _ = child.kill().await;
                Completion::TimedOut
            }
        },
    };

    let stderr = match tokio::time::timeout(DRAIN_GRACE, &mut stderr_task).await {
        Ok(Ok(bytes)) => bytes,
        _ => Vec::new(),
    };
    let _ = tokio::time::timeout(DRAIN_GRACE, &mut stdout_task).await;
    stderr_task.abort();
    stdout_task.abort();

    Ok(CommandOutput {
        completion,
        stderr_tail: String::from_utf8_lossy(&stderr).into_owned(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

/// Read `handle` to EOF, keeping at most the last `keep` bytes.
async fn read_tail<R: AsyncRead + Unpin>(handle: Option<R>, keep: usize) -> Vec<u8> {
    let mut tail = Vec::new();
    let Some(mut reader) = handle else {
        return tail;
    };

    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > keep {
                    let excess = tail.len() - keep;
                    tail.drain(..excess);
                }
            }
        }
    }
    tail
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn reports_successful_exit() {
        let out = run_command(&mut sh("exit 0"), None).await.unwrap();
        assert!(matches!(out.completion, Completion::Exited(s) if s.success()));
    }

    #[tokio::test]
    async fn reports_non_zero_exit_and_stderr() {
        let out = run_command(&mut sh("echo boom >&2; exit 3"), None)
            .await
            .unwrap();
        assert!(matches!(out.completion, Completion::Exited(s) if s.code() == Some(3)));
        assert_eq!(out.stderr_tail.trim(), "boom");
    }

    #[tokio::test]
    async fn keeps_only_stderr_tail() {
        let script = "i=0; while [ $i -lt 2000 ]; do echo line-$i >&2; i=$((i+1)); done; echo last >&2";
        let out = run_command(&mut sh(script), None).await.unwrap();
        assert!(out.stderr_tail.len() <= STDERR_TAIL_BYTES);
        assert!(out.stderr_tail.trim_end().ends_with("last"));
    }

    #[tokio::test]
    async fn large_stdout_does_not_deadlock() {
        let script = "i=0; while [ $i -lt 20000 ]; do echo padding-padding-padding-$i; i=$((i+1)); done";
        let out = run_command(&mut sh(script), Some(Duration::from_secs(20)))
            .await
            .unwrap();
        assert!(matches!(out.completion, Completion::Exited(s) if s.success()));
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let out = run_command(&mut sh("exec sleep 30"), Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert!(matches!(out.completion, Completion::TimedOut));
        assert!(out.duration_ms < 10_000);
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let mut cmd = Command::new("/definitely/not/a/real/binary");
        let err = run_command(&mut cmd, None).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
