//! Runs a single checker process to completion.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use checkrace_core::{ProcessKind, ProcessResult};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RunnerError;

/// Program and arguments for one checker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Launch `spec`, capture both output streams and wait for it to exit.
///
/// Firing `cancel` before the process exits kills and reaps the child and
/// yields [`RunnerError::Cancelled`]. Firing it afterwards does nothing.
pub async fn run(
    kind: ProcessKind,
    spec: &CommandSpec,
    cancel: CancellationToken,
) -> Result<ProcessResult, RunnerError> {
    debug!(
        kind = %kind,
        program = %spec.program.display(),
        args = ?spec.args,
        "Launching checker"
    );

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunnerError::Launch {
            kind,
            program: spec.program.display().to_string(),
            source,
        })?;

    let stdout = child.stdout.take().ok_or(RunnerError::MissingPipe("stdout"))?;
    let stderr = child.stderr.take().ok_or(RunnerError::MissingPipe("stderr"))?;

    // Both pipes are drained together; a child blocked on a full stderr
    // buffer would otherwise never close stdout.
    let drain = async { tokio::try_join!(read_all(stdout), read_all(stderr)) };

    let (out, err) = tokio::select! {
        drained = drain => drained?,
        _ = cancel.cancelled() => return Err(reap(kind, child).await),
    };

    let status = tokio::select! {
        status = child.wait() => status?,
        _ = cancel.cancelled() => return Err(reap(kind, child).await),
    };

    let exit_code = exit_code(status);
    debug!(
        kind = %kind,
        exit_code = exit_code,
        stdout_bytes = out.len(),
        stderr_bytes = err.len(),
        "Checker exited"
    );

    Ok(ProcessResult::new(
        kind,
        String::from_utf8_lossy(&out),
        String::from_utf8_lossy(&err),
        exit_code,
    ))
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Kill the child and wait for it so no zombie is left behind.
async fn reap(kind: ProcessKind, mut child: Child) -> RunnerError {
    match child.kill().await {
        Ok(()) => debug!(kind = %kind, "Cancelled checker killed and reaped"),
        Err(e) => warn!(kind = %kind, error = %e, "Failed to kill cancelled checker"),
    }
    RunnerError::Cancelled(kind)
}

/// Signal deaths follow the shell convention of `128 + signal`.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh", vec!["-c".into(), script.into()])
    }

    #[tokio::test]
    async fn test_captures_streams_and_exit_code() {
        let result = run(
            ProcessKind::OneShot,
            &sh("printf 'checked\\n'; printf 'oops\\n' >&2; exit 3"),
            CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.kind, ProcessKind::OneShot);
        assert_eq!(result.stdout, "checked\n");
        assert_eq!(result.stderr, "oops\n");
        assert_eq!(result.exit_code, 3);
    }

    #[tokio::test]
    async fn test_drains_large_output_on_both_streams() {
        // Well past the usual 64 KiB pipe buffer on each stream.
        let script = "i=0; while [ $i -lt 5000 ]; do \
                      echo 'stdout line padding padding padding'; \
                      echo 'stderr line padding padding padding' >&2; \
                      i=$((i+1)); done";
        let result = run(ProcessKind::Daemon, &sh(script), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.stdout.lines().count(), 5000);
        assert_eq!(result.stderr.lines().count(), 5000);
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_missing_executable_is_launch_error() {
        let spec = CommandSpec::new("/nonexistent/checkrace-test-binary", Vec::new());
        let err = run(ProcessKind::Kill, &spec, CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            RunnerError::Launch { kind, program, .. } => {
                assert_eq!(kind, ProcessKind::Kill);
                assert_eq!(program, "/nonexistent/checkrace-test-binary");
            }
            other => panic!("Expected Launch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancel_kills_running_process() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = run(ProcessKind::OneShot, &sh("sleep 30"), cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, RunnerError::Cancelled(ProcessKind::OneShot)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let cancel = CancellationToken::new();
        let result = run(ProcessKind::Daemon, &sh("echo done"), cancel.clone())
            .await
            .unwrap();
        cancel.cancel();

        assert_eq!(result.stdout, "done\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_signal_death_maps_to_shell_code() {
        let result = run(ProcessKind::Daemon, &sh("kill -9 $$"), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 128 + 9);
    }
}
