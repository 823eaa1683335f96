//! checkrace: run a type checker and its daemon side by side and report
//! whichever trustworthy result arrives first.
//!
//! Every argument after the program name goes to both checkers untouched,
//! `--` and non-UTF-8 values included; checkrace has no flags of its own.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use checkrace_core::RaceState;
use checkrace_runner::{CheckerBackend, CommandBackend, RaceCoordinator};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod report;

use config::{Config, DEFAULT_LOG_DIRECTIVE, LOG_ENV};

#[tokio::main]
async fn main() -> ExitCode {
    let args = forwarded_args(std::env::args_os());

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_ENV))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    // Load config
    let config = Config::from_env();
    info!(
        oneshot = %config.oneshot_path.display(),
        daemon = %config.daemon_path.display(),
        grace_ms = config.grace_period.as_millis() as u64,
        "Starting checkrace"
    );

    let backend = Arc::new(CommandBackend::new(config.toolchain()));
    let coordinator = RaceCoordinator::new(backend, config.grace_period);

    let mut stdout = io::stdout();
    let mut stderr = io::stderr();

    // Dropping the race on interrupt drops every checker child with it.
    let status = tokio::select! {
        status = run(args, &coordinator, &mut stdout, &mut stderr) => status,
        _ = interrupted() => {
            error!(parent: coordinator.span(), state = %RaceState::Aborted, "Keyboard interrupt");
            1
        }
    };

    ExitCode::from(status)
}

/// Everything after the program name, exactly as the OS passed it.
fn forwarded_args(argv: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    argv.into_iter().skip(1).collect()
}

/// Handle one invocation and return the exit status for it.
///
/// Without arguments only the usage message is written and no checker is
/// started.
async fn run<B, O, E>(
    args: Vec<OsString>,
    coordinator: &RaceCoordinator<B>,
    out: &mut O,
    err: &mut E,
) -> u8
where
    B: CheckerBackend,
    O: Write,
    E: Write,
{
    if args.is_empty() {
        if let Err(e) = report::usage(err) {
            error!(error = %e, "Failed to write usage");
        }
        return 1;
    }

    let outcome = match coordinator.race(args).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(parent: coordinator.span(), error = %e, "Race failed");
            return 1;
        }
    };

    if let Err(e) = report::report(&outcome.result, out, err) {
        error!(error = %e, "Failed to write checker output");
        return 1;
    }

    report::exit_status(outcome.result.exit_code)
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use checkrace_core::{ProcessKind, ProcessResult};
    use checkrace_runner::{RunnerError, DEFAULT_GRACE_PERIOD};
    use tokio_util::sync::CancellationToken;

    const CLEAN: &str = "Success: no issues found in 4 source files\n";

    /// Daemon answers cleanly right away; the one-shot checker is slow.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<(ProcessKind, Vec<OsString>)>>,
    }

    impl RecordingBackend {
        fn calls(&self) -> Vec<(ProcessKind, Vec<OsString>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CheckerBackend for RecordingBackend {
        async fn run(
            &self,
            kind: ProcessKind,
            args: Arc<[OsString]>,
            cancel: CancellationToken,
        ) -> Result<ProcessResult, RunnerError> {
            self.calls.lock().unwrap().push((kind, args.to_vec()));
            let after = match kind {
                ProcessKind::Daemon => Duration::from_millis(10),
                _ => Duration::from_secs(30),
            };
            tokio::select! {
                _ = tokio::time::sleep(after) => Ok(ProcessResult::new(kind, CLEAN, "", 0)),
                _ = cancel.cancelled() => Err(RunnerError::Cancelled(kind)),
            }
        }
    }

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    async fn invoke(backend: &Arc<RecordingBackend>, args: Vec<OsString>) -> (u8, String, String) {
        let coordinator = RaceCoordinator::new(Arc::clone(backend), DEFAULT_GRACE_PERIOD);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let status = run(args, &coordinator, &mut out, &mut err).await;
        (
            status,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_forwarded_args_skip_only_program_name() {
        assert!(forwarded_args(os_args(&["checkrace"])).is_empty());
        assert_eq!(
            forwarded_args(os_args(&["checkrace", "--strict", "-p", "app", "--help"])),
            os_args(&["--strict", "-p", "app", "--help"])
        );
    }

    #[test]
    fn test_leading_double_dash_is_kept() {
        assert_eq!(
            forwarded_args(os_args(&["checkrace", "--", "src/"])),
            os_args(&["--", "src/"])
        );
        assert_eq!(forwarded_args(os_args(&["checkrace", "--"])), os_args(&["--"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_args_prints_usage_without_launching() {
        let backend = Arc::new(RecordingBackend::default());

        let (status, out, err) = invoke(&backend, Vec::new()).await;

        assert_eq!(status, 1);
        assert!(out.is_empty());
        assert_eq!(err, report::USAGE);
        assert!(backend.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_double_dash_is_raced_not_usage() {
        let backend = Arc::new(RecordingBackend::default());

        let (status, out, err) = invoke(&backend, os_args(&["--"])).await;

        assert_eq!(status, 0);
        assert_eq!(out, CLEAN);
        assert!(err.is_empty());
        let calls = backend.calls();
        assert!(!calls.is_empty());
        for (_, args) in calls {
            assert_eq!(args, os_args(&["--"]));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_args_reach_both_checkers_verbatim() {
        let backend = Arc::new(RecordingBackend::default());

        let (status, out, _) = invoke(&backend, os_args(&["--", "src/"])).await;

        assert_eq!(status, 0);
        assert_eq!(out, CLEAN);
        let kinds: Vec<ProcessKind> = backend.calls().iter().map(|(k, _)| *k).collect();
        assert!(kinds.contains(&ProcessKind::Daemon));
        assert!(kinds.contains(&ProcessKind::OneShot));
        for (_, args) in backend.calls() {
            assert_eq!(args, os_args(&["--", "src/"]));
        }
    }

    #[cfg(unix)]
    #[tokio::test(start_paused = true)]
    async fn test_non_utf8_arg_is_forwarded() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(vec![b's', b'r', b'c', 0xff]);
        let backend = Arc::new(RecordingBackend::default());

        let (status, _, _) = invoke(&backend, vec![raw.clone()]).await;

        assert_eq!(status, 0);
        for (_, args) in backend.calls() {
            assert_eq!(args, vec![raw.clone()]);
        }
    }
}
