//! Races the daemon checker against the one-shot checker.
//!
//! Decision rules, applied to whichever task finishes first:
//!
//! - daemon first, trustworthy: report it and cancel the one-shot checker
//! - daemon first, untrustworthy: reset the daemon with its kill command,
//!   then wait as long as it takes for the one-shot checker
//! - one-shot first: report it, and give the daemon a short grace period to
//!   finish so its outcome shows up in the logs
//!
//! Only the grace period is bounded. A type check that is cut short has
//! nothing useful to report.

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use checkrace_core::{is_trustworthy, ProcessKind, ProcessResult, RaceState};
use tokio::task::{self, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, info, info_span, warn, Instrument, Span};

use crate::backend::CheckerBackend;
use crate::error::RunnerError;

/// How long the daemon may keep running after the one-shot checker wins.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

type CheckerTasks = JoinSet<Result<ProcessResult, RunnerError>>;

/// The result chosen by a race, and how it was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceOutcome {
    /// Terminal state the race ended in.
    pub state: RaceState,

    /// The result to report.
    pub result: ProcessResult,
}

/// One of the two raced checker tasks.
struct RacingTask {
    kind: ProcessKind,
    id: task::Id,
    cancel: CancellationToken,
}

impl RacingTask {
    /// Fire-and-forget: the backend kills and reaps its own process.
    fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            debug!(kind = %self.kind, "Cancelling checker");
            self.cancel.cancel();
        }
    }
}

/// Runs both checker variants for one invocation and picks the result.
pub struct RaceCoordinator<B> {
    backend: Arc<B>,
    grace_period: Duration,
    span: Span,
}

impl<B: CheckerBackend> RaceCoordinator<B> {
    /// Create a coordinator along with its own `race` logging span.
    pub fn new(backend: Arc<B>, grace_period: Duration) -> Self {
        Self {
            backend,
            grace_period,
            span: info_span!("race"),
        }
    }

    /// Logging span every message of this race is recorded under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Race both checkers over `args` and return the result to report.
    pub async fn race(&self, args: Vec<OsString>) -> Result<RaceOutcome, RunnerError> {
        let args: Arc<[OsString]> = args.into();
        self.race_inner(args).instrument(self.span.clone()).await
    }

    async fn race_inner(&self, args: Arc<[OsString]>) -> Result<RaceOutcome, RunnerError> {
        let mut tasks = CheckerTasks::new();
        let daemon = self.spawn(&mut tasks, ProcessKind::Daemon, &args);
        let oneshot = self.spawn(&mut tasks, ProcessKind::OneShot, &args);

        let outcome = self.decide(&mut tasks, &daemon, &oneshot).await;

        if outcome.is_err() {
            daemon.cancel();
            oneshot.cancel();
        }
        // Anything still running was cancelled above or is finishing on its
        // own; neither is awaited.
        tasks.detach_all();

        if let Ok(outcome) = &outcome {
            info!(
                state = %outcome.state,
                winner = %outcome.result.kind,
                exit_code = outcome.result.exit_code,
                "Race decided"
            );
        }
        outcome
    }

    fn spawn(
        &self,
        tasks: &mut CheckerTasks,
        kind: ProcessKind,
        args: &Arc<[OsString]>,
    ) -> RacingTask {
        let cancel = CancellationToken::new();
        let backend = Arc::clone(&self.backend);
        let args = Arc::clone(args);
        let token = cancel.clone();

        let handle = tasks.spawn(
            async move { backend.run(kind, args, token).await }
                .instrument(debug_span!("checker", kind = %kind)),
        );

        RacingTask {
            kind,
            id: handle.id(),
            cancel,
        }
    }

    async fn decide(
        &self,
        tasks: &mut CheckerTasks,
        daemon: &RacingTask,
        oneshot: &RacingTask,
    ) -> Result<RaceOutcome, RunnerError> {
        let state = RaceState::Running;

        let (id, first) = tasks
            .join_next_with_id()
            .await
            .ok_or_else(|| RunnerError::Inconsistent("no checker task was running".to_string()))??;

        if id == daemon.id {
            let result = first?;
            if is_trustworthy(&result) {
                debug!(
                    exit_code = result.exit_code,
                    "Daemon finished first with a trustworthy result"
                );
                let state = state.transition(RaceState::DaemonWon)?;
                oneshot.cancel();
                return Ok(RaceOutcome { state, result });
            }

            warn!(
                exit_code = result.exit_code,
                stderr = %or_empty(&result.stderr),
                stdout = %or_empty(&result.stdout),
                "Daemon result rejected, falling back to one-shot checker"
            );
            self.kill_daemon().await?;

            let result = self.finish(tasks, oneshot).await?;
            let state = state.transition(RaceState::PrimaryWon)?;
            Ok(RaceOutcome { state, result })
        } else if id == oneshot.id {
            let result = first?;
            let state = state.transition(RaceState::PrimaryWon)?;
            debug!(
                exit_code = result.exit_code,
                "One-shot checker finished first, waiting for daemon to catch up"
            );
            self.observe_daemon(tasks, daemon).await;
            Ok(RaceOutcome { state, result })
        } else {
            Err(RunnerError::Inconsistent(format!(
                "completed task {id} is neither the daemon nor the one-shot checker"
            )))
        }
    }

    /// Wait, without a deadline, for `expected` to finish.
    async fn finish(
        &self,
        tasks: &mut CheckerTasks,
        expected: &RacingTask,
    ) -> Result<ProcessResult, RunnerError> {
        match tasks.join_next_with_id().await {
            Some(Ok((id, result))) if id == expected.id => result,
            Some(Ok((id, _))) => Err(RunnerError::Inconsistent(format!(
                "expected {} checker to finish, got task {id}",
                expected.kind
            ))),
            Some(Err(e)) => Err(e.into()),
            None => Err(RunnerError::Inconsistent(format!(
                "{} checker task disappeared",
                expected.kind
            ))),
        }
    }

    /// Give the daemon the grace period to finish. Whatever it produces is
    /// only logged.
    async fn observe_daemon(&self, tasks: &mut CheckerTasks, daemon: &RacingTask) {
        match tokio::time::timeout(self.grace_period, tasks.join_next()).await {
            Ok(Some(Ok(Ok(result)))) => debug!(
                exit_code = result.exit_code,
                trustworthy = is_trustworthy(&result),
                "Daemon finished within grace period"
            ),
            Ok(Some(Ok(Err(e)))) => debug!(error = %e, "Daemon failed within grace period"),
            Ok(Some(Err(e))) => warn!(error = %e, "Daemon task failed"),
            Ok(None) => {}
            Err(_) => {
                debug!(
                    grace_ms = self.grace_period.as_millis() as u64,
                    "Timeout waiting for daemon"
                );
                daemon.cancel();
            }
        }
    }

    /// Reset the daemon so the next invocation starts from a clean one.
    async fn kill_daemon(&self) -> Result<(), RunnerError> {
        let backend = Arc::clone(&self.backend);
        let no_args: Arc<[OsString]> = Arc::from(Vec::new());

        let handle = tokio::spawn(
            async move {
                backend
                    .run(ProcessKind::Kill, no_args, CancellationToken::new())
                    .await
            }
            .instrument(debug_span!("checker", kind = %ProcessKind::Kill)),
        );
        let result = handle.await??;

        if result.exit_code != 0 || !result.stderr.is_empty() {
            warn!(
                exit_code = result.exit_code,
                stderr = %result.stderr.trim(),
                "Failed to kill daemon"
            );
        } else {
            info!("Daemon killed");
        }
        Ok(())
    }
}

fn or_empty(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "(empty)"
    } else {
        trimmed
    }
}
