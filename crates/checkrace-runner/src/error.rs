//! Error types for running and racing checkers.

use checkrace_core::{CoreError, ProcessKind};
use thiserror::Error;

/// Errors that can occur while running or racing checker processes.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The checker executable could not be started.
    #[error("Failed to launch {kind} checker '{program}': {source}")]
    Launch {
        kind: ProcessKind,
        program: String,
        source: std::io::Error,
    },

    /// Reading output from or waiting on a running checker failed.
    #[error("I/O error while running checker: {0}")]
    Io(#[from] std::io::Error),

    /// A piped stream was not available on the spawned child.
    #[error("Failed to get {0} of child process")]
    MissingPipe(&'static str),

    /// The checker was cancelled before it finished.
    #[error("{0} checker was cancelled")]
    Cancelled(ProcessKind),

    /// A checker task panicked or was aborted.
    #[error("Checker task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    /// The race reached a state that cannot happen with two known tasks.
    #[error("Race is in an inconsistent state: {0}")]
    Inconsistent(String),

    /// Illegal race state transition.
    #[error(transparent)]
    State(#[from] CoreError),
}
