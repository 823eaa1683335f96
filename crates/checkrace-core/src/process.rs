//! Captured output of a single checker process.

use std::fmt;

/// Which checker invocation produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessKind {
    /// Fresh checker process for this run only.
    OneShot,
    /// Client command talking to the persistent daemon.
    Daemon,
    /// Daemon reset command.
    Kill,
}

impl fmt::Display for ProcessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OneShot => "one-shot",
            Self::Daemon => "daemon",
            Self::Kill => "kill",
        };
        f.write_str(name)
    }
}

/// Everything a finished checker process left behind.
///
/// Built once by the task that ran the process and handed to the
/// coordinator by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// Which invocation this came from.
    pub kind: ProcessKind,

    /// Full standard output, lossily decoded.
    pub stdout: String,

    /// Full standard error, lossily decoded.
    pub stderr: String,

    /// Exit code of the process.
    pub exit_code: i32,
}

impl ProcessResult {
    pub fn new(
        kind: ProcessKind,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            kind,
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }
}
