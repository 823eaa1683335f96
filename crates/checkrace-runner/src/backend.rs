//! The seam between the race coordinator and the checker processes.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use checkrace_core::{ProcessKind, ProcessResult};
use tokio_util::sync::CancellationToken;

use crate::error::RunnerError;
use crate::process::{self, CommandSpec};

/// Runs one checker invocation on behalf of the coordinator.
///
/// Implementations must stop promptly once `cancel` fires and must not
/// leave a live process behind when they do.
#[async_trait]
pub trait CheckerBackend: Send + Sync + 'static {
    /// Run the checker of the given kind over `args` to completion.
    async fn run(
        &self,
        kind: ProcessKind,
        args: Arc<[OsString]>,
        cancel: CancellationToken,
    ) -> Result<ProcessResult, RunnerError>;
}

/// Locations of the two checker executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// One-shot checker, invoked as `oneshot <args..>`.
    pub oneshot: PathBuf,

    /// Daemon client, invoked as `daemon run -- <args..>` and `daemon kill`.
    pub daemon: PathBuf,
}

impl Toolchain {
    pub fn new(oneshot: impl Into<PathBuf>, daemon: impl Into<PathBuf>) -> Self {
        Self {
            oneshot: oneshot.into(),
            daemon: daemon.into(),
        }
    }

    /// Build the command line for a checker invocation.
    pub fn command(&self, kind: ProcessKind, args: &[OsString]) -> CommandSpec {
        match kind {
            ProcessKind::OneShot => CommandSpec::new(&self.oneshot, args.to_vec()),
            ProcessKind::Daemon => {
                let mut full = Vec::with_capacity(args.len() + 2);
                full.push(OsString::from("run"));
                full.push(OsString::from("--"));
                full.extend_from_slice(args);
                CommandSpec::new(&self.daemon, full)
            }
            ProcessKind::Kill => CommandSpec::new(&self.daemon, vec![OsString::from("kill")]),
        }
    }
}

/// Backend that launches the real checker executables.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    toolchain: Toolchain,
}

impl CommandBackend {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }
}

#[async_trait]
impl CheckerBackend for CommandBackend {
    async fn run(
        &self,
        kind: ProcessKind,
        args: Arc<[OsString]>,
        cancel: CancellationToken,
    ) -> Result<ProcessResult, RunnerError> {
        let spec = self.toolchain.command(kind, &args);
        process::run(kind, &spec, cancel).await
    }
}
