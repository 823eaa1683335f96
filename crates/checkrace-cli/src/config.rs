//! checkrace configuration.

use std::path::PathBuf;
use std::time::Duration;

use checkrace_runner::{Toolchain, DEFAULT_GRACE_PERIOD};
use tracing::warn;

/// Overrides the one-shot checker executable.
pub const ONESHOT_ENV: &str = "CHECKRACE_ONESHOT";
/// Overrides the daemon checker executable.
pub const DAEMON_ENV: &str = "CHECKRACE_DAEMON";
/// Overrides the grace period, in milliseconds.
pub const GRACE_ENV: &str = "CHECKRACE_GRACE_MS";
/// Log filter used when `RUST_LOG` is not set.
pub const LOG_ENV: &str = "CHECKRACE_LOG";

/// Log filter used when neither `RUST_LOG` nor `CHECKRACE_LOG` is set.
pub const DEFAULT_LOG_DIRECTIVE: &str = "warn";

const ONESHOT_NAME: &str = "mypy";
const DAEMON_NAME: &str = "dmypy";

/// checkrace configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// One-shot checker executable.
    pub oneshot_path: PathBuf,

    /// Daemon checker executable.
    pub daemon_path: PathBuf,

    /// How long to wait for the daemon after the one-shot checker wins.
    pub grace_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oneshot_path: sibling_executable(ONESHOT_NAME),
            daemon_path: sibling_executable(DAEMON_NAME),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

impl Config {
    /// Defaults, overridden by the `CHECKRACE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup(ONESHOT_ENV).filter(|v| !v.is_empty()) {
            config.oneshot_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(DAEMON_ENV).filter(|v| !v.is_empty()) {
            config.daemon_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(GRACE_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.grace_period = Duration::from_millis(ms),
                Err(e) => warn!(
                    value = %raw,
                    error = %e,
                    "Ignoring invalid {}, keeping {:?}", GRACE_ENV, config.grace_period
                ),
            }
        }

        config
    }

    /// The checker executables as the runner wants them.
    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new(&self.oneshot_path, &self.daemon_path)
    }
}

/// `name` in the directory of the running executable if it exists there,
/// otherwise the bare name for a `PATH` lookup.
fn sibling_executable(name: &str) -> PathBuf {
    let file_name = format!("{name}{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
        .filter(|path| path.is_file())
        .unwrap_or_else(|| PathBuf::from(file_name))
}
