//! Subprocess runner and race coordinator for checkrace.
//!
//! Launches the one-shot checker and the daemon client side by side and
//! reports whichever finishes first with a result worth trusting.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use checkrace_runner::{CommandBackend, RaceCoordinator, Toolchain};
//!
//! async fn check() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = CommandBackend::new(Toolchain::new("mypy", "dmypy"));
//!     let coordinator = RaceCoordinator::new(Arc::new(backend), Duration::from_secs(1));
//!
//!     let outcome = coordinator.race(vec!["src".into()]).await?;
//!     println!("{} won with exit code {}", outcome.result.kind, outcome.result.exit_code);
//!     Ok(())
//! }
//! ```

mod backend;
mod coordinator;
mod error;
mod process;

pub use backend::{CheckerBackend, CommandBackend, Toolchain};
pub use coordinator::{RaceCoordinator, RaceOutcome, DEFAULT_GRACE_PERIOD};
pub use error::RunnerError;
pub use process::{run, CommandSpec};
