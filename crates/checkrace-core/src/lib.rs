//! checkrace Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Subprocesses
//! - The async runtime
//! - Logging
//!
//! Everything the race coordinator decides on lives here, so the decision
//! rules can be tested without launching a single checker.

pub mod classify;
pub mod error;
pub mod process;
pub mod state;

// Re-export commonly used types
pub use classify::is_trustworthy;
pub use error::CoreError;
pub use process::{ProcessKind, ProcessResult};
pub use state::RaceState;
