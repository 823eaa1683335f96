//! Core domain errors.

use thiserror::Error;

use crate::state::RaceState;

/// Core domain errors for checkrace.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid race state transition.
    #[error("Invalid race state transition: {from} -> {to}")]
    InvalidStateTransition { from: RaceState, to: RaceState },
}
