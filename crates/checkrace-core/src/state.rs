//! Race state machine.

use std::fmt;

use crate::error::CoreError;

/// Where a race between the two checker variants stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RaceState {
    /// Both checkers launched, nothing decided yet.
    #[default]
    Running,
    /// The daemon finished first with a trustworthy result.
    DaemonWon,
    /// The one-shot result is reported.
    PrimaryWon,
    /// The race was abandoned before a result was chosen.
    Aborted,
}

impl RaceState {
    /// Returns true if the race has been decided or abandoned.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::DaemonWon | Self::PrimaryWon | Self::Aborted)
    }

    /// Move to `next`. A race is decided exactly once.
    pub fn transition(self, next: RaceState) -> Result<RaceState, CoreError> {
        match (self, next) {
            (Self::Running, Self::DaemonWon | Self::PrimaryWon | Self::Aborted) => Ok(next),
            (from, to) => Err(CoreError::InvalidStateTransition { from, to }),
        }
    }
}

impl fmt::Display for RaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Running => "RUNNING",
            Self::DaemonWon => "DAEMON_WON",
            Self::PrimaryWon => "PRIMARY_WON",
            Self::Aborted => "ABORTED",
        };
        f.write_str(name)
    }
}
