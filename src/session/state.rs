//! Session state machine phases.

/// Phase of the session orchestrator.
///
/// `Failed` is absorbing and reachable from any phase on unrecoverable
/// navigation or capture failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No session in flight.
    Idle,
    /// A goto towards the next stop was issued.
    MovingToStop,
    /// The robot is near the stop; waiting for the stillness debounce.
    AwaitingStationary,
    /// Turning in place towards the next shot.
    Rotating,
    /// Capturing photos at the current stop.
    Capturing,
    /// All stops done; returning to the session's start pose.
    MovingHome,
    /// Running the detector and the triangulation engine.
    Detecting,
    Complete,
    Failed,
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl SessionPhase {
    /// Phases during which pose updates feed the stillness debounce.
    pub fn is_travelling(self) -> bool {
        matches!(self, Self::MovingToStop | Self::AwaitingStationary)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}
