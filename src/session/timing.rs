//! Delay constants for the session state machine.

use std::time::Duration;

/// All orchestrator delays in one place. `default()` carries the
/// production constants; the simulator scales them down so a demo run
/// finishes in seconds.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Debounce window confirming the robot has physically stopped.
    pub stillness_window: Duration,
    /// Backoff before retrying an aborted turn.
    pub turn_retry_delay: Duration,
    /// Delay after motion before the capture sequence continues.
    pub post_motion_settle: Duration,
    /// Settle delay before each capture attempt, letting the platform
    /// stabilize and the camera focus.
    pub capture_settle: Duration,
    /// Hard deadline on a single capture attempt, including its settle.
    pub capture_deadline: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            stillness_window: Duration::from_secs(3),
            turn_retry_delay: Duration::from_secs(12),
            post_motion_settle: Duration::from_secs(3),
            capture_settle: Duration::from_secs(5),
            capture_deadline: Duration::from_secs(10),
        }
    }
}

impl Timing {
    /// Short delays for simulated runs and tests.
    pub fn fast() -> Self {
        Self {
            stillness_window: Duration::from_millis(200),
            turn_retry_delay: Duration::from_millis(300),
            post_motion_settle: Duration::from_millis(50),
            capture_settle: Duration::from_millis(50),
            capture_deadline: Duration::from_millis(500),
        }
    }
}
