//! Robot movement tracking: stillness detection and turn retry.
//!
//! The coordinator owns no thread. It is driven by the orchestrator's
//! event loop: pose updates arm or reset the stillness debounce timer,
//! movement status events feed the turn-retry logic, and every command
//! goes out through the `NavigationPort`.

use std::time::Instant;

use crate::model::WorldPosition;
use crate::ports::NavigationPort;
use crate::session::timer::{TimerKind, TimerQueue};
use crate::session::timing::Timing;

/// Componentwise pose tolerance for considering the robot "at" its
/// destination.
pub const STILLNESS_MARGIN: f64 = 0.2;

/// An aborted turn is reissued at most this many times.
pub const MAX_TURN_ATTEMPTS: u32 = 3;

#[derive(Debug)]
pub struct MovementCoordinator {
    last_pose: Option<WorldPosition>,
    destination: Option<WorldPosition>,
    /// Last issued turn command, kept for retries.
    pending_turn: Option<(i32, f32)>,
    turn_attempts: u32,
}

impl MovementCoordinator {
    pub fn new() -> Self {
        Self {
            last_pose: None,
            destination: None,
            pending_turn: None,
            turn_attempts: 0,
        }
    }

    pub fn last_pose(&self) -> Option<WorldPosition> {
        self.last_pose
    }

    pub fn destination(&self) -> Option<WorldPosition> {
        self.destination
    }

    /// Send the robot towards `dest` and start watching for arrival.
    pub fn begin_goto(&mut self, dest: WorldPosition, nav: &dyn NavigationPort) {
        tracing::info!(x = dest.x, y = dest.y, "goto issued");
        self.destination = Some(dest);
        nav.go_to(dest);
    }

    /// Issue a turn command, resetting the retry counter.
    pub fn begin_turn(&mut self, degrees: i32, speed: f32, nav: &dyn NavigationPort) {
        tracing::debug!(degrees, "turn issued");
        self.pending_turn = Some((degrees, speed));
        self.turn_attempts = 0;
        nav.turn_by(degrees, speed);
    }

    /// Track a pose update while travelling.
    ///
    /// Inside the arrival tolerance the stillness timer is (re)armed;
    /// any update outside the tolerance cancels it, so only a pose held
    /// for the full debounce window counts as stopped.
    pub fn on_pose(
        &mut self,
        pose: WorldPosition,
        timers: &mut TimerQueue,
        timing: &Timing,
        now: Instant,
    ) {
        self.last_pose = Some(pose);

        if let Some(dest) = self.destination {
            if dest.is_near(&pose, STILLNESS_MARGIN) {
                timers.schedule(TimerKind::Stillness, timing.stillness_window, now);
            } else {
                timers.cancel(TimerKind::Stillness);
            }
        }
    }

    /// The stillness timer fired: the robot has arrived. Clears the
    /// destination so later pose noise cannot re-trigger arrival.
    pub fn on_stillness_fired(&mut self) {
        self.destination = None;
    }

    /// Handle an aborted turn. Returns true when a retry was scheduled,
    /// false when the attempt cap is exhausted.
    pub fn on_turn_aborted(
        &mut self,
        timers: &mut TimerQueue,
        timing: &Timing,
        now: Instant,
    ) -> bool {
        self.turn_attempts += 1;
        if self.turn_attempts <= MAX_TURN_ATTEMPTS && self.pending_turn.is_some() {
            tracing::warn!(attempt = self.turn_attempts, "turn aborted, retrying");
            timers.schedule(TimerKind::TurnRetry, timing.turn_retry_delay, now);
            true
        } else {
            tracing::error!("turn aborted and retry attempts exhausted");
            self.turn_attempts = 0;
            false
        }
    }

    /// The retry backoff elapsed: reissue the pending turn.
    pub fn on_turn_retry_fired(&mut self, nav: &dyn NavigationPort) {
        if let Some((degrees, speed)) = self.pending_turn {
            tracing::info!(degrees, attempt = self.turn_attempts, "reissuing turn");
            nav.turn_by(degrees, speed);
        }
    }

    pub fn on_turn_completed(&mut self) {
        self.pending_turn = None;
        self.turn_attempts = 0;
    }

    /// Forget all in-flight movement. Used when a session starts or ends.
    pub fn reset(&mut self, timers: &mut TimerQueue) {
        self.destination = None;
        self.pending_turn = None;
        self.turn_attempts = 0;
        timers.cancel(TimerKind::Stillness);
        timers.cancel(TimerKind::TurnRetry);
    }
}

impl Default for MovementCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingNav {
        gotos: Mutex<Vec<WorldPosition>>,
        turns: Mutex<Vec<(i32, f32)>>,
    }

    impl NavigationPort for RecordingNav {
        fn go_to(&self, pose: WorldPosition) {
            self.gotos.lock().push(pose);
        }

        fn turn_by(&self, degrees: i32, speed: f32) {
            self.turns.lock().push((degrees, speed));
        }
    }

    fn setup() -> (MovementCoordinator, TimerQueue, Timing, Instant) {
        (
            MovementCoordinator::new(),
            TimerQueue::new(),
            Timing::default(),
            Instant::now(),
        )
    }

    #[test]
    fn test_pose_near_destination_arms_stillness() {
        let (mut coord, mut timers, timing, now) = setup();
        let nav = RecordingNav::default();
        coord.begin_goto(WorldPosition::new(5.0, 5.0, 1.0), &nav);

        coord.on_pose(WorldPosition::new(5.1, 4.9, 1.1), &mut timers, &timing, now);
        assert!(timers.is_scheduled(TimerKind::Stillness));
        assert_eq!(nav.gotos.lock().len(), 1);
    }

    #[test]
    fn test_out_of_tolerance_pose_resets_debounce() {
        let (mut coord, mut timers, timing, now) = setup();
        let nav = RecordingNav::default();
        coord.begin_goto(WorldPosition::new(5.0, 5.0, 1.0), &nav);

        coord.on_pose(WorldPosition::new(5.1, 4.9, 1.1), &mut timers, &timing, now);
        // The robot drifted away again: pending timer must die.
        coord.on_pose(
            WorldPosition::new(4.0, 5.0, 1.0),
            &mut timers,
            &timing,
            now + Duration::from_secs(1),
        );
        assert!(!timers.is_scheduled(TimerKind::Stillness));
    }

    #[test]
    fn test_in_tolerance_updates_push_deadline_out() {
        let (mut coord, mut timers, timing, now) = setup();
        let nav = RecordingNav::default();
        coord.begin_goto(WorldPosition::new(5.0, 5.0, 1.0), &nav);

        coord.on_pose(WorldPosition::new(5.0, 5.0, 1.0), &mut timers, &timing, now);
        coord.on_pose(
            WorldPosition::new(5.05, 5.0, 1.0),
            &mut timers,
            &timing,
            now + Duration::from_secs(2),
        );

        // Not due at the original deadline, due at the rescheduled one.
        assert!(timers.pop_due(now + Duration::from_secs(3)).is_none());
        assert_eq!(
            timers.pop_due(now + Duration::from_secs(5)),
            Some(TimerKind::Stillness)
        );
    }

    #[test]
    fn test_no_stillness_without_destination() {
        let (mut coord, mut timers, timing, now) = setup();
        coord.on_pose(WorldPosition::new(5.0, 5.0, 1.0), &mut timers, &timing, now);
        assert!(!timers.is_scheduled(TimerKind::Stillness));
    }

    #[test]
    fn test_turn_retry_cap() {
        let (mut coord, mut timers, timing, now) = setup();
        let nav = RecordingNav::default();
        coord.begin_turn(44, 0.7, &nav);

        for _ in 0..MAX_TURN_ATTEMPTS {
            assert!(coord.on_turn_aborted(&mut timers, &timing, now));
            coord.on_turn_retry_fired(&nav);
        }
        // Fourth abort exceeds the cap.
        assert!(!coord.on_turn_aborted(&mut timers, &timing, now));

        // Initial turn plus three retries.
        assert_eq!(nav.turns.lock().len(), 4);
        assert_eq!(nav.turns.lock()[0], (44, 0.7));
    }

    #[test]
    fn test_turn_completed_clears_pending() {
        let (mut coord, mut timers, timing, now) = setup();
        let nav = RecordingNav::default();
        coord.begin_turn(44, 0.7, &nav);
        coord.on_turn_completed();

        // Abort after completion has nothing to retry.
        assert!(!coord.on_turn_aborted(&mut timers, &timing, now));
        coord.on_turn_retry_fired(&nav);
        assert_eq!(nav.turns.lock().len(), 1);
    }

    #[test]
    fn test_reset_cancels_movement_timers() {
        let (mut coord, mut timers, timing, now) = setup();
        let nav = RecordingNav::default();
        coord.begin_goto(WorldPosition::new(5.0, 5.0, 1.0), &nav);
        coord.on_pose(WorldPosition::new(5.0, 5.0, 1.0), &mut timers, &timing, now);

        coord.reset(&mut timers);
        assert!(!timers.is_scheduled(TimerKind::Stillness));
        assert!(coord.destination().is_none());
    }
}
