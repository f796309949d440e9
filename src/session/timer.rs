//! Cancellable one-shot timers for the orchestrator loop.
//!
//! The loop sleeps in `recv_timeout` until the earliest deadline; firing
//! and cancellation both happen on the loop thread, so a cancelled timer
//! can never deliver a stale callback. Scheduling a kind that is already
//! pending replaces its deadline, which is exactly the debounce-reset
//! behavior the stillness timer needs.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Stillness debounce: fires when the robot has held its pose near
    /// the destination long enough.
    Stillness,
    /// Backoff before reissuing an aborted turn.
    TurnRetry,
    /// Fixed delay after motion before a capture sequence starts.
    PostMotionSettle,
    /// Settle delay before each individual capture attempt.
    CaptureSettle,
    /// Hard deadline on one capture attempt.
    CaptureDeadline,
}

#[derive(Debug)]
pub struct TimerQueue {
    entries: Vec<(TimerKind, Instant)>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Schedule `kind` to fire after `delay`. Replaces a pending timer of
    /// the same kind.
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration, now: Instant) {
        self.cancel(kind);
        self.entries.push((kind, now + delay));
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.entries.retain(|(k, _)| *k != kind);
    }

    pub fn cancel_all(&mut self) {
        self.entries.clear();
    }

    pub fn is_scheduled(&self, kind: TimerKind) -> bool {
        self.entries.iter().any(|(k, _)| *k == kind)
    }

    /// Earliest pending deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|(_, at)| *at).min()
    }

    /// Remove and return the earliest timer that is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<TimerKind> {
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (_, at))| *at <= now)
            .min_by_key(|(_, (_, at))| *at)
            .map(|(i, _)| i)?;
        Some(self.entries.remove(index).0)
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_and_pop_due() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::Stillness, Duration::from_secs(3), now);

        assert!(queue.pop_due(now).is_none());
        assert_eq!(
            queue.pop_due(now + Duration::from_secs(3)),
            Some(TimerKind::Stillness)
        );
        assert!(queue.pop_due(now + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_reschedule_replaces_deadline() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::Stillness, Duration::from_secs(3), now);
        // Debounce reset: a second schedule pushes the deadline out.
        queue.schedule(
            TimerKind::Stillness,
            Duration::from_secs(3),
            now + Duration::from_secs(2),
        );

        assert!(queue.pop_due(now + Duration::from_secs(4)).is_none());
        assert_eq!(
            queue.pop_due(now + Duration::from_secs(5)),
            Some(TimerKind::Stillness)
        );
    }

    #[test]
    fn test_cancel_removes_pending() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::TurnRetry, Duration::from_secs(12), now);
        assert!(queue.is_scheduled(TimerKind::TurnRetry));

        queue.cancel(TimerKind::TurnRetry);
        assert!(!queue.is_scheduled(TimerKind::TurnRetry));
        assert!(queue.pop_due(now + Duration::from_secs(20)).is_none());
    }

    #[test]
    fn test_pop_due_returns_earliest_first() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();
        queue.schedule(TimerKind::CaptureDeadline, Duration::from_secs(10), now);
        queue.schedule(TimerKind::CaptureSettle, Duration::from_secs(5), now);

        let later = now + Duration::from_secs(10);
        assert_eq!(queue.pop_due(later), Some(TimerKind::CaptureSettle));
        assert_eq!(queue.pop_due(later), Some(TimerKind::CaptureDeadline));
    }

    #[test]
    fn test_next_deadline_is_minimum() {
        let now = Instant::now();
        let mut queue = TimerQueue::new();
        assert!(queue.next_deadline().is_none());

        queue.schedule(TimerKind::CaptureDeadline, Duration::from_secs(10), now);
        queue.schedule(TimerKind::CaptureSettle, Duration::from_secs(5), now);
        assert_eq!(queue.next_deadline(), Some(now + Duration::from_secs(5)));
    }
}
