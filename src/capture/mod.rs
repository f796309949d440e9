//! Per-stop capture sequencing.
//!
//! After the robot is confirmed stationary at a stop, the sequencer takes
//! the first photo, then alternates rotate and capture until the stop has
//! its full set of shots. Captures are unreliable on the platform (the
//! camera can be locked or mid-focus), so every shot is attempted up to
//! `MAX_CAPTURE_ATTEMPTS` times, each attempt with a settle delay and a
//! hard deadline.
//!
//! Like the movement coordinator this owns no thread; the orchestrator
//! feeds it timer fires and capture results.

use std::time::Instant;

use crate::model::{DetectionMode, PhotoRecord, WorldPosition};
use crate::ports::{CaptureError, CapturePort, ImageHandle};
use crate::session::timer::{TimerKind, TimerQueue};
use crate::session::timing::Timing;

/// Attempts per shot before the session gives up.
pub const MAX_CAPTURE_ATTEMPTS: u32 = 3;

/// Speed factor for in-place rotations between shots.
pub const TURN_SPEED: f32 = 0.7;

/// What the orchestrator should do after feeding the sequencer an event.
#[derive(Debug)]
pub enum CaptureStep {
    /// Nothing to do yet; a timer or capture result is pending.
    Pending,
    /// A photo was captured and more shots remain at this stop: rotate.
    PhotoTaken(PhotoRecord),
    /// A photo was captured and the stop is complete.
    StopComplete(PhotoRecord),
    /// All attempts for the current shot failed.
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShotState {
    Idle,
    /// Waiting out the post-motion delay before the first attempt.
    Settling,
    /// An attempt is running: settle timer, then the capture itself.
    Attempting { requested: bool },
    /// A rotation towards the next shot is in flight.
    Rotating,
}

#[derive(Debug)]
pub struct CaptureSequencer {
    session_id: String,
    detection_mode: DetectionMode,
    rotations_per_stop: usize,
    stop_index: usize,
    shots_taken: usize,
    attempts: u32,
    state: ShotState,
}

impl CaptureSequencer {
    pub fn new(session_id: &str, detection_mode: DetectionMode, rotations_per_stop: usize) -> Self {
        Self {
            session_id: session_id.to_string(),
            detection_mode,
            rotations_per_stop,
            stop_index: 0,
            shots_taken: 0,
            attempts: 0,
            state: ShotState::Idle,
        }
    }

    /// Degrees of the in-place rotation between shots.
    pub fn turn_degrees(&self) -> i32 {
        360 / self.rotations_per_stop as i32 - 1
    }

    pub fn shots_taken(&self) -> usize {
        self.shots_taken
    }

    /// The robot is stationary at `stop_index`: start the shot sequence.
    pub fn begin_stop(
        &mut self,
        stop_index: usize,
        timers: &mut TimerQueue,
        timing: &Timing,
        now: Instant,
    ) {
        tracing::info!(stop_index, "capture sequence started");
        self.stop_index = stop_index;
        self.shots_taken = 0;
        self.begin_shot(timers, timing, now);
    }

    /// A rotation finished: settle, then capture the next shot.
    pub fn on_rotation_complete(&mut self, timers: &mut TimerQueue, timing: &Timing, now: Instant) {
        if self.state == ShotState::Rotating {
            self.begin_shot(timers, timing, now);
        }
    }

    fn begin_shot(&mut self, timers: &mut TimerQueue, timing: &Timing, now: Instant) {
        self.attempts = 0;
        self.state = ShotState::Settling;
        timers.schedule(TimerKind::PostMotionSettle, timing.post_motion_settle, now);
    }

    fn begin_attempt(&mut self, timers: &mut TimerQueue, timing: &Timing, now: Instant) {
        self.attempts += 1;
        self.state = ShotState::Attempting { requested: false };
        // The deadline covers the settle delay plus the capture itself.
        timers.schedule(TimerKind::CaptureSettle, timing.capture_settle, now);
        timers.schedule(TimerKind::CaptureDeadline, timing.capture_deadline, now);
    }

    /// Drive the sequencer from a fired timer.
    pub fn on_timer(
        &mut self,
        kind: TimerKind,
        capture: &dyn CapturePort,
        timers: &mut TimerQueue,
        timing: &Timing,
        now: Instant,
    ) -> CaptureStep {
        match kind {
            TimerKind::PostMotionSettle => {
                if self.state == ShotState::Settling {
                    self.begin_attempt(timers, timing, now);
                }
                CaptureStep::Pending
            }
            TimerKind::CaptureSettle => {
                if self.state == (ShotState::Attempting { requested: false }) {
                    tracing::debug!(
                        stop_index = self.stop_index,
                        shot = self.shots_taken,
                        attempt = self.attempts,
                        "requesting capture"
                    );
                    self.state = ShotState::Attempting { requested: true };
                    capture.request_capture();
                }
                CaptureStep::Pending
            }
            TimerKind::CaptureDeadline => {
                if matches!(self.state, ShotState::Attempting { .. }) {
                    tracing::warn!(attempt = self.attempts, "capture attempt timed out");
                    timers.cancel(TimerKind::CaptureSettle);
                    self.retry_or_give_up(timers, timing, now)
                } else {
                    CaptureStep::Pending
                }
            }
            _ => CaptureStep::Pending,
        }
    }

    /// Handle the asynchronous capture result.
    ///
    /// A result arriving after its deadline already fired finds the
    /// sequencer outside the `Attempting` state and is dropped.
    pub fn on_capture_finished(
        &mut self,
        result: Result<ImageHandle, CaptureError>,
        pose: WorldPosition,
        timers: &mut TimerQueue,
        timing: &Timing,
        now: Instant,
    ) -> CaptureStep {
        if !matches!(self.state, ShotState::Attempting { requested: true }) {
            tracing::warn!("dropping capture result outside an attempt");
            return CaptureStep::Pending;
        }
        timers.cancel(TimerKind::CaptureDeadline);

        match result {
            Ok(image) => {
                let photo = PhotoRecord::new(
                    &self.session_id,
                    self.stop_index,
                    self.shots_taken,
                    pose,
                    self.detection_mode,
                    image,
                );
                tracing::info!(id = %photo.id, "photo captured");

                self.shots_taken += 1;
                if self.shots_taken >= self.rotations_per_stop {
                    self.state = ShotState::Idle;
                    CaptureStep::StopComplete(photo)
                } else {
                    self.state = ShotState::Rotating;
                    CaptureStep::PhotoTaken(photo)
                }
            }
            Err(err) => {
                tracing::warn!(attempt = self.attempts, error = %err, "capture failed");
                self.retry_or_give_up(timers, timing, now)
            }
        }
    }

    fn retry_or_give_up(
        &mut self,
        timers: &mut TimerQueue,
        timing: &Timing,
        now: Instant,
    ) -> CaptureStep {
        if self.attempts < MAX_CAPTURE_ATTEMPTS {
            self.begin_attempt(timers, timing, now);
            CaptureStep::Pending
        } else {
            self.state = ShotState::Idle;
            CaptureStep::Exhausted {
                attempts: self.attempts,
            }
        }
    }

    /// Abandon any in-flight shot. Used when a session starts or ends.
    pub fn reset(&mut self, timers: &mut TimerQueue) {
        self.state = ShotState::Idle;
        self.shots_taken = 0;
        self.attempts = 0;
        timers.cancel(TimerKind::PostMotionSettle);
        timers.cancel(TimerKind::CaptureSettle);
        timers.cancel(TimerKind::CaptureDeadline);
    }
}
