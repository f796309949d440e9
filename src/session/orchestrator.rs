//! The session orchestrator.
//!
//! All port events and host commands arrive on one channel and are
//! applied by `handle_event` on the loop thread, so every `Session`
//! mutation is serialized through a single writer. Delays (stillness
//! debounce, retry backoffs, capture deadlines) live in a `TimerQueue`
//! drained by the same thread, which makes cancellation race-free: a
//! cancelled timer can never fire into a newer session's state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::capture::{CaptureSequencer, CaptureStep, TURN_SPEED};
use crate::model::{Session, SessionConfig, SessionRecord, SessionStatus, WorldPosition};
use crate::movement::MovementCoordinator;
use crate::path::select_evenly;
use crate::ports::{
    CapturePort, DetectorPort, MovementKind, MovementStatus, NavigationPort, PortEvent,
};
use crate::triangulate::{MapInfo, TriangulationEngine};

use super::record::save_record;
use super::shared::SharedState;
use super::state::SessionPhase;
use super::timer::{TimerKind, TimerQueue};
use super::timing::Timing;
use super::SessionError;

/// Idle poll interval of the event loop when no timer is pending.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

pub struct Orchestrator<N, C, D> {
    nav: N,
    capture: C,
    detector: D,
    shared: Arc<SharedState>,
    map: MapInfo,
    timing: Timing,
    /// Directory session records are written to; `None` disables
    /// persistence (tests, dry runs).
    record_dir: Option<PathBuf>,

    timers: TimerQueue,
    coordinator: MovementCoordinator,
    sequencer: Option<CaptureSequencer>,
    phase: SessionPhase,
    session: Option<Session>,
    stop_index: usize,
}

impl<N, C, D> Orchestrator<N, C, D>
where
    N: NavigationPort,
    C: CapturePort,
    D: DetectorPort,
{
    pub fn new(
        nav: N,
        capture: C,
        detector: D,
        shared: Arc<SharedState>,
        map: MapInfo,
        timing: Timing,
        record_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            nav,
            capture,
            detector,
            shared,
            map,
            timing,
            record_dir,
            timers: TimerQueue::new(),
            coordinator: MovementCoordinator::new(),
            sequencer: None,
            phase: SessionPhase::Idle,
            session: None,
            stop_index: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Run the event loop until shutdown is requested or the channel
    /// disconnects.
    pub fn run(&mut self, events: &Receiver<PortEvent>) {
        tracing::info!("orchestrator loop started");

        loop {
            if self.shared.is_shutdown_requested() {
                break;
            }

            let now = Instant::now();
            self.fire_due_timers(now);

            let timeout = self
                .timers
                .next_deadline()
                .map(|at| at.saturating_duration_since(now).min(RECV_TIMEOUT))
                .unwrap_or(RECV_TIMEOUT);

            match events.recv_timeout(timeout) {
                Ok(PortEvent::Shutdown) => break,
                Ok(event) => self.handle_event(event, Instant::now()),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("event channel disconnected");
                    break;
                }
            }
        }

        tracing::info!("orchestrator loop exiting");
    }

    /// Apply one event. The single entry point for all state transitions.
    pub fn handle_event(&mut self, event: PortEvent, now: Instant) {
        match event {
            PortEvent::StartSession {
                config,
                path_id,
                path,
            } => self.start_session(&path_id, config, &path),
            PortEvent::PoseChanged(pose) => self.on_pose_changed(pose, now),
            PortEvent::Movement { kind, status } => self.on_movement_status(kind, status, now),
            PortEvent::CaptureFinished(result) => {
                self.on_capture_finished(result, now);
            }
            PortEvent::Shutdown => self.shared.request_shutdown(),
        }
    }

    /// Fire every timer due at `now`, in deadline order.
    pub fn fire_due_timers(&mut self, now: Instant) {
        while let Some(kind) = self.timers.pop_due(now) {
            self.handle_timer(kind, now);
        }
    }

    fn handle_timer(&mut self, kind: TimerKind, now: Instant) {
        match kind {
            TimerKind::Stillness => self.on_stillness(now),
            TimerKind::TurnRetry => self.coordinator.on_turn_retry_fired(&self.nav),
            TimerKind::PostMotionSettle | TimerKind::CaptureSettle | TimerKind::CaptureDeadline => {
                let Some(sequencer) = self.sequencer.as_mut() else {
                    return;
                };
                let step =
                    sequencer.on_timer(kind, &self.capture, &mut self.timers, &self.timing, now);
                self.apply_capture_step(step, now);
            }
        }
    }

    fn start_session(&mut self, path_id: &str, config: SessionConfig, path: &[WorldPosition]) {
        if self.shared.is_session_active() {
            tracing::warn!("session already in flight, ignoring start request");
            return;
        }
        if path.is_empty() {
            tracing::error!("cannot start a session on an empty path");
            return;
        }
        if config.stops == 0 || config.rotations_per_stop == 0 {
            tracing::error!(
                stops = config.stops,
                rotations = config.rotations_per_stop,
                "session needs at least one stop and one rotation"
            );
            return;
        }

        // Stale timers from a previous session must never leak into this
        // one.
        self.timers.cancel_all();
        self.coordinator.reset(&mut self.timers);

        let waypoints = select_evenly(path, config.stops);
        let session = Session::new(path_id, config, waypoints);
        tracing::info!(
            id = %session.id,
            stops = config.stops,
            rotations = config.rotations_per_stop,
            method = config.detection_mode.method_name(),
            target = config.target_class,
            "session started"
        );

        self.sequencer = Some(CaptureSequencer::new(
            &session.id,
            config.detection_mode,
            config.rotations_per_stop,
        ));
        self.stop_index = 0;
        self.shared.set_session_active(true);

        let first = session.waypoints[0];
        self.session = Some(session);
        self.phase = SessionPhase::MovingToStop;
        self.coordinator.begin_goto(first, &self.nav);
    }

    fn on_pose_changed(&mut self, pose: WorldPosition, now: Instant) {
        if let Some(session) = self.session.as_mut() {
            // The first pose seen during a session is where the robot
            // returns to at the end.
            if session.start_pose.is_none() {
                session.start_pose = Some(pose);
            }
        }

        // The coordinator only arms the stillness debounce while a
        // destination is outstanding, so this is safe in every phase.
        self.coordinator
            .on_pose(pose, &mut self.timers, &self.timing, now);

        if self.phase == SessionPhase::MovingToStop
            && self.timers.is_scheduled(TimerKind::Stillness)
        {
            self.phase = SessionPhase::AwaitingStationary;
        }
    }

    /// The robot has held its pose near the destination for the full
    /// debounce window: it is stationary.
    fn on_stillness(&mut self, now: Instant) {
        if !self.phase.is_travelling() {
            return;
        }
        self.coordinator.on_stillness_fired();
        tracing::info!(stop_index = self.stop_index, "movement stopped");

        self.phase = SessionPhase::Capturing;
        if let Some(sequencer) = self.sequencer.as_mut() {
            sequencer.begin_stop(self.stop_index, &mut self.timers, &self.timing, now);
        }
    }

    fn on_movement_status(&mut self, kind: MovementKind, status: MovementStatus, now: Instant) {
        tracing::debug!(?kind, ?status, "movement status changed");
        match (kind, status) {
            (MovementKind::Turn, MovementStatus::Aborted) => {
                // The platform occasionally aborts turns; retry with
                // backoff, give up quietly past the cap.
                self.coordinator.on_turn_aborted(&mut self.timers, &self.timing, now);
            }
            (MovementKind::Turn, MovementStatus::Completed) => {
                self.coordinator.on_turn_completed();
                if self.phase == SessionPhase::Rotating {
                    self.phase = SessionPhase::Capturing;
                    if let Some(sequencer) = self.sequencer.as_mut() {
                        sequencer.on_rotation_complete(&mut self.timers, &self.timing, now);
                    }
                }
            }
            (MovementKind::Goto, MovementStatus::Aborted) => {
                if self.shared.is_session_active() && !self.phase.is_terminal() {
                    self.fail_session(&SessionError::NavigationFailure(
                        "goto aborted by the platform".into(),
                    ));
                }
            }
            (MovementKind::Goto, MovementStatus::Completed) => {
                // Arrival is judged by the stillness debounce, not by the
                // platform's own completion event.
            }
        }
    }

    fn on_capture_finished(
        &mut self,
        result: Result<crate::ports::ImageHandle, crate::ports::CaptureError>,
        now: Instant,
    ) {
        if self.phase != SessionPhase::Capturing {
            tracing::warn!("capture result outside the capturing phase, dropped");
            return;
        }
        let Some(pose) = self.coordinator.last_pose() else {
            tracing::warn!("capture result with no known pose, dropped");
            return;
        };
        let Some(sequencer) = self.sequencer.as_mut() else {
            return;
        };

        let step =
            sequencer.on_capture_finished(result, pose, &mut self.timers, &self.timing, now);
        self.apply_capture_step(step, now);
    }

    fn apply_capture_step(&mut self, step: CaptureStep, now: Instant) {
        match step {
            CaptureStep::Pending => {}
            CaptureStep::PhotoTaken(photo) => {
                if let Some(session) = self.session.as_mut() {
                    session.photos.push(photo);
                }
                // More shots at this stop: rotate towards the next one.
                if let Some(sequencer) = self.sequencer.as_ref() {
                    let degrees = sequencer.turn_degrees();
                    self.phase = SessionPhase::Rotating;
                    self.coordinator.begin_turn(degrees, TURN_SPEED, &self.nav);
                }
            }
            CaptureStep::StopComplete(photo) => {
                if let Some(session) = self.session.as_mut() {
                    session.photos.push(photo);
                }
                self.advance_past_stop(now);
            }
            CaptureStep::Exhausted { attempts } => {
                self.fail_session(&SessionError::CaptureExhausted { attempts });
            }
        }
    }

    /// All shots at the current stop are done: move on or wrap up.
    fn advance_past_stop(&mut self, _now: Instant) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        let next = self.stop_index + 1;
        if next < session.waypoints.len() {
            tracing::info!(from = self.stop_index, to = next, "moving to next stop");
            self.stop_index = next;
            let waypoint = session.waypoints[next];
            self.phase = SessionPhase::MovingToStop;
            self.coordinator.begin_goto(waypoint, &self.nav);
        } else {
            tracing::info!("all stops visited, heading home");
            self.phase = SessionPhase::MovingHome;
            if let Some(home) = session.start_pose {
                self.coordinator.begin_goto(home, &self.nav);
            }
            // Analysis does not wait for the robot to arrive home.
            self.finish_session();
        }
    }

    /// Detect on every photo, triangulate, persist and complete.
    fn finish_session(&mut self) {
        self.phase = SessionPhase::Detecting;

        let Some(mut session) = self.session.take() else {
            return;
        };

        let target_class = session.config.target_class;
        for photo in &mut session.photos {
            let Some(image) = photo.image.clone() else {
                continue;
            };
            match self.detector.detect(&image, target_class) {
                Ok(mut detections) => {
                    for detection in &mut detections {
                        detection.locate_sector(image.width);
                    }
                    tracing::debug!(
                        id = %photo.id,
                        count = detections.len(),
                        "photo analysed"
                    );
                    photo.detections = detections;
                }
                Err(err) => {
                    // A failed photo simply contributes no detections.
                    tracing::warn!(id = %photo.id, error = %err, "detector failed on photo");
                }
            }
        }

        let engine = TriangulationEngine::new(self.map);
        let report = engine.estimate(&session.photos);
        session.estimated_target = report.chosen;
        session.status = SessionStatus::Complete;

        match &session.estimated_target {
            Some(target) => {
                tracing::info!(x = target.x, y = target.y, "target position estimated");
            }
            None => tracing::info!("no intersection found, session has no estimate"),
        }

        let record = SessionRecord::from_session(&session);
        if let Some(dir) = &self.record_dir {
            if let Err(err) = save_record(&record, dir) {
                tracing::error!(error = %err, "failed to persist session record");
            }
        }

        self.shared.publish_record(record);
        self.shared.set_session_active(false);
        // The homeward goto needs no arrival handling; stop tracking it so
        // pose noise near home cannot keep re-arming the stillness timer.
        self.coordinator.reset(&mut self.timers);
        self.session = Some(session);
        self.phase = SessionPhase::Complete;
        tracing::info!("session complete");
    }

    fn fail_session(&mut self, error: &SessionError) {
        tracing::error!(%error, "session failed");
        self.timers.cancel_all();
        self.coordinator.reset(&mut self.timers);
        if let Some(sequencer) = self.sequencer.as_mut() {
            sequencer.reset(&mut self.timers);
        }
        if let Some(session) = self.session.as_mut() {
            session.status = SessionStatus::Failed;
        }
        self.shared.set_session_active(false);
        self.phase = SessionPhase::Failed;
    }
}
