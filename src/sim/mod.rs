//! Simulated robot ports for the demo binary and integration runs.
//!
//! The simulator keeps one shared robot pose. Navigation interpolates
//! towards a destination, emitting noisy pose updates the way a real
//! base does; turns complete after a short delay; captures always
//! succeed and remember the pose they were taken at, so the detector can
//! answer from the scripted world instead of real pixels.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rand::Rng;

use crate::model::{BoundingBox, DetectedObject, WorldPosition};
use crate::ports::{
    CapturePort, DetectorError, DetectorPort, ImageHandle, MovementKind, MovementStatus,
    NavigationPort, PortEvent,
};

/// Horizontal span the five viewing sectors cover: the half-plane in
/// front of the camera, matching the +-2*pi/5 sector offsets used by
/// split-mode triangulation.
const CAMERA_FOV: f64 = PI;

const IMAGE_WIDTH: u32 = 4000;
const IMAGE_HEIGHT: u32 = 3000;

/// Interpolation steps per goto and the delay between pose updates.
const GOTO_STEPS: usize = 12;
const POSE_INTERVAL: Duration = Duration::from_millis(30);

/// Extra in-tolerance pose updates sent after arrival so the stillness
/// debounce can confirm the stop.
const SETTLED_UPDATES: usize = 8;

/// World state shared by all simulated ports.
pub struct SimWorld {
    pose: Mutex<WorldPosition>,
    /// Pose each captured image was taken at, keyed by image path.
    shots: Mutex<HashMap<PathBuf, WorldPosition>>,
    /// Ground-truth location of the object being searched for.
    pub target: (f64, f64),
    pub target_label: String,
}

impl SimWorld {
    pub fn new(start: WorldPosition, target: (f64, f64), target_label: &str) -> Arc<Self> {
        Arc::new(Self {
            pose: Mutex::new(start),
            shots: Mutex::new(HashMap::new()),
            target,
            target_label: target_label.to_string(),
        })
    }

    pub fn pose(&self) -> WorldPosition {
        *self.pose.lock()
    }
}

pub struct SimNavigation {
    world: Arc<SimWorld>,
    events: Sender<PortEvent>,
}

impl SimNavigation {
    pub fn new(world: Arc<SimWorld>, events: Sender<PortEvent>) -> Self {
        Self { world, events }
    }
}

impl NavigationPort for SimNavigation {
    fn go_to(&self, dest: WorldPosition) {
        let world = self.world.clone();
        let events = self.events.clone();

        thread::spawn(move || {
            let mut rng = rand::thread_rng();
            let start = world.pose();

            for step in 1..=GOTO_STEPS {
                let t = step as f64 / GOTO_STEPS as f64;
                let pose = WorldPosition::new(
                    start.x + (dest.x - start.x) * t + rng.gen_range(-0.02..0.02),
                    start.y + (dest.y - start.y) * t + rng.gen_range(-0.02..0.02),
                    start.yaw + (dest.yaw - start.yaw) * t,
                );
                *world.pose.lock() = pose;
                if events.send(PortEvent::PoseChanged(pose)).is_err() {
                    return;
                }
                thread::sleep(POSE_INTERVAL);
            }

            *world.pose.lock() = dest;
            let _ = events.send(PortEvent::Movement {
                kind: MovementKind::Goto,
                status: MovementStatus::Completed,
            });

            // Hold the pose so the stillness debounce can fire.
            for _ in 0..SETTLED_UPDATES {
                let pose = world.pose();
                if events.send(PortEvent::PoseChanged(pose)).is_err() {
                    return;
                }
                thread::sleep(POSE_INTERVAL);
            }
        });
    }

    fn turn_by(&self, degrees: i32, _speed: f32) {
        let world = self.world.clone();
        let events = self.events.clone();

        thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            {
                let mut pose = world.pose.lock();
                pose.yaw += f64::from(degrees).to_radians();
            }
            let pose = world.pose();
            let _ = events.send(PortEvent::PoseChanged(pose));
            let _ = events.send(PortEvent::Movement {
                kind: MovementKind::Turn,
                status: MovementStatus::Completed,
            });
        });
    }
}

pub struct SimCamera {
    world: Arc<SimWorld>,
    events: Sender<PortEvent>,
    counter: Mutex<u32>,
}

impl SimCamera {
    pub fn new(world: Arc<SimWorld>, events: Sender<PortEvent>) -> Self {
        Self {
            world,
            events,
            counter: Mutex::new(0),
        }
    }
}

impl CapturePort for SimCamera {
    fn request_capture(&self) {
        let index = {
            let mut counter = self.counter.lock();
            *counter += 1;
            *counter
        };
        let path = PathBuf::from(format!("sim://shot-{index}.jpg"));
        let pose = self.world.pose();
        self.world.shots.lock().insert(path.clone(), pose);

        let events = self.events.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            let _ = events.send(PortEvent::CaptureFinished(Ok(ImageHandle::new(
                path,
                IMAGE_WIDTH,
                IMAGE_HEIGHT,
            ))));
        });
    }
}

pub struct SimDetector {
    world: Arc<SimWorld>,
}

impl SimDetector {
    pub fn new(world: Arc<SimWorld>) -> Self {
        Self { world }
    }
}

impl DetectorPort for SimDetector {
    /// Report the scripted target when it falls inside the camera's
    /// field of view for the pose the image was captured at.
    fn detect(
        &self,
        image: &ImageHandle,
        _target_class: u32,
    ) -> Result<Vec<DetectedObject>, DetectorError> {
        let pose = self
            .world
            .shots
            .lock()
            .get(&image.path)
            .copied()
            .ok_or_else(|| DetectorError::ImageUnavailable(image.path.clone()))?;

        let (tx, ty) = self.world.target;
        let bearing = (ty - pose.y).atan2(tx - pose.x);
        let mut relative = bearing - pose.yaw;
        while relative > PI {
            relative -= 2.0 * PI;
        }
        while relative < -PI {
            relative += 2.0 * PI;
        }

        if relative.abs() >= CAMERA_FOV / 2.0 {
            return Ok(Vec::new());
        }

        // Positive relative bearing is to the robot's left, which is the
        // low-x side of the image.
        let fraction = 0.5 - relative / CAMERA_FOV;
        let center = (fraction * f64::from(image.width)) as i32;
        let half_width = 200;

        Ok(vec![DetectedObject::new(
            self.world.target_label.clone(),
            0.9,
            BoundingBox {
                left: center - half_width,
                top: 1000,
                right: center + half_width,
                bottom: 2200,
            },
        )])
    }
}
