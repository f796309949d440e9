//! External collaborator interfaces and the events they deliver.
//!
//! Navigation, capture and detection are supplied by the host platform.
//! Commands go out through the port traits; everything coming back is
//! funnelled into one `PortEvent` channel so the orchestrator can apply
//! state transitions in a single, serialized order.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DetectedObject, SessionConfig, WorldPosition};

/// Which movement command a status event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    Turn,
    Goto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementStatus {
    Aborted,
    Completed,
}

/// Handle to a captured image. The pixels themselves stay with the host;
/// the core only needs the location and dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageHandle {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl ImageHandle {
    pub fn new(path: impl AsRef<Path>, width: u32, height: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera busy")]
    Busy,
    #[error("capture failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectorError {
    #[error("failed to load image {}", .0.display())]
    ImageUnavailable(PathBuf),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Everything the orchestrator reacts to, in one ordered stream.
#[derive(Debug, Clone)]
pub enum PortEvent {
    /// The robot reported a new pose.
    PoseChanged(WorldPosition),
    /// A movement command finished or was aborted by the platform.
    Movement {
        kind: MovementKind,
        status: MovementStatus,
    },
    /// An earlier `request_capture` finished.
    CaptureFinished(Result<ImageHandle, CaptureError>),
    /// Host command: begin a session over the given recorded path.
    StartSession {
        config: SessionConfig,
        path_id: String,
        path: Vec<WorldPosition>,
    },
    /// Host command: stop the event loop.
    Shutdown,
}

/// Robot base movement.
pub trait NavigationPort: Send {
    fn go_to(&self, pose: WorldPosition);
    /// Turn in place by `degrees` at the given speed factor.
    fn turn_by(&self, degrees: i32, speed: f32);
}

/// Camera capture. The result arrives later as
/// `PortEvent::CaptureFinished`; the sequencer enforces its own deadline.
pub trait CapturePort: Send {
    fn request_capture(&self);
}

/// Object detection on a captured image.
pub trait DetectorPort: Send {
    fn detect(
        &self,
        image: &ImageHandle,
        target_class: u32,
    ) -> Result<Vec<DetectedObject>, DetectorError>;
}
