//! Survey sessions and the persisted session record.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::photo::{DetectionMode, PhotoRecord};
use super::pose::WorldPosition;

/// Parameters of a survey session, fixed at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Number of stops sampled from the recorded path.
    pub stops: usize,
    /// Photos taken at each stop while rotating in place.
    pub rotations_per_stop: usize,
    pub detection_mode: DetectionMode,
    /// Detector class id of the object being searched for.
    pub target_class: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    InProgress,
    Complete,
    Failed,
}

/// A single survey run. Mutated by the orchestrator only; terminal once
/// the status is `Complete` or `Failed`.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub config: SessionConfig,
    /// Pose the robot returns to when the last stop is done. Recorded from
    /// the first pose update observed after the session starts.
    pub start_pose: Option<WorldPosition>,
    pub waypoints: Vec<WorldPosition>,
    pub photos: Vec<PhotoRecord>,
    pub status: SessionStatus,
    pub estimated_target: Option<WorldPosition>,
}

impl Session {
    /// Create a session with a time-based unique id derived from the
    /// creation timestamp and the path it samples.
    pub fn new(path_id: &str, config: SessionConfig, waypoints: Vec<WorldPosition>) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);

        Self {
            id: format!("{millis}-{path_id}"),
            config,
            start_pose: None,
            waypoints,
            photos: Vec::new(),
            status: SessionStatus::InProgress,
            estimated_target: None,
        }
    }
}

/// The persisted form of a finished session.
///
/// Field names match the JSON documents written by earlier builds so old
/// records stay loadable for offline re-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub target_object: u32,
    pub stops: usize,
    pub rotations: usize,
    pub method_id: u8,
    pub method_name: String,
    /// Evaluation-only field, always 0 when written by the orchestrator.
    pub object_location: u32,
    pub estimated_target: Option<WorldPosition>,
    pub photos_taken: Vec<PhotoRecord>,
}

impl SessionRecord {
    pub fn from_session(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            target_object: session.config.target_class,
            stops: session.config.stops,
            rotations: session.config.rotations_per_stop,
            method_id: session.config.detection_mode.method_id(),
            method_name: session.config.detection_mode.method_name().to_string(),
            object_location: 0,
            estimated_target: session.estimated_target,
            photos_taken: session.photos.clone(),
        }
    }
}
