//! Core data model: poses, photos, detections, and sessions.

pub mod photo;
pub mod pose;
pub mod session;

pub use photo::{BoundingBox, DetectedObject, DetectionMode, PhotoRecord, Sector};
pub use pose::WorldPosition;
pub use session::{Session, SessionConfig, SessionRecord, SessionStatus};
