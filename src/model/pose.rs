//! Robot poses in map coordinates.

use serde::{Deserialize, Serialize};

/// A robot or photo pose in map meters/radians. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPosition {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

impl WorldPosition {
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    /// Componentwise closeness check on x, y and yaw.
    ///
    /// Pose data from the robot is never exact, so arrival at a destination
    /// is judged within a margin rather than by equality.
    pub fn is_near(&self, other: &WorldPosition, margin: f64) -> bool {
        (self.x - other.x).abs() < margin
            && (self.y - other.y).abs() < margin
            && (self.yaw - other.yaw).abs() < margin
    }
}
