//! Photos and object detections.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::pose::WorldPosition;
use crate::ports::ImageHandle;

/// One of five fixed horizontal viewing zones of a photo.
///
/// Split-mode triangulation uses the sector to pick an angular offset for
/// a detection's line of sight. The sector is derived from the detector's
/// bounding box, never detected directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Sector {
    Left,
    LeftMiddle,
    Middle,
    RightMiddle,
    Right,
}

impl Sector {
    /// Classify a detection by its horizontal center against thresholds at
    /// 1/5, 2/5, 3/5 and 4/5 of the image width (strict comparisons).
    pub fn classify(image_width: u32, left: i32, width: i32) -> Sector {
        let center = left + width / 2;
        let w = image_width as i32;

        if center < w / 5 {
            Sector::Left
        } else if center < 2 * w / 5 {
            Sector::LeftMiddle
        } else if center < 3 * w / 5 {
            Sector::Middle
        } else if center < 4 * w / 5 {
            Sector::RightMiddle
        } else {
            Sector::Right
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Angular offset added to the base sight-line angle in split mode.
    pub fn angle_offset(self) -> f64 {
        match self {
            Sector::Left => -(PI / 5.0 * 2.0),
            Sector::LeftMiddle => -(PI / 5.0),
            Sector::Middle => 0.0,
            Sector::RightMiddle => PI / 5.0,
            Sector::Right => PI / 5.0 * 2.0,
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sector::Left => "left",
            Sector::LeftMiddle => "left-middle",
            Sector::Middle => "middle",
            Sector::RightMiddle => "right-middle",
            Sector::Right => "right",
        };
        write!(f, "{name}")
    }
}

impl From<Sector> for u8 {
    fn from(sector: Sector) -> u8 {
        sector as u8
    }
}

impl TryFrom<u8> for Sector {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Sector::Left),
            1 => Ok(Sector::LeftMiddle),
            2 => Ok(Sector::Middle),
            3 => Ok(Sector::RightMiddle),
            4 => Ok(Sector::Right),
            other => Err(format!("invalid sector index {other}")),
        }
    }
}

/// How photos are taken and triangulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DetectionMode {
    /// Narrow centered crop; every detection casts a single forward ray.
    Crop,
    /// Full frame split into five sectors, each with its own ray offset.
    Split,
}

impl DetectionMode {
    pub fn method_id(self) -> u8 {
        self as u8
    }

    pub fn method_name(self) -> &'static str {
        match self {
            DetectionMode::Crop => "crop",
            DetectionMode::Split => "split",
        }
    }
}

impl From<DetectionMode> for u8 {
    fn from(mode: DetectionMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for DetectionMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DetectionMode::Crop),
            1 => Ok(DetectionMode::Split),
            other => Err(format!("invalid detection mode {other}")),
        }
    }
}

/// Pixel-space bounding box of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl BoundingBox {
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// A single object detection within a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f32,
    #[serde(flatten)]
    pub bounds: BoundingBox,
    /// Derived after detection from the bounding box and image width.
    pub sector: Sector,
}

impl DetectedObject {
    pub fn new(label: impl Into<String>, confidence: f32, bounds: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounds,
            sector: Sector::Left,
        }
    }

    /// Set the sector from the photo's width. Called once per detection
    /// after the detector runs.
    pub fn locate_sector(&mut self, image_width: u32) {
        self.sector = Sector::classify(image_width, self.bounds.left, self.bounds.width());
    }
}

/// A photo captured during a survey session.
///
/// Created when a capture succeeds; `detections` is attached exactly once
/// by the detecting phase, the rest is immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: String,
    pub session_id: String,
    pub stop_index: usize,
    pub shot_index: usize,
    pub pose: WorldPosition,
    pub detection_mode: DetectionMode,
    pub image: Option<ImageHandle>,
    pub detections: Vec<DetectedObject>,
}

impl PhotoRecord {
    pub fn new(
        session_id: &str,
        stop_index: usize,
        shot_index: usize,
        pose: WorldPosition,
        detection_mode: DetectionMode,
        image: ImageHandle,
    ) -> Self {
        Self {
            id: format!("{session_id}-{stop_index}-{shot_index}"),
            session_id: session_id.to_string(),
            stop_index,
            shot_index,
            pose,
            detection_mode,
            image: Some(image),
            detections: Vec::new(),
        }
    }
}
