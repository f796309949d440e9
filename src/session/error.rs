//! Typed session errors.

use thiserror::Error;

use crate::ports::DetectorError;

/// Errors that can end a session. Only `NavigationFailure` and
/// `CaptureExhausted` are fatal; detector problems degrade to photos with
/// zero detections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("navigation failed: {0}")]
    NavigationFailure(String),
    #[error("capture failed after {attempts} attempts")]
    CaptureExhausted { attempts: u32 },
    #[error(transparent)]
    Detector(#[from] DetectorError),
}

/// Errors while persisting or loading a session record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
