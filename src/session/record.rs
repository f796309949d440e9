//! JSON persistence for finished sessions.

use std::fs;
use std::path::{Path, PathBuf};

use crate::model::SessionRecord;

use super::error::RecordError;

/// Write a session record as `{sessionId}-photo-data.json` under `dir`.
pub fn save_record(record: &SessionRecord, dir: &Path) -> Result<PathBuf, RecordError> {
    let path = dir.join(format!("{}-photo-data.json", record.session_id));
    let json = serde_json::to_string_pretty(record)?;
    fs::write(&path, json)?;
    tracing::info!(path = %path.display(), "session record saved");
    Ok(path)
}

/// Load a previously saved record for offline re-analysis.
pub fn load_record(path: &Path) -> Result<SessionRecord, RecordError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BoundingBox, DetectedObject, DetectionMode, PhotoRecord, Sector, WorldPosition,
    };
    use crate::ports::ImageHandle;

    fn sample_record() -> SessionRecord {
        let mut photo = PhotoRecord::new(
            "1718887490020-path_1",
            0,
            0,
            WorldPosition::new(1.5, -2.0, 0.7),
            DetectionMode::Split,
            ImageHandle::new("1718887490020-path_1-0-0.jpg", 4000, 3000),
        );
        let mut obj = DetectedObject::new(
            "chair",
            0.87,
            BoundingBox {
                left: 100,
                top: 50,
                right: 400,
                bottom: 700,
            },
        );
        obj.locate_sector(4000);
        photo.detections.push(obj);

        SessionRecord {
            session_id: "1718887490020-path_1".into(),
            target_object: 56,
            stops: 3,
            rotations: 8,
            method_id: 1,
            method_name: "split".into(),
            object_location: 0,
            estimated_target: Some(WorldPosition::new(4.0, 5.0, 0.0)),
            photos_taken: vec![photo],
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let record = sample_record();

        let path = save_record(&record, dir.path()).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("-photo-data.json"));

        let loaded = load_record(&path).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.photos_taken[0].detections[0].sector, Sector::Left);
    }

    #[test]
    fn test_record_json_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_record(&sample_record(), dir.path()).unwrap();
        let json = std::fs::read_to_string(path).unwrap();

        assert!(json.contains("\"sessionId\""));
        assert!(json.contains("\"methodName\""));
        assert!(json.contains("\"photosTaken\""));
        assert!(json.contains("\"detectionMode\""));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = load_record(Path::new("/nonexistent/record.json")).unwrap_err();
        assert!(matches!(err, RecordError::Io(_)));
    }
}
