//! The triangulation pipeline: sight lines from photo poses and
//! detections, consolidation, pairwise intersection with a distance
//! window, clustering, and back-projection into world coordinates.

use std::f64::consts::PI;

use nalgebra::Point2;

use crate::geometry::{consolidate_lines, merge_points, MapPoint, SightLine};
use crate::model::{DetectionMode, PhotoRecord, WorldPosition};

/// Length of a generated sight line in map-bitmap units.
pub const LINE_LENGTH: f64 = 60.0;

/// Direction-angle difference below which two lines are merged.
const SIMILARITY_THRESHOLD_DEG: f64 = 20.0;

/// Open-interval distance window an intersection must keep to both source
/// line origins. Rejects near-origin numerical noise and far-field
/// spurious crossings.
const MIN_INTERSECTION_DISTANCE: f64 = 10.0;
const MAX_INTERSECTION_DISTANCE: f64 = 100.0;

/// Single-link radius for grouping intersections into one estimate.
const CLUSTER_RADIUS: f64 = 500.0;

/// Occupancy-map metadata needed to move between world meters and the
/// mirrored bitmap the sight lines live in. The displayed map is
/// horizontally flipped relative to sensor data, hence the mirroring.
#[derive(Debug, Clone, Copy)]
pub struct MapInfo {
    pub origin_x: f64,
    pub origin_y: f64,
    pub resolution: f64,
    pub bitmap_width: u32,
}

impl MapInfo {
    /// Project a world pose into mirrored bitmap coordinates.
    pub fn world_to_bitmap(&self, x: f64, y: f64) -> MapPoint {
        let dot_x = (x - self.origin_x) / self.resolution;
        let dot_y = (y - self.origin_y) / self.resolution;
        Point2::new(f64::from(self.bitmap_width) - dot_x, dot_y)
    }

    /// Reverse the mirror and scale a bitmap point back to world meters.
    pub fn bitmap_to_world(&self, point: MapPoint) -> MapPoint {
        let original_x = f64::from(self.bitmap_width) - point.x;
        Point2::new(
            original_x * self.resolution + self.origin_x,
            point.y * self.resolution + self.origin_y,
        )
    }
}

/// Full output of one triangulation run. `chosen` is the session
/// estimate; the intermediate stages are kept for evaluation and tests.
#[derive(Debug, Clone, Default)]
pub struct TriangulationReport {
    pub lines: Vec<SightLine>,
    pub consolidated: Vec<SightLine>,
    pub intersections: Vec<MapPoint>,
    pub clusters: Vec<MapPoint>,
    pub candidates: Vec<WorldPosition>,
    pub chosen: Option<WorldPosition>,
}

pub struct TriangulationEngine {
    map: MapInfo,
}

impl TriangulationEngine {
    pub fn new(map: MapInfo) -> Self {
        Self { map }
    }

    /// Fuse the detections of a completed session into a world-space
    /// target estimate.
    ///
    /// Zero detections or an all-parallel line set produce an empty
    /// candidate list, never an error.
    pub fn estimate(&self, photos: &[PhotoRecord]) -> TriangulationReport {
        let lines = self.sight_lines(photos);
        let consolidated = consolidate_lines(&lines, SIMILARITY_THRESHOLD_DEG.to_radians());
        let intersections = self.intersections(&consolidated);
        let clusters = merge_points(intersections.clone(), CLUSTER_RADIUS);

        let candidates: Vec<WorldPosition> = clusters
            .iter()
            .map(|centroid| {
                let world = self.map.bitmap_to_world(*centroid);
                WorldPosition::new(world.x, world.y, 0.0)
            })
            .collect();

        // Multiple clusters are possible; the first one produced wins.
        let chosen = candidates.first().copied();

        tracing::debug!(
            lines = lines.len(),
            consolidated = consolidated.len(),
            intersections = intersections.len(),
            clusters = clusters.len(),
            "triangulation finished"
        );

        TriangulationReport {
            lines,
            consolidated,
            intersections,
            clusters,
            candidates,
            chosen,
        }
    }

    /// One sight line per detection, from the photo's mirrored bitmap
    /// position.
    ///
    /// The base angle is `pi - yaw` because of the horizontal mirror. Crop
    /// mode casts a single forward ray; split mode offsets it by the
    /// detection's sector.
    pub fn sight_lines(&self, photos: &[PhotoRecord]) -> Vec<SightLine> {
        let mut lines = Vec::new();

        for photo in photos.iter().filter(|p| !p.detections.is_empty()) {
            let origin = self.map.world_to_bitmap(photo.pose.x, photo.pose.y);
            let base_angle = PI - photo.pose.yaw;

            for detection in &photo.detections {
                let angle = match photo.detection_mode {
                    DetectionMode::Crop => base_angle,
                    DetectionMode::Split => base_angle + detection.sector.angle_offset(),
                };
                lines.push(SightLine::from_angle(origin, angle, LINE_LENGTH));
            }
        }

        lines
    }

    /// Pairwise intersections of the consolidated lines, filtered by the
    /// open distance window against both origins. A point identical to an
    /// already accepted one is not re-added.
    pub fn intersections(&self, lines: &[SightLine]) -> Vec<MapPoint> {
        let mut points: Vec<MapPoint> = Vec::new();

        for i in 0..lines.len() {
            for j in (i + 1)..lines.len() {
                let Some(point) = lines[i].intersection(&lines[j]) else {
                    continue;
                };
                if points.contains(&point) {
                    continue;
                }

                let d1 = nalgebra::distance(&point, &lines[i].origin);
                let d2 = nalgebra::distance(&point, &lines[j].origin);

                if d1 > MIN_INTERSECTION_DISTANCE
                    && d2 > MIN_INTERSECTION_DISTANCE
                    && d1 < MAX_INTERSECTION_DISTANCE
                    && d2 < MAX_INTERSECTION_DISTANCE
                {
                    points.push(point);
                }
            }
        }

        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BoundingBox, DetectedObject, Sector};
    use crate::ports::ImageHandle;
    use approx::assert_relative_eq;

    fn map() -> MapInfo {
        MapInfo {
            origin_x: 0.0,
            origin_y: 0.0,
            resolution: 1.0,
            bitmap_width: 10,
        }
    }

    fn detection(sector: Sector) -> DetectedObject {
        let mut obj = DetectedObject::new(
            "chair",
            0.9,
            BoundingBox {
                left: 0,
                top: 0,
                right: 10,
                bottom: 10,
            },
        );
        obj.sector = sector;
        obj
    }

    fn photo(pose: WorldPosition, mode: DetectionMode, sector: Sector) -> PhotoRecord {
        let mut photo = PhotoRecord::new(
            "session",
            0,
            0,
            pose,
            mode,
            ImageHandle::new("photo.jpg", 100, 100),
        );
        photo.detections.push(detection(sector));
        photo
    }

    #[test]
    fn test_world_bitmap_roundtrip() {
        let map = MapInfo {
            origin_x: -5.0,
            origin_y: 2.0,
            resolution: 0.05,
            bitmap_width: 800,
        };
        let bitmap = map.world_to_bitmap(3.0, 7.0);
        let back = map.bitmap_to_world(bitmap);
        assert_relative_eq!(back.x, 3.0, epsilon = 1e-9);
        assert_relative_eq!(back.y, 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_window_is_open_interval() {
        let engine = TriangulationEngine::new(map());

        // Crossing at (10, 0): exactly 10 from the first origin.
        let at_10 = vec![
            SightLine::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)),
            SightLine::new(Point2::new(10.0, 20.0), Point2::new(10.0, 19.0)),
        ];
        assert!(engine.intersections(&at_10).is_empty());

        // Crossing at (100, 0): exactly 100 from the first origin.
        let at_100 = vec![
            SightLine::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)),
            SightLine::new(Point2::new(100.0, 20.0), Point2::new(100.0, 19.0)),
        ];
        assert!(engine.intersections(&at_100).is_empty());

        // Crossing at (50, 0): 50 and 20 away, both inside the window.
        let at_50 = vec![
            SightLine::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)),
            SightLine::new(Point2::new(50.0, 20.0), Point2::new(50.0, 19.0)),
        ];
        let points = engine.intersections(&at_50);
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0].x, 50.0);
        assert_relative_eq!(points[0].y, 0.0);
    }

    #[test]
    fn test_duplicate_intersections_not_readded() {
        let engine = TriangulationEngine::new(map());

        // Three distinct-direction lines through (50, 0), origins 20-50
        // away. All pairs produce the same point; it is kept once.
        let lines = vec![
            SightLine::new(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)),
            SightLine::new(Point2::new(50.0, 20.0), Point2::new(50.0, 19.0)),
            SightLine::new(Point2::new(30.0, -20.0), Point2::new(31.0, -19.0)),
        ];
        let points = engine.intersections(&lines);
        assert_eq!(points.len(), 1);
    }

    #[test]
    fn test_no_detections_yields_no_estimate() {
        let engine = TriangulationEngine::new(map());
        let mut p = photo(
            WorldPosition::new(0.0, 0.0, 0.0),
            DetectionMode::Crop,
            Sector::Middle,
        );
        p.detections.clear();

        let report = engine.estimate(&[p]);
        assert!(report.lines.is_empty());
        assert!(report.chosen.is_none());
    }

    #[test]
    fn test_parallel_lines_yield_no_estimate() {
        let engine = TriangulationEngine::new(map());
        // Two crop photos with identical yaw: parallel rays. They get
        // consolidated into one line, which has nothing to intersect.
        let a = photo(
            WorldPosition::new(0.0, 0.0, 1.0),
            DetectionMode::Crop,
            Sector::Middle,
        );
        let b = photo(
            WorldPosition::new(2.0, 0.0, 1.0),
            DetectionMode::Crop,
            Sector::Middle,
        );

        let report = engine.estimate(&[a, b]);
        assert!(report.intersections.is_empty());
        assert!(report.chosen.is_none());
    }

    #[test]
    fn test_end_to_end_crossing_back_projects_through_mirror() {
        use std::f64::consts::{FRAC_PI_2, PI};

        let engine = TriangulationEngine::new(map());

        // Photo A: bitmap origin (5, -15), ray straight up (bitmap angle
        // pi/2 -> yaw pi/2), crossing (5, 5) at distance 20.
        // World x = bitmap_width - 5 = 5 at resolution 1, origin 0.
        let a = photo(
            WorldPosition::new(5.0, -15.0, FRAC_PI_2),
            DetectionMode::Crop,
            Sector::Middle,
        );
        // Photo B: bitmap origin (-15, 5), ray along +x (bitmap angle 0 ->
        // yaw pi), crossing (5, 5) at distance 20.
        let b = photo(
            WorldPosition::new(25.0, 5.0, PI),
            DetectionMode::Crop,
            Sector::Middle,
        );

        let report = engine.estimate(&[a, b]);
        assert_eq!(report.consolidated.len(), 2);
        assert_eq!(report.clusters.len(), 1);

        let target = report.chosen.expect("estimate");
        assert_relative_eq!(target.x, 5.0, epsilon = 1e-9);
        assert_relative_eq!(target.y, 5.0, epsilon = 1e-9);
        assert_relative_eq!(target.yaw, 0.0);
    }

    #[test]
    fn test_split_mode_sector_offsets_rays() {
        use std::f64::consts::{FRAC_PI_2, PI};

        let engine = TriangulationEngine::new(map());
        let straight = photo(
            WorldPosition::new(5.0, 0.0, FRAC_PI_2),
            DetectionMode::Split,
            Sector::Middle,
        );
        let offset = photo(
            WorldPosition::new(5.0, 0.0, FRAC_PI_2),
            DetectionMode::Split,
            Sector::Right,
        );

        let lines = engine.sight_lines(&[straight, offset]);
        assert_eq!(lines.len(), 2);
        let delta = lines[1].direction_angle() - lines[0].direction_angle();
        assert_relative_eq!(delta, 2.0 * PI / 5.0, epsilon = 1e-9);
    }
}
