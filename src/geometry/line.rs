//! Sight lines in map-bitmap space.
//!
//! A `SightLine` is a finite segment whose infinite extension is used for
//! intersection. Consolidation merges near-parallel duplicates produced by
//! adjacent shots of the same object, which would otherwise flood the
//! intersection stage with spurious crossings.

use nalgebra::{Point2, Vector2};

/// A point in mirrored map-bitmap coordinates.
pub type MapPoint = Point2<f64>;

/// A line of sight from a photo position towards a possible object location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightLine {
    pub origin: MapPoint,
    pub end: MapPoint,
}

impl SightLine {
    pub fn new(origin: MapPoint, end: MapPoint) -> Self {
        Self { origin, end }
    }

    /// Build a line of the given length from an origin along an angle.
    pub fn from_angle(origin: MapPoint, angle: f64, length: f64) -> Self {
        let end = origin + Vector2::new(angle.cos(), angle.sin()) * length;
        Self { origin, end }
    }

    /// Direction angle of the line via `atan2(end - origin)`.
    pub fn direction_angle(&self) -> f64 {
        (self.end.y - self.origin.y).atan2(self.end.x - self.origin.x)
    }

    /// Two lines are similar when their direction angles differ by less
    /// than `threshold` radians.
    pub fn is_similar(&self, other: &SightLine, threshold: f64) -> bool {
        (self.direction_angle() - other.direction_angle()).abs() < threshold
    }

    /// Merge two lines by averaging corresponding endpoints.
    pub fn merged_with(&self, other: &SightLine) -> SightLine {
        SightLine::new(
            Point2::new(
                (self.origin.x + other.origin.x) / 2.0,
                (self.origin.y + other.origin.y) / 2.0,
            ),
            Point2::new(
                (self.end.x + other.end.x) / 2.0,
                (self.end.y + other.end.y) / 2.0,
            ),
        )
    }

    /// Intersection of the infinite extensions of two lines.
    ///
    /// Standard 2x2 determinant formula; a zero determinant (parallel or
    /// coincident lines) yields `None`.
    pub fn intersection(&self, other: &SightLine) -> Option<MapPoint> {
        let (p1, p2) = (self.origin, self.end);
        let (p3, p4) = (other.origin, other.end);

        let denominator = (p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x);
        if denominator == 0.0 {
            return None;
        }

        let d1 = p1.x * p2.y - p1.y * p2.x;
        let d2 = p3.x * p4.y - p3.y * p4.x;
        let x = (d1 * (p3.x - p4.x) - (p1.x - p2.x) * d2) / denominator;
        let y = (d1 * (p3.y - p4.y) - (p1.y - p2.y) * d2) / denominator;

        Some(Point2::new(x, y))
    }
}

/// Consolidate near-duplicate lines with a single greedy pass.
///
/// Each unconsumed line seeds a merge group; later lines whose direction is
/// similar to the *seed* are averaged in and marked consumed, never to be
/// re-merged. Input order determines the result.
pub fn consolidate_lines(lines: &[SightLine], threshold: f64) -> Vec<SightLine> {
    let mut consolidated = Vec::new();
    let mut used = vec![false; lines.len()];

    for (i, seed) in lines.iter().enumerate() {
        if used[i] {
            continue;
        }
        let mut merged = *seed;
        for (j, candidate) in lines.iter().enumerate().skip(i + 1) {
            if !used[j] && seed.is_similar(candidate, threshold) {
                merged = merged.merged_with(candidate);
                used[j] = true;
            }
        }
        consolidated.push(merged);
        used[i] = true;
    }

    consolidated
}
