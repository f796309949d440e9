//! Greedy single-link clustering of intersection points.

use super::line::MapPoint;
use nalgebra::Point2;

/// Collapse points into cluster centroids.
///
/// The first remaining point seeds a cluster and absorbs every other point
/// within `radius` of it; the arithmetic mean of the members becomes the
/// cluster centroid. Consumption follows list order, so the result is a
/// greedy approximation that depends on input ordering.
pub fn merge_points(mut points: Vec<MapPoint>, radius: f64) -> Vec<MapPoint> {
    let mut merged = Vec::new();

    while !points.is_empty() {
        let base = points.remove(0);
        let mut cluster = vec![base];

        points.retain(|point| {
            if nalgebra::distance(&base, point) < radius {
                cluster.push(*point);
                false
            } else {
                true
            }
        });

        let n = cluster.len() as f64;
        let cx = cluster.iter().map(|p| p.x).sum::<f64>() / n;
        let cy = cluster.iter().map(|p| p.y).sum::<f64>() / n;
        merged.push(Point2::new(cx, cy));
    }

    merged
}
