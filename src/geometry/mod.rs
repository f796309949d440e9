//! 2-D geometry primitives: sight lines, intersection, clustering.

pub mod cluster;
pub mod line;

pub use cluster::merge_points;
pub use line::{consolidate_lines, MapPoint, SightLine};
