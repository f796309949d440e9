//! Multi-view line-of-sight triangulation.

mod engine;

pub use engine::{MapInfo, TriangulationEngine, TriangulationReport, LINE_LENGTH};
