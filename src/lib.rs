pub mod capture;
pub mod geometry;
pub mod model;
pub mod movement;
pub mod path;
pub mod ports;
pub mod session;
pub mod sim;
pub mod triangulate;
