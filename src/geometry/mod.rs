//! Geometry utilities: planar angles, polar decomposition, floor projection.

pub mod angle;

pub use angle::{floor_projection, normalize_angle, polar_about};
