//! Geometry operations backing the per-group aggregation.

mod dissolve;
mod reproject;

pub use dissolve::dissolve_centroid;
pub use reproject::reproject_to_wgs84;
