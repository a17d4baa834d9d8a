//! Convex-hull aggregation of one group's geometries.

use geo::{Centroid, ConvexHull, CoordsIter};
use geo_types::{Geometry, MultiPoint, Point};

use crate::error::{DissolveError, DissolveResult};

/// The true centroid of the convex hull enclosing the union of `geometries`.
///
/// One hull is computed over the whole selection, never one per feature. The
/// hull of a union is the hull of the inputs' vertices, so the union itself
/// is never materialized. For non-convex inputs the hull shifts the centroid
/// relative to the exact polygon centroid; that approximation is the
/// operation's contract.
pub fn dissolve_centroid(geometries: &[&Geometry<f64>]) -> DissolveResult<Point<f64>> {
    if geometries.is_empty() {
        return Err(DissolveError::EmptyGroup(
            "no geometries to dissolve".to_string(),
        ));
    }

    let vertices: Vec<Point<f64>> = geometries
        .iter()
        .flat_map(|geometry| geometry.coords_iter())
        .map(Point::from)
        .collect();
    if vertices.is_empty() {
        return Err(DissolveError::Geometry(
            "selected geometries have no coordinates".to_string(),
        ));
    }

    let hull = MultiPoint::new(vertices).convex_hull();
    hull.centroid().ok_or_else(|| {
        DissolveError::Geometry("degenerate hull has no centroid".to_string())
    })
}
