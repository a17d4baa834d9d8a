//! Centroid reprojection via the [`geodesy`] crate.
//!
//! Only the aggregated centroid point is ever reprojected; hulls are computed
//! in the source reference. The operator definition comes from
//! [`Crs::wgs84_definition`], and its inverse maps projected coordinates back
//! to geographic ones.

use geodesy::prelude::*;
use geodesy::{Coor4D, Direction};
use geo_types::Point;

use crate::crs::Crs;
use crate::error::{DissolveError, DissolveResult};

/// Reproject `point` from `crs` to WGS84 longitude/latitude.
///
/// A geographic source is returned unchanged.
pub fn reproject_to_wgs84(point: Point<f64>, crs: &Crs) -> DissolveResult<Point<f64>> {
    let Some(definition) = crs.wgs84_definition()? else {
        return Ok(point);
    };

    let mut context = Minimal::new();
    let op = context
        .op(&definition)
        .map_err(|e| DissolveError::Crs(format!("{definition}: {e}")))?;

    let mut coords = [Coor4D([point.x(), point.y(), 0., 0.])];
    context
        .apply(op, Direction::Inv, &mut coords)
        .map_err(|e| DissolveError::Crs(format!("{definition}: {e}")))?;

    // Inverse projection yields geographic coordinates in radians,
    // longitude before latitude.
    let (lon, lat) = (coords[0][0].to_degrees(), coords[0][1].to_degrees());
    if !lat.is_finite() || !lon.is_finite() {
        return Err(DissolveError::Crs(format!(
            "{definition}: reprojection produced non-finite coordinates"
        )));
    }
    Ok(Point::new(lon, lat))
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn geographic_is_identity() {
        let point = Point::new(12.0, 55.0);
        assert_eq!(reproject_to_wgs84(point, &Crs::WGS84).unwrap(), point);
        assert_eq!(reproject_to_wgs84(point, &Crs::from_epsg(4269)).unwrap(), point);
    }

    #[test]
    fn web_mercator_inverse() {
        // Spherical web mercator forward formulas, radius = GRS80/WGS84
        // semimajor axis.
        let a = 6378137.0;
        let (lon, lat) = (12.0_f64, 55.0_f64);
        let x = a * lon.to_radians();
        let y = a * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();

        let point = reproject_to_wgs84(Point::new(x, y), &Crs::from_epsg(3857)).unwrap();
        assert_relative_eq!(point.x(), lon, epsilon = 1e-6);
        assert_relative_eq!(point.y(), lat, epsilon = 1e-6);
    }

    #[test]
    fn utm_central_meridian() {
        // Easting 500000 sits on the central meridian of every zone; zone 32
        // is at 9 degrees east.
        let point = reproject_to_wgs84(Point::new(500_000.0, 6_100_000.0), &Crs::from_epsg(32632))
            .unwrap();
        assert_relative_eq!(point.x(), 9.0, epsilon = 1e-6);
        assert!(point.y() > 54.0 && point.y() < 56.0);
    }

    #[test]
    fn utm_south_is_below_equator() {
        let point = reproject_to_wgs84(Point::new(500_000.0, 8_000_000.0), &Crs::from_epsg(32733))
            .unwrap();
        assert_relative_eq!(point.x(), 15.0, epsilon = 1e-6);
        assert!(point.y() < 0.0);
    }

    #[test]
    fn unsupported_crs() {
        assert!(reproject_to_wgs84(Point::new(0.0, 0.0), &Crs::from_epsg(27700)).is_err());
    }
}
