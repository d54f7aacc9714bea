//! Planar approximations over WGS84 coordinates.
//!
//! Networks span a few kilometres, so an equirectangular projection around
//! the network's mean latitude is accurate to well under a metre and keeps the
//! spatial index in plain Euclidean space.

use geo::{Centroid, Coord, LineString, MultiPoint, Point};

/// Metres per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Convert a metric tolerance to an equivalent distance in degrees.
#[must_use]
pub fn degrees_for_meters(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Whether both coordinates are finite and inside the WGS84 range.
#[must_use]
pub fn is_wgs84(point: Point) -> bool {
    let (lon, lat) = point.x_y();
    lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat)
}

/// First and last coordinate of a line usable as an edge: two or more
/// coordinates, all finite.
#[must_use]
pub fn endpoints(line: &LineString) -> Option<(Coord, Coord)> {
    if line.0.len() < 2 || !line.coords().all(|c| c.x.is_finite() && c.y.is_finite()) {
        return None;
    }
    Some((*line.0.first()?, *line.0.last()?))
}

/// Mean of a set of coordinates, `None` when empty.
#[must_use]
pub fn centroid(coords: impl IntoIterator<Item = Coord>) -> Option<Point> {
    coords
        .into_iter()
        .map(Point::from)
        .collect::<MultiPoint>()
        .centroid()
}

/// Local metric projection: x/y in metres relative to the prime meridian
/// and equator, with longitude scaled by the cosine of a reference latitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalProjection {
    lon_scale: f64,
}

impl LocalProjection {
    /// Projection centred on `reference_lat` degrees.
    #[must_use]
    pub fn new(reference_lat: f64) -> Self {
        Self {
            lon_scale: reference_lat.to_radians().cos() * METERS_PER_DEGREE,
        }
    }

    /// Projection centred on the mean latitude of `points` (equator if empty).
    #[must_use]
    pub fn fitted(points: impl IntoIterator<Item = Point>) -> Self {
        Self::new(centroid(points.into_iter().map(|p| p.0)).map_or(0.0, |c| c.y()))
    }

    /// Project a lon/lat coordinate to `[x, y]` metres.
    #[must_use]
    pub fn project(&self, c: Coord) -> [f64; 2] {
        [c.x * self.lon_scale, c.y * METERS_PER_DEGREE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    #[test]
    fn one_metre_tolerance_in_degrees() {
        let deg = degrees_for_meters(111.0);
        assert!((deg - 0.001).abs() < 1e-12);
    }

    #[test]
    fn centroid_of_square_is_its_middle() {
        let corners = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]].map(Coord::from);
        assert_eq!(centroid(corners), Some(Point::new(1.0, 1.0)));
        assert_eq!(centroid(Vec::<Coord>::new()), None);
    }

    #[test]
    fn endpoints_need_two_finite_coordinates() {
        let line = LineString::from(vec![[0.0, 0.0], [0.5, 0.2], [1.0, 1.0]]);
        assert_eq!(
            endpoints(&line),
            Some((coord! { x: 0.0, y: 0.0 }, coord! { x: 1.0, y: 1.0 }))
        );
        assert_eq!(endpoints(&LineString::from(vec![[0.0, 0.0]])), None);
        assert_eq!(endpoints(&LineString::from(vec![[0.0, 0.0], [f64::NAN, 1.0]])), None);
        assert_eq!(endpoints(&LineString::new(Vec::new())), None);
    }

    #[test]
    fn wgs84_range() {
        assert!(is_wgs84(Point::new(-73.98, 40.75)));
        assert!(!is_wgs84(Point::new(200.0, 0.0)));
        assert!(!is_wgs84(Point::new(0.0, f64::INFINITY)));
    }

    #[test]
    fn projection_shrinks_longitude_away_from_equator() {
        let equator = LocalProjection::new(0.0);
        let north = LocalProjection::new(60.0);

        let at_equator = equator.project(coord! { x: 1.0, y: 0.0 });
        let at_sixty = north.project(coord! { x: 1.0, y: 0.0 });

        assert!((at_equator[0] - METERS_PER_DEGREE).abs() < 1e-6);
        assert!((at_sixty[0] - METERS_PER_DEGREE / 2.0).abs() < 1e-6);
        assert!((north.project(coord! { x: 0.0, y: 1.0 })[1] - METERS_PER_DEGREE).abs() < 1e-9);
    }

    #[test]
    fn fitted_projection_uses_mean_latitude() {
        let fitted = LocalProjection::fitted([Point::new(0.0, 50.0), Point::new(1.0, 70.0)]);
        assert_eq!(fitted, LocalProjection::new(60.0));
    }
}
