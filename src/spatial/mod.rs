//! Planar and real-world distance primitives.
//!
//! Coordinates are stored as longitude/latitude degrees in a [`Point`].
//! Distances compared against the similarity threshold are expressed in
//! metres using a flat-earth approximation: a fixed length per degree,
//! with the longitudinal component corrected by the cosine of latitude.

use geo::Point;
use rstar::AABB;


/// Metres spanned by one degree of latitude.
pub const METRES_PER_DEGREE: f64 = 111_111.0;

/// Planar length of the vector between two positions, in degrees.
#[inline]
pub fn planar(a: Point, b: Point) -> f64 {
    (a.x() - b.x()).hypot(a.y() - b.y())
}

/// Real-world length of a coordinate difference, given the latitude
/// (in degrees) at which the longitudinal difference is measured.
#[inline]
pub fn real_distance(lon_diff: f64, lat_diff: f64, latitude: f64) -> f64 {
    let lon = lon_diff * METRES_PER_DEGREE * latitude.to_radians().cos();
    let lat = lat_diff * METRES_PER_DEGREE;
    lon.hypot(lat)
}

/// Real-world distance between two positions, in metres.
///
/// The longitudinal correction uses the mean latitude of both
/// positions, which keeps the measure symmetric.
#[inline]
pub fn euc(a: Point, b: Point) -> f64 {
    let latitude = (a.y() + b.y()) / 2.0;
    real_distance(a.x() - b.x(), a.y() - b.y(), latitude)
}

/// Projects a position into a local metric frame anchored at `origin`.
#[inline]
fn local(origin: Point, p: Point, cos: f64) -> (f64, f64) {
    (
        (p.x() - origin.x()) * METRES_PER_DEGREE * cos,
        (p.y() - origin.y()) * METRES_PER_DEGREE,
    )
}

/// Shortest real-world distance from `p` to the segment `[a, b]`.
///
/// The foot of the perpendicular is clamped to the segment, so points
/// beyond either end measure to that end.
pub fn point_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let cos = p.y().to_radians().cos();
    let (x1, y1) = local(p, a, cos);
    let (x2, y2) = local(p, b, cos);

    // `p` sits at the origin of the local frame.
    let (dx, dy) = (x2 - x1, y2 - y1);
    let cross = dx * -x1 + dy * -y1;
    if cross <= 0.0 {
        return x1.hypot(y1);
    }

    let d2 = dx * dx + dy * dy;
    if cross >= d2 {
        return x2.hypot(y2);
    }

    let r = cross / d2;
    (x1 + dx * r).hypot(y1 + dy * r)
}

/// The axis-aligned box, in degrees, covering every position within
/// `distance` metres of `p`.
pub fn bounding(p: Point, distance: f64) -> AABB<Point> {
    let lat = distance / METRES_PER_DEGREE;
    let cos = p.y().to_radians().cos().abs().max(f64::EPSILON);
    let lon = lat / cos;

    AABB::from_corners(
        Point::new(p.x() - lon, p.y() - lat),
        Point::new(p.x() + lon, p.y() + lat),
    )
}
