//! Spatial query utilities for distance and bearing calculations.
//!
//! Uses the Haversine formula for distances on Earth's surface. Segment
//! projection is planar in degree space, which is accurate enough for the
//! short waypoint-to-waypoint legs route data is made of.

use geo::{Closest, ClosestPoint, HaversineBearing, HaversineDistance, Line};

use crate::models::types::Coordinate;

/// Mean Earth radius used by `geo`'s haversine implementation, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance between two coordinates in kilometers
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    a.to_point().haversine_distance(&b.to_point()) / 1000.0
}

/// Initial bearing from `from` towards `to`, in degrees within `[0, 360)`
pub fn bearing_degrees(from: Coordinate, to: Coordinate) -> f64 {
    let bearing = from.to_point().haversine_bearing(to.to_point()).rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if bearing >= 360.0 {
        0.0
    } else {
        bearing
    }
}

/// Closest point to `point` on the segment `a -> b`
pub fn closest_point_on_segment(point: Coordinate, a: Coordinate, b: Coordinate) -> Coordinate {
    let line = Line::new(a.to_point(), b.to_point());

    match line.closest_point(&point.to_point()) {
        Closest::Intersection(p) | Closest::SinglePoint(p) => p.into(),
        // Zero-length segment: every point of it is equally close
        Closest::Indeterminate => a,
    }
}

/// Whether two coordinates lie within `radius_km` of each other
pub fn is_within_km(a: Coordinate, b: Coordinate, radius_km: f64) -> bool {
    radius_km.is_finite() && radius_km >= 0.0 && distance_km(a, b) <= radius_km
}

/// Degrees of longitude spanning `km` along the equator
pub fn equator_km_to_degrees(km: f64) -> f64 {
    km.to_degrees() / EARTH_RADIUS_KM
}
