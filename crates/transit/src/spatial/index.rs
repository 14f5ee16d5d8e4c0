//! R-tree nodes for spatial indexing of stops.
//!
//! ## Two-Stage Filtering
//!
//! Stop queries use a two-stage filtering approach:
//! 1. **R-tree filter**: Euclidean distance in degree space for fast candidate selection
//! 2. **Haversine filter**: Accurate geodesic distance on the candidates
//!
//! The R-tree radius is converted from kilometers to degrees with the
//! longitude shrink at the query latitude taken into account, so the first
//! stage never drops a stop the second stage would keep.

use std::sync::Arc;

use rstar::{PointDistance, RTreeObject, AABB};

use crate::identifiers::RouteIdentifier;
use crate::models::types::{Coordinate, Stop};
use crate::spatial::queries::equator_km_to_degrees;

// ============================================================================
// Stop Spatial Node
// ============================================================================

#[derive(Clone, Debug)]
pub struct StopNode {
    pub route_id: RouteIdentifier,
    pub stop: Arc<Stop>,
    point: [f64; 2],
}

impl StopNode {
    pub fn new(route_id: RouteIdentifier, stop: Arc<Stop>) -> Self {
        let point = [stop.coordinates.longitude, stop.coordinates.latitude];
        Self {
            route_id,
            stop,
            point,
        }
    }
}

impl RTreeObject for StopNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for StopNode {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Query point for the R-tree
pub fn query_point(coordinate: Coordinate) -> [f64; 2] {
    [coordinate.longitude, coordinate.latitude]
}

/// Squared degree radius that covers `radius_km` around `center`
///
/// A degree of longitude shrinks with the cosine of latitude, so the
/// degree radius is widened accordingly (capped near the poles).
pub fn degree_radius_2(center: Coordinate, radius_km: f64) -> f64 {
    let cos_lat = center.latitude.to_radians().cos().abs().max(0.01);
    let degrees = equator_km_to_degrees(radius_km) / cos_lat;
    degrees * degrees
}
