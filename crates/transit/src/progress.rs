//! Route progress: where along its polyline a bus is, and how far it still
//! has to go to reach a stop.
//!
//! Positions are projected onto each polyline segment and the segment with
//! the closest projection wins. Route data is a coarse set of waypoints, so
//! segments are treated as straight lines between them.

use itertools::Itertools;

use crate::identifiers::StopIdentifier;
use crate::models::types::*;
use crate::spatial::queries::{closest_point_on_segment, distance_km};

/// Remaining distances are reported to the millimeter
const MILLIMETERS_PER_KM: f64 = 1e6;

/// A position projected onto a polyline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolylinePosition {
    /// Index of the segment `polyline[i] -> polyline[i + 1]`
    pub segment_index: usize,
    /// Cumulative distance from the polyline start to the projected point
    pub distance_along_km: f64,
    /// Distance between the position and its projection
    pub offset_km: f64,
    pub projected: Coordinate,
}

/// Progress of a bus relative to a target stop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteProgress {
    pub nearest_polyline_index: usize,
    pub distance_traveled_km: f64,
    /// Zero once the bus has reached or passed the stop.
    pub distance_remaining_to_stop_km: f64,
}

/// Project `position` onto the closest segment of `polyline`.
///
/// Ties go to the earliest segment, so a position on a shared vertex
/// counts as the end of the earlier segment.
pub fn nearest_point_on_polyline(
    polyline: &[Coordinate],
    position: Coordinate,
) -> Result<PolylinePosition> {
    if !position.is_finite() {
        return Err(TransitError::InvalidPosition(format!(
            "non-finite position {:?}",
            position
        )));
    }

    let mut best: Option<PolylinePosition> = None;
    let mut traveled_km = 0.0;

    for (segment_index, (a, b)) in polyline.iter().copied().tuple_windows().enumerate() {
        let segment_km = distance_km(a, b);
        let projected = closest_point_on_segment(position, a, b);
        let offset_km = distance_km(position, projected);

        if best.map_or(true, |best| offset_km < best.offset_km) {
            best = Some(PolylinePosition {
                segment_index,
                // Planar projection can land a hair past the geodesic length
                distance_along_km: traveled_km + distance_km(a, projected).min(segment_km),
                offset_km,
                projected,
            });
        }

        traveled_km += segment_km;
    }

    best.ok_or_else(|| {
        TransitError::InvalidRoute(format!(
            "polyline has {} points, need at least 2",
            polyline.len()
        ))
    })
}

/// How far the bus at `position` has come, and how far it still is from
/// `target_stop_id`, measured along the route's polyline.
pub fn progress_to_stop(
    route: &Route,
    position: Coordinate,
    target_stop_id: &StopIdentifier,
) -> Result<RouteProgress> {
    let stop = route
        .stop(target_stop_id)
        .ok_or_else(|| TransitError::UnknownStop(target_stop_id.clone()))?;

    let bus = nearest_point_on_polyline(&route.polyline, position)?;
    let target = nearest_point_on_polyline(&route.polyline, stop.coordinates)?;

    Ok(RouteProgress {
        nearest_polyline_index: bus.segment_index,
        distance_traveled_km: bus.distance_along_km,
        distance_remaining_to_stop_km: round_to_millimeter(
            (target.distance_along_km - bus.distance_along_km).max(0.0),
        ),
    })
}

fn round_to_millimeter(km: f64) -> f64 {
    (km * MILLIMETERS_PER_KM).round() / MILLIMETERS_PER_KM
}
