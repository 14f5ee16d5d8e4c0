//! Core data types for routes, stops and position samples.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::Point;
use itertools::Itertools;

use crate::identifiers::*;

// ============================================================================
// Coordinates
// ============================================================================

/// A WGS-84 position in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    pub fn to_point(self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

impl From<Point> for Coordinate {
    fn from(point: Point) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Coordinate> for Point {
    fn from(coordinate: Coordinate) -> Self {
        coordinate.to_point()
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A boarding point on a route.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stop {
    pub id: StopIdentifier,
    /// Position in the route's stop ordering; strictly increasing.
    pub sequence_index: u32,
    pub name: Arc<str>,
    pub coordinates: Coordinate,
}

/// A bus route: its ordered stops and the path the bus physically drives.
///
/// Stops don't have to sit exactly on the polyline; progress is measured by
/// projecting both the bus and the stop onto it.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    pub id: RouteIdentifier,
    pub name: Arc<str>,
    pub stops: Vec<Stop>,
    pub polyline: Vec<Coordinate>,
}

impl Route {
    pub fn stop(&self, id: &StopIdentifier) -> Option<&Stop> {
        self.stops.iter().find(|stop| &stop.id == id)
    }

    /// Total polyline length in kilometers.
    pub fn length_km(&self) -> f64 {
        use crate::spatial::queries::distance_km;

        self.polyline
            .iter()
            .tuple_windows()
            .map(|(a, b)| distance_km(*a, *b))
            .sum()
    }

    /// Check the structural invariants tracking relies on.
    pub fn validate(&self) -> Result<()> {
        if self.stops.len() < 2 {
            return Err(TransitError::InvalidRoute(format!(
                "route {} has {} stops, need at least 2",
                self.id,
                self.stops.len()
            )));
        }

        if self.polyline.len() < 2 {
            return Err(TransitError::InvalidRoute(format!(
                "route {} polyline has {} points, need at least 2",
                self.id,
                self.polyline.len()
            )));
        }

        if let Some(bad) = self.polyline.iter().find(|c| !c.is_finite()) {
            return Err(TransitError::InvalidRoute(format!(
                "route {} polyline contains non-finite coordinate {:?}",
                self.id, bad
            )));
        }

        if let Some(stop) = self.stops.iter().find(|s| !s.coordinates.is_finite()) {
            return Err(TransitError::InvalidRoute(format!(
                "stop {} on route {} has non-finite coordinates",
                stop.id, self.id
            )));
        }

        if let Some((a, b)) = self
            .stops
            .iter()
            .tuple_windows()
            .find(|(a, b)| b.sequence_index <= a.sequence_index)
        {
            return Err(TransitError::InvalidRoute(format!(
                "stop {} (sequence {}) follows stop {} (sequence {}) on route {}",
                b.id, b.sequence_index, a.id, a.sequence_index, self.id
            )));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = self.stops.iter().find(|s| !seen.insert(&s.id)) {
            return Err(TransitError::InvalidRoute(format!(
                "duplicate stop id {} on route {}",
                dup.id, self.id
            )));
        }

        Ok(())
    }
}

/// A single observation of the bus, pushed in by a location source.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionSample {
    pub coordinates: Coordinate,
    pub timestamp: DateTime<Utc>,
    /// Ground speed reported by the device, if any.
    pub speed_kmh: Option<f64>,
}

impl PositionSample {
    pub fn new(coordinates: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            coordinates,
            timestamp,
            speed_kmh: None,
        }
    }

    pub fn with_speed(mut self, speed_kmh: f64) -> Self {
        self.speed_kmh = Some(speed_kmh);
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Stop not found on route: {0}")]
    UnknownStop(StopIdentifier),

    #[error("Route not found: {0}")]
    RouteNotFound(RouteIdentifier),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid position: {0}")]
    InvalidPosition(String),
}

pub type Result<T> = std::result::Result<T, TransitError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(id: &str, sequence_index: u32, latitude: f64, longitude: f64) -> Stop {
        Stop {
            id: StopIdentifier::new(id),
            sequence_index,
            name: id.into(),
            coordinates: Coordinate::new(latitude, longitude),
        }
    }

    fn route(stops: Vec<Stop>) -> Route {
        Route {
            id: RouteIdentifier::new("BUS002"),
            name: "Ameerpet to Campus".into(),
            polyline: stops.iter().map(|s| s.coordinates).collect(),
            stops,
        }
    }

    #[test]
    fn test_coordinate_point_axes() {
        let coordinate = Coordinate::new(17.4375, 78.4484);
        let point = coordinate.to_point();

        assert_eq!(point.x(), 78.4484);
        assert_eq!(point.y(), 17.4375);
        assert_eq!(Coordinate::from(point), coordinate);
    }

    #[test]
    fn test_valid_route() {
        let route = route(vec![
            stop("1", 0, 17.4375, 78.4484),
            stop("2", 1, 17.4401, 78.3489),
            stop("3", 2, 17.4832, 78.4567),
        ]);

        assert!(route.validate().is_ok());
        assert_eq!(route.stop(&"2".into()).map(|s| s.sequence_index), Some(1));
        assert!(route.stop(&"9".into()).is_none());
        assert!(route.length_km() > 0.0);
    }

    #[test]
    fn test_route_needs_two_stops() {
        let route = route(vec![stop("1", 0, 17.4375, 78.4484)]);
        assert!(matches!(route.validate(), Err(TransitError::InvalidRoute(_))));
    }

    #[test]
    fn test_route_needs_polyline() {
        let mut route = route(vec![
            stop("1", 0, 17.4375, 78.4484),
            stop("2", 1, 17.4401, 78.3489),
        ]);
        route.polyline.truncate(1);

        assert!(matches!(route.validate(), Err(TransitError::InvalidRoute(_))));
    }

    #[test]
    fn test_route_rejects_out_of_order_stops() {
        let route = route(vec![
            stop("1", 0, 17.4375, 78.4484),
            stop("2", 2, 17.4401, 78.3489),
            stop("3", 2, 17.4832, 78.4567),
        ]);

        assert!(matches!(route.validate(), Err(TransitError::InvalidRoute(_))));
    }

    #[test]
    fn test_route_rejects_duplicate_ids() {
        let route = route(vec![
            stop("1", 0, 17.4375, 78.4484),
            stop("1", 1, 17.4401, 78.3489),
        ]);

        assert!(matches!(route.validate(), Err(TransitError::InvalidRoute(_))));
    }

    #[test]
    fn test_route_rejects_nan() {
        let route = route(vec![
            stop("1", 0, 17.4375, 78.4484),
            stop("2", 1, f64::NAN, 78.3489),
        ]);

        assert!(matches!(route.validate(), Err(TransitError::InvalidRoute(_))));
    }

    #[test]
    fn test_sample_with_speed() {
        let sample = PositionSample::new(Coordinate::new(17.385, 78.4867), DateTime::UNIX_EPOCH)
            .with_speed(40.0);

        assert_eq!(sample.speed_kmh, Some(40.0));
    }
}
