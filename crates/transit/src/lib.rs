//! # bus-alarm-transit
//!
//! Static route data and the geometry needed to follow a bus along it.
//!
//! ## Features
//!
//! - **Geodesy**: Haversine distance and initial bearing between coordinates
//! - **Route progress**: Project a bus onto a route polyline and measure what is left to a stop
//! - **Spatial queries**: R-tree backed "stops near me" lookups
//! - **Serde** (optional): (De)serialize routes and samples with the `serde` feature
//!
//! ## Example
//!
//! ```
//! use bus_alarm_transit::prelude::*;
//!
//! let stops = vec![
//!     Stop {
//!         id: StopIdentifier::new("ameerpet"),
//!         sequence_index: 0,
//!         name: "Ameerpet Metro".into(),
//!         coordinates: Coordinate::new(17.4375, 78.4484),
//!     },
//!     Stop {
//!         id: StopIdentifier::new("gate"),
//!         sequence_index: 1,
//!         name: "University Main Gate".into(),
//!         coordinates: Coordinate::new(17.4832, 78.4567),
//!     },
//! ];
//!
//! let route = Route {
//!     id: RouteIdentifier::new("BUS002"),
//!     name: "Ameerpet to Campus".into(),
//!     polyline: stops.iter().map(|s| s.coordinates).collect(),
//!     stops,
//! };
//! route.validate().unwrap();
//!
//! // Still at the first stop: the whole route is left
//! let progress = progress_to_stop(&route, Coordinate::new(17.4375, 78.4484), &"gate".into()).unwrap();
//! assert!((progress.distance_remaining_to_stop_km - route.length_km()).abs() < 1e-6);
//! ```

pub mod identifiers;
pub mod models;
pub mod progress;
pub mod provider;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::{traits::*, types::*};
    pub use crate::progress::{
        nearest_point_on_polyline, progress_to_stop, PolylinePosition, RouteProgress,
    };
    pub use crate::provider::StaticRouteProvider;
    pub use crate::spatial::queries::{bearing_degrees, distance_km, is_within_km};
}

pub use prelude::*;
