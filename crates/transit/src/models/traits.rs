//! Core traits for route data.
//!
//! Routes are read-only input to tracking. Implementations can be
//! in-memory tables, a database, or a remote catalogue.

use std::sync::Arc;

use crate::identifiers::*;
use crate::models::types::*;

/// A stop found by a spatial query, with the route it belongs to
#[derive(Clone, Debug)]
pub struct NearbyStop {
    pub route_id: RouteIdentifier,
    pub stop: Arc<Stop>,
    pub distance_km: f64,
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Supplier of routes and stops with lookup and spatial query methods
pub trait RouteRepository: Send + Sync {
    // ---- Lookups ----
    fn get_route(&self, id: &RouteIdentifier) -> Option<Arc<Route>>;

    /// Like `get_route`, but missing routes are an error
    fn require_route(&self, id: &RouteIdentifier) -> Result<Arc<Route>> {
        self.get_route(id)
            .ok_or_else(|| TransitError::RouteNotFound(id.clone()))
    }

    // ---- Collections ----
    fn all_routes(&self) -> Vec<Arc<Route>>;

    // ---- Spatial queries ----

    /// Stops within `radius_km`, nearest first
    fn stops_near(&self, point: Coordinate, radius_km: f64) -> Vec<NearbyStop>;

    /// The `n` nearest stops across all routes, nearest first
    fn nearest_stops(&self, point: Coordinate, n: usize) -> Vec<NearbyStop>;
}
