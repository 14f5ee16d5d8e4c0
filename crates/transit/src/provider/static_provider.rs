//! In-memory route repository.
//!
//! Stores every route in memory with a spatial index over all of their
//! stops, for "which stops are near me" style queries.

use std::collections::HashMap;
use std::sync::Arc;

use rstar::RTree;

use crate::identifiers::*;
use crate::models::{traits::*, types::*};
use crate::spatial::index::{degree_radius_2, query_point, StopNode};
use crate::spatial::queries::distance_km;

/// In-memory route repository with spatial indexing
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone)]
pub struct StaticRouteProvider {
    routes: Vec<Arc<Route>>,
    route_map: HashMap<RouteIdentifier, Arc<Route>>,
    stop_tree: RTree<StopNode>,
}

impl StaticRouteProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            route_map: HashMap::new(),
            stop_tree: RTree::new(),
        }
    }

    /// Build a provider from route tables, validating every route
    pub fn from_routes(routes: Vec<Route>) -> Result<Self> {
        let mut route_map = HashMap::with_capacity(routes.len());
        let mut stop_nodes = Vec::new();
        let mut stored = Vec::with_capacity(routes.len());

        for route in routes {
            route.validate()?;

            let route = Arc::new(route);
            if route_map.insert(route.id.clone(), route.clone()).is_some() {
                return Err(TransitError::InvalidRoute(format!(
                    "duplicate route id {}",
                    route.id
                )));
            }

            stop_nodes.extend(
                route
                    .stops
                    .iter()
                    .map(|stop| StopNode::new(route.id.clone(), Arc::new(stop.clone()))),
            );
            stored.push(route);
        }

        Ok(Self {
            routes: stored,
            route_map,
            stop_tree: RTree::bulk_load(stop_nodes),
        })
    }

    fn nearby(node: &StopNode, point: Coordinate) -> NearbyStop {
        NearbyStop {
            route_id: node.route_id.clone(),
            stop: node.stop.clone(),
            distance_km: distance_km(point, node.stop.coordinates),
        }
    }
}

impl Default for StaticRouteProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_by_distance(stops: &mut [NearbyStop]) {
    stops.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
}

impl RouteRepository for StaticRouteProvider {
    fn get_route(&self, id: &RouteIdentifier) -> Option<Arc<Route>> {
        self.route_map.get(id).cloned()
    }

    fn all_routes(&self) -> Vec<Arc<Route>> {
        self.routes.clone()
    }

    fn stops_near(&self, point: Coordinate, radius_km: f64) -> Vec<NearbyStop> {
        // Validate radius is positive
        if radius_km <= 0.0 || !radius_km.is_finite() || !point.is_finite() {
            return Vec::new();
        }

        let mut found: Vec<_> = self
            .stop_tree
            .locate_within_distance(query_point(point), degree_radius_2(point, radius_km))
            .map(|node| Self::nearby(node, point))
            .filter(|nearby| nearby.distance_km <= radius_km)
            .collect();

        sort_by_distance(&mut found);
        found
    }

    fn nearest_stops(&self, point: Coordinate, n: usize) -> Vec<NearbyStop> {
        if !point.is_finite() {
            return Vec::new();
        }

        let mut found: Vec<_> = self
            .stop_tree
            .nearest_neighbor_iter(&query_point(point))
            .take(n)
            .map(|node| Self::nearby(node, point))
            .collect();

        sort_by_distance(&mut found);
        found
    }
}
