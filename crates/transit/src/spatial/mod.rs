//! Spatial indexing and query utilities.

pub mod index;
pub mod queries;

pub use queries::{bearing_degrees, closest_point_on_segment, distance_km, is_within_km};
