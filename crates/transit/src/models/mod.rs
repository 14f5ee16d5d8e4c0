//! Route data models, types, and traits.

pub mod traits;
pub mod types;

// Re-exports for convenience
pub use traits::{NearbyStop, RouteRepository};
pub use types::{Coordinate, PositionSample, Result, Route, Stop, TransitError};
