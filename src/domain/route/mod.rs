pub mod distance;
pub mod service;

pub use distance::{
    difficulty_for_distance, haversine_distance, validate_feasibility, RouteSummary,
    MAX_LEG_DISTANCE_M, MAX_TOTAL_DISTANCE_M, WALKING_SPEED_M_PER_MIN,
};
pub use service::RouteService;

use serde::{Deserialize, Serialize};

/// A geocoded point returned by the geocoding backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("geocoding request failed: {0}")]
    Request(String),
    #[error("geocoding response could not be parsed: {0}")]
    InvalidResponse(String),
}
