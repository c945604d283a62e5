//! Great-circle distance and walking feasibility checks.

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A walkable route may cover at most this distance in total
pub const MAX_TOTAL_DISTANCE_M: f64 = 2000.0;
/// No single leg between consecutive stops may exceed this
pub const MAX_LEG_DISTANCE_M: f64 = 500.0;
/// Assumed leisurely walking pace
pub const WALKING_SPEED_M_PER_MIN: f64 = 80.0;

/// Haversine distance in meters between two WGS84 coordinates
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1) = (lat1.to_radians(), lon1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lon2.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    c * EARTH_RADIUS_M
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSummary {
    pub is_feasible: bool,
    pub total_distance: f64,
    pub max_leg_distance: f64,
    pub average_leg_distance: f64,
    pub estimated_walking_time_minutes: f64,
}

/// Aggregate leg distances into a feasibility verdict. A route is walkable
/// when the total stays within [`MAX_TOTAL_DISTANCE_M`] and every leg within
/// [`MAX_LEG_DISTANCE_M`], both bounds inclusive.
pub fn validate_feasibility(leg_distances: &[f64]) -> RouteSummary {
    let legs: Vec<f64> = leg_distances
        .iter()
        .copied()
        .filter(|d| d.is_finite())
        .collect();

    if legs.is_empty() {
        return RouteSummary {
            is_feasible: true,
            total_distance: 0.0,
            max_leg_distance: 0.0,
            average_leg_distance: 0.0,
            estimated_walking_time_minutes: 0.0,
        };
    }

    let total_distance: f64 = legs.iter().sum();
    let max_leg_distance = legs.iter().copied().fold(0.0_f64, f64::max);
    let average_leg_distance = total_distance / legs.len() as f64;

    RouteSummary {
        is_feasible: total_distance <= MAX_TOTAL_DISTANCE_M
            && max_leg_distance <= MAX_LEG_DISTANCE_M,
        total_distance,
        max_leg_distance,
        average_leg_distance,
        estimated_walking_time_minutes: total_distance / WALKING_SPEED_M_PER_MIN,
    }
}

/// Map a route's total distance to a difficulty label
pub fn difficulty_for_distance(total_distance_m: f64) -> &'static str {
    if total_distance_m <= 1000.0 {
        "easy"
    } else if total_distance_m <= MAX_TOTAL_DISTANCE_M {
        "moderate"
    } else {
        "challenging"
    }
}
