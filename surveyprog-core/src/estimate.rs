//! Quantity Estimator
//!
//! Derives the numeric values the template needs when the order text
//! does not state them outright. Pure functions of (area,
//! classification, optional explicit value); no shared state.

use std::f64::consts::PI;

/// Fallback site area when no source resolves one, in hectares.
pub const DEFAULT_AREA_HA: f64 = 0.77;

/// Assumed corridor width for a walking traverse over a linear object,
/// in metres.
pub const CORRIDOR_WIDTH_M: f64 = 20.0;

/// Observation-point density: one point per this many hectares.
pub const HA_PER_OBSERVATION_POINT: f64 = 0.5;

/// Round to one decimal with a 0.1 km floor — a route shorter than
/// 100 m is never quoted.
fn round_km(km: f64) -> f64 {
    let rounded = (km * 10.0).round() / 10.0;
    rounded.max(0.1)
}

/// Length of the survey traverse, in kilometres.
///
/// A linear object (pipeline, road) prefers the explicitly stated
/// length and falls back to spreading its area over an assumed 20 m
/// corridor. An area-shaped site is walked around its perimeter,
/// approximated as the circumference of the circle of equal area.
pub fn route_length_km(area_m2: f64, is_linear: bool, explicit_km: Option<f64>) -> f64 {
    if is_linear {
        if let Some(km) = explicit_km {
            return round_km(km);
        }
        return round_km(area_m2 / CORRIDOR_WIDTH_M / 1000.0);
    }
    round_km(2.0 * (PI * area_m2).sqrt() / 1000.0)
}

/// Number of observation points for a site of the given area.
pub fn observation_point_count(area_ha: f64) -> u32 {
    let points = (area_ha / HA_PER_OBSERVATION_POINT).ceil() as u32;
    points.max(1)
}

/// Resolve the working area in hectares from whatever a source stated,
/// degrading to the documented default.
pub fn resolve_area_ha(area_m2: Option<f64>) -> f64 {
    area_m2.map(|m2| m2 / 10_000.0).unwrap_or(DEFAULT_AREA_HA)
}
