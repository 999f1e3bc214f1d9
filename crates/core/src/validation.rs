//! Input validation run before any computation
//!
//! Violations are always surfaced as [`FloodRiskError::Validation`]; nothing here
//! silently clamps or corrects a value.

use crate::core_types::{Coordinates, Meters};
use crate::error::{FloodRiskError, Result};

/// Default upper bound for a plausible flood depth in meters.
pub const DEFAULT_MAX_FLOOD_DEPTH_M: f64 = 20.0;

/// Check latitude ∈ [-90, 90] and longitude ∈ [-180, 180].
///
/// # Errors
///
/// Returns [`FloodRiskError::Validation`] naming `latitude` or `longitude` when a value
/// is non-finite or out of range.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<Coordinates> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(FloodRiskError::validation(
            "latitude",
            format!("{latitude} outside valid range [-90, 90]"),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(FloodRiskError::validation(
            "longitude",
            format!("{longitude} outside valid range [-180, 180]"),
        ));
    }
    Ok(Coordinates::new_unchecked(latitude, longitude))
}

/// Check a flood depth is non-negative and no deeper than `max_depth_m`.
///
/// # Errors
///
/// Returns [`FloodRiskError::Validation`] for negative, non-finite or implausibly deep values.
pub fn validate_flood_depth(depth_m: f64, max_depth_m: f64) -> Result<Meters> {
    if !depth_m.is_finite() {
        return Err(FloodRiskError::validation(
            "flood_depth",
            format!("must be a finite number, got {depth_m}"),
        ));
    }
    if depth_m < 0.0 {
        return Err(FloodRiskError::validation(
            "flood_depth",
            format!("cannot be negative, got {depth_m}"),
        ));
    }
    if depth_m > max_depth_m {
        return Err(FloodRiskError::validation(
            "flood_depth",
            format!("{depth_m} m exceeds plausible maximum of {max_depth_m} m"),
        ));
    }
    Ok(Meters::new(depth_m))
}

/// Check an affected area is a positive number of square meters.
///
/// # Errors
///
/// Returns [`FloodRiskError::Validation`] for zero, negative or non-finite areas.
pub fn validate_area(area_m2: f64) -> Result<f64> {
    if !area_m2.is_finite() || area_m2 <= 0.0 {
        return Err(FloodRiskError::validation(
            "area_m2",
            format!("must be a positive number, got {area_m2}"),
        ));
    }
    Ok(area_m2)
}

/// Check a per-m² valuation is a positive amount.
///
/// # Errors
///
/// Returns [`FloodRiskError::Validation`] for zero, negative or non-finite values.
pub fn validate_value_per_m2(value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(FloodRiskError::validation(
            "value_per_m2",
            format!("must be a positive amount, got {value}"),
        ));
    }
    Ok(value)
}

/// Unwrap a required field, reporting its name when absent.
///
/// # Errors
///
/// Returns [`FloodRiskError::Validation`] when `value` is `None`.
pub fn require<T>(value: Option<T>, field: &'static str) -> Result<T> {
    value.ok_or_else(|| FloodRiskError::validation(field, "required field is missing"))
}
