//! Engine configuration
//!
//! Every tunable constant of the engine lives here. All of them are illustrative
//! defaults rather than measured values, so each section is `#[serde(default)]` and a
//! partial JSON document overrides only the keys it names:
//!
//! ```
//! use flood_risk_core::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "scenarios": { "high_emissions": 1.8 } }"#).unwrap();
//! assert_eq!(config.scenarios.high_emissions, 1.8);
//! assert_eq!(config.scenarios.moderate, 1.25);
//! assert_eq!(config.fitting.min_samples, 10);
//! ```

use crate::core_types::{Coordinates, ReturnPeriod, ScenarioMultipliers};
use crate::damage::exposure::DEFAULT_UNCERTAINTY_STD;
use crate::damage::{BuildingType, ValuationBasis};
use crate::error::{FloodRiskError, Result};
use crate::hazard::EventThresholds;
use crate::validation::DEFAULT_MAX_FLOOD_DEPTH_M;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fitting: FittingConfig,
    pub validation: ValidationConfig,
    pub scenarios: ScenarioMultipliers,
    pub location_risk: LocationRiskConfig,
    pub damage: DamageConfig,
    pub events: EventConfig,
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON document and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] when the document is malformed or a
    /// value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        if !config.scenarios.is_default() {
            warn!(
                scenarios = ?config.scenarios,
                "Scenario multipliers overridden by configuration"
            );
        }
        Ok(config)
    }

    /// Check every section for internally consistent values.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.fitting.validate()?;
        self.scenarios.validate()?;
        self.location_risk.validate()?;
        self.damage.validate()?;
        self.events.validate()?;
        if !(self.validation.max_flood_depth_m.is_finite() && self.validation.max_flood_depth_m > 0.0) {
            return Err(FloodRiskError::InvalidConfig(format!(
                "validation.max_flood_depth_m must be positive, got {}",
                self.validation.max_flood_depth_m
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> FloodRiskError {
    FloodRiskError::InvalidConfig(message)
}

// ============================================================================
// FITTING
// ============================================================================

/// GEV fitting and return-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FittingConfig {
    /// Fewest samples accepted by the fitter
    pub min_samples: usize,
    /// Nelder-Mead iteration cap
    pub max_iterations: usize,
    /// Relative tolerance on the negative log-likelihood spread of the simplex
    pub tolerance: f64,
    /// Half-width of the fixed confidence band around a return level, as a fraction
    pub confidence_band: f64,
    /// KS p-value above which a fit is classified as good
    pub good_fit_p_value: f64,
}

impl Default for FittingConfig {
    fn default() -> Self {
        Self {
            min_samples: 10,
            max_iterations: 5000,
            tolerance: 1e-10,
            confidence_band: 0.20,
            good_fit_p_value: 0.05,
        }
    }
}

impl FittingConfig {
    fn validate(&self) -> Result<()> {
        if self.min_samples < 3 {
            return Err(invalid(format!(
                "fitting.min_samples must be at least 3 for a three-parameter fit, got {}",
                self.min_samples
            )));
        }
        if self.max_iterations == 0 {
            return Err(invalid("fitting.max_iterations must be positive".into()));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(invalid(format!(
                "fitting.tolerance must be in (0, 1), got {}",
                self.tolerance
            )));
        }
        if !(0.0..1.0).contains(&self.confidence_band) {
            return Err(invalid(format!(
                "fitting.confidence_band must be in [0, 1), got {}",
                self.confidence_band
            )));
        }
        if !(0.0..=1.0).contains(&self.good_fit_p_value) {
            return Err(invalid(format!(
                "fitting.good_fit_p_value must be in [0, 1], got {}",
                self.good_fit_p_value
            )));
        }
        Ok(())
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Deepest flood accepted as plausible input, meters
    pub max_flood_depth_m: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_flood_depth_m: DEFAULT_MAX_FLOOD_DEPTH_M,
        }
    }
}

// ============================================================================
// LOCATION RISK
// ============================================================================

/// Per-location intensity multipliers and default return-period sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRiskConfig {
    /// Name identifying the whole-country aggregate location
    pub country_level_name: String,
    /// Multiplier for the whole-country aggregate
    pub country_multiplier: f64,
    /// Named-location multipliers
    pub multipliers: FxHashMap<String, f64>,
    /// Multiplier for locations absent from `multipliers`
    pub default_multiplier: f64,
    /// Locations that get the higher-frequency return-period set
    pub high_risk_locations: Vec<String>,
    pub high_risk_return_periods: Vec<ReturnPeriod>,
    pub default_return_periods: Vec<ReturnPeriod>,
    /// Known coordinates for named locations
    pub coordinates: FxHashMap<String, Coordinates>,
    /// Standard deviation of multiplicative noise on simulated intensities; 0 disables it
    pub intensity_noise_std: f64,
    /// Seed for the simulated-intensity noise
    pub seed: u64,
    /// Lowest intensity a hazard curve may report, meters
    pub intensity_floor_m: f64,
}

const NAMED_LOCATIONS: [(&str, f64, f64, f64); 10] = [
    // name, multiplier, latitude, longitude
    ("Malaysia (Country)", 0.85, 4.2105, 101.9758),
    ("Kelantan", 1.35, 6.1256, 102.2381),
    ("Terengganu", 1.30, 5.3117, 103.1324),
    ("Pahang", 1.25, 3.8126, 103.3256),
    ("Johor", 1.15, 1.4854, 103.7618),
    ("Selangor", 1.10, 3.0738, 101.5183),
    ("Perak", 1.05, 4.5921, 101.0901),
    ("Penang", 1.0, 5.4164, 100.3327),
    ("Sabah", 1.0, 5.9788, 116.0753),
    ("Sarawak", 1.0, 1.5533, 110.3593),
];

fn periods(years: &[u32]) -> Vec<ReturnPeriod> {
    years
        .iter()
        .filter_map(|&y| ReturnPeriod::new(y).ok())
        .collect()
}

impl Default for LocationRiskConfig {
    fn default() -> Self {
        let country_level_name = NAMED_LOCATIONS[0].0.to_string();
        let multipliers = NAMED_LOCATIONS
            .iter()
            .skip(1)
            .map(|&(name, m, _, _)| (name.to_string(), m))
            .collect();
        let coordinates = NAMED_LOCATIONS
            .iter()
            .map(|&(name, _, lat, lon)| (name.to_string(), Coordinates::new_unchecked(lat, lon)))
            .collect();
        Self {
            country_level_name,
            country_multiplier: NAMED_LOCATIONS[0].1,
            multipliers,
            default_multiplier: 1.0,
            high_risk_locations: vec![
                "Kelantan".to_string(),
                "Terengganu".to_string(),
                "Pahang".to_string(),
            ],
            high_risk_return_periods: periods(&[5, 10, 25, 50, 100]),
            default_return_periods: periods(&[10, 25, 50, 100, 250]),
            coordinates,
            intensity_noise_std: 0.0,
            seed: 42,
            intensity_floor_m: 0.1,
        }
    }
}

impl LocationRiskConfig {
    /// Intensity multiplier for a named location.
    pub fn multiplier(&self, location: &str) -> f64 {
        if location == self.country_level_name {
            return self.country_multiplier;
        }
        self.multipliers
            .get(location)
            .copied()
            .unwrap_or(self.default_multiplier)
    }

    pub fn is_high_risk(&self, location: &str) -> bool {
        self.high_risk_locations.iter().any(|l| l == location)
    }

    /// Return periods analysed when the caller names none.
    ///
    /// High-risk locations get the higher-frequency set.
    pub fn default_return_periods(&self, location: &str) -> &[ReturnPeriod] {
        if self.is_high_risk(location) {
            &self.high_risk_return_periods
        } else {
            &self.default_return_periods
        }
    }

    fn validate(&self) -> Result<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(invalid(format!("location_risk.{name} must be positive, got {value}")))
            }
        };
        positive("country_multiplier", self.country_multiplier)?;
        positive("default_multiplier", self.default_multiplier)?;
        positive("intensity_floor_m", self.intensity_floor_m)?;
        for (name, &m) in &self.multipliers {
            positive(&format!("multipliers[{name}]"), m)?;
        }
        if self.high_risk_return_periods.is_empty() || self.default_return_periods.is_empty() {
            return Err(invalid(
                "location_risk return-period sets must not be empty".into(),
            ));
        }
        if !(self.intensity_noise_std >= 0.0 && self.intensity_noise_std.is_finite()) {
            return Err(invalid(format!(
                "location_risk.intensity_noise_std must be non-negative, got {}",
                self.intensity_noise_std
            )));
        }
        Ok(())
    }
}

// ============================================================================
// DAMAGE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageConfig {
    /// Affected area when a request omits it, m²
    pub default_area_m2: f64,
    /// Building type when a request omits it
    pub default_building_type: BuildingType,
    /// Relative standard deviation for building types missing from the uncertainty table
    pub default_uncertainty: f64,
    /// Slope of the last-resort linear damage curve, ratio per meter
    pub flat_fallback_rate: f64,
    pub valuation_basis: ValuationBasis,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            default_area_m2: 100.0,
            default_building_type: BuildingType::Residential,
            default_uncertainty: DEFAULT_UNCERTAINTY_STD,
            flat_fallback_rate: 0.30,
            valuation_basis: ValuationBasis::GdpAdjusted,
        }
    }
}

impl DamageConfig {
    fn validate(&self) -> Result<()> {
        if !(self.default_area_m2.is_finite() && self.default_area_m2 > 0.0) {
            return Err(invalid(format!(
                "damage.default_area_m2 must be positive, got {}",
                self.default_area_m2
            )));
        }
        if !(self.default_uncertainty >= 0.0 && self.default_uncertainty.is_finite()) {
            return Err(invalid(format!(
                "damage.default_uncertainty must be non-negative, got {}",
                self.default_uncertainty
            )));
        }
        if !(self.flat_fallback_rate > 0.0 && self.flat_fallback_rate.is_finite()) {
            return Err(invalid(format!(
                "damage.flat_fallback_rate must be positive, got {}",
                self.flat_fallback_rate
            )));
        }
        Ok(())
    }
}

// ============================================================================
// EVENTS
// ============================================================================

/// Event-probability thresholds and trend classification settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub thresholds: EventThresholds,
    /// Slope magnitude (events per year) separating a trend from "stable"
    pub trend_slope_threshold: f64,
    /// R² above which trend confidence is high
    pub high_confidence_r2: f64,
    /// R² above which trend confidence is medium
    pub medium_confidence_r2: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            thresholds: EventThresholds::default(),
            trend_slope_threshold: 0.5,
            high_confidence_r2: 0.7,
            medium_confidence_r2: 0.4,
        }
    }
}

impl EventConfig {
    fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;
        if !(self.trend_slope_threshold.is_finite() && self.trend_slope_threshold >= 0.0) {
            return Err(invalid(format!(
                "events.trend_slope_threshold must be non-negative, got {}",
                self.trend_slope_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.medium_confidence_r2)
            || !(0.0..=1.0).contains(&self.high_confidence_r2)
            || self.medium_confidence_r2 > self.high_confidence_r2
        {
            return Err(invalid(format!(
                "events R² thresholds must satisfy 0 <= medium ({}) <= high ({}) <= 1",
                self.medium_confidence_r2, self.high_confidence_r2
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.location_risk.multipliers["Kelantan"], 1.35);
        assert_eq!(config.location_risk.country_multiplier, 0.85);
        assert_eq!(config.location_risk.coordinates.len(), 10);
        let years: Vec<u32> = config
            .location_risk
            .high_risk_return_periods
            .iter()
            .map(|rp| rp.years())
            .collect();
        assert_eq!(years, vec![5, 10, 25, 50, 100]);
    }

    #[test]
    fn test_location_risk_lookup() {
        let risk = LocationRiskConfig::default();
        assert_eq!(risk.multiplier("Malaysia (Country)"), 0.85);
        assert_eq!(risk.multiplier("Terengganu"), 1.30);
        assert_eq!(risk.multiplier("Atlantis"), 1.0);
        assert!(risk.is_high_risk("Pahang"));
        assert!(!risk.is_high_risk("Johor"));
        assert_eq!(risk.default_return_periods("Johor").len(), 5);
        assert_eq!(risk.default_return_periods("Johor")[4].years(), 250);
        assert_eq!(risk.default_return_periods("Kelantan")[0].years(), 5);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_json_str(
            r#"{ "fitting": { "min_samples": 20 }, "damage": { "default_area_m2": 250.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.fitting.min_samples, 20);
        assert_eq!(config.fitting.confidence_band, 0.20);
        assert_eq!(config.damage.default_area_m2, 250.0);
        assert_eq!(config.damage.default_building_type, BuildingType::Residential);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for doc in [
            r#"{ "scenarios": { "moderate": -1.0 } }"#,
            r#"{ "fitting": { "min_samples": 1 } }"#,
            r#"{ "validation": { "max_flood_depth_m": 0.0 } }"#,
            r#"{ "location_risk": { "default_return_periods": [] } }"#,
            r#"{ "location_risk": { "default_return_periods": [0] } }"#,
            r#"{ "events": { "high_confidence_r2": 0.2 } }"#,
            "not json",
        ] {
            let err = EngineConfig::from_json_str(doc).unwrap_err();
            assert!(
                matches!(err, FloodRiskError::InvalidConfig(_)),
                "{doc} should be rejected as config, got {err:?}"
            );
        }
    }
}
