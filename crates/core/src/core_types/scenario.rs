//! Climate scenarios and their hazard-intensity multipliers

use crate::error::{FloodRiskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Climate scenario from the fixed enumerated set.
///
/// The representative concentration pathway identifiers used by hazard datasets
/// (`rcp26`, `rcp45`, `rcp60`, `rcp85`) parse to the matching scenario.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ClimateScenario {
    #[default]
    Historical,
    #[serde(alias = "rcp26")]
    LowMitigation,
    #[serde(alias = "rcp45")]
    Moderate,
    #[serde(alias = "rcp60")]
    MediumHigh,
    #[serde(alias = "rcp85")]
    HighEmissions,
}

impl ClimateScenario {
    /// Every scenario, ordered by increasing forcing
    pub const ALL: [ClimateScenario; 5] = [
        ClimateScenario::Historical,
        ClimateScenario::LowMitigation,
        ClimateScenario::Moderate,
        ClimateScenario::MediumHigh,
        ClimateScenario::HighEmissions,
    ];

    /// Canonical identifier
    pub const fn id(self) -> &'static str {
        match self {
            ClimateScenario::Historical => "historical",
            ClimateScenario::LowMitigation => "low-mitigation",
            ClimateScenario::Moderate => "moderate",
            ClimateScenario::MediumHigh => "medium-high",
            ClimateScenario::HighEmissions => "high-emissions",
        }
    }

    /// Built-in intensity multiplier
    pub const fn default_multiplier(self) -> f64 {
        match self {
            ClimateScenario::Historical => 1.0,
            ClimateScenario::LowMitigation => 1.1,
            ClimateScenario::Moderate => 1.25,
            ClimateScenario::MediumHigh => 1.35,
            ClimateScenario::HighEmissions => 1.5,
        }
    }
}

impl FromStr for ClimateScenario {
    type Err = FloodRiskError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let scenario = match normalized.as_str() {
            "historical" => ClimateScenario::Historical,
            "low-mitigation" | "rcp26" => ClimateScenario::LowMitigation,
            "moderate" | "rcp45" => ClimateScenario::Moderate,
            "medium-high" | "rcp60" => ClimateScenario::MediumHigh,
            "high-emissions" | "rcp85" => ClimateScenario::HighEmissions,
            _ => {
                return Err(FloodRiskError::validation(
                    "scenario",
                    format!(
                        "unknown scenario '{s}', expected one of historical, low-mitigation, \
                         moderate, medium-high, high-emissions"
                    ),
                ))
            }
        };
        Ok(scenario)
    }
}

impl fmt::Display for ClimateScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Scenario → intensity multiplier table.
///
/// The defaults are illustrative constants; deployments override them through
/// [`crate::EngineConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioMultipliers {
    pub historical: f64,
    pub low_mitigation: f64,
    pub moderate: f64,
    pub medium_high: f64,
    pub high_emissions: f64,
}

impl Default for ScenarioMultipliers {
    fn default() -> Self {
        Self {
            historical: ClimateScenario::Historical.default_multiplier(),
            low_mitigation: ClimateScenario::LowMitigation.default_multiplier(),
            moderate: ClimateScenario::Moderate.default_multiplier(),
            medium_high: ClimateScenario::MediumHigh.default_multiplier(),
            high_emissions: ClimateScenario::HighEmissions.default_multiplier(),
        }
    }
}

impl ScenarioMultipliers {
    /// Multiplier applied to intensities under `scenario`
    pub fn get(&self, scenario: ClimateScenario) -> f64 {
        match scenario {
            ClimateScenario::Historical => self.historical,
            ClimateScenario::LowMitigation => self.low_mitigation,
            ClimateScenario::Moderate => self.moderate,
            ClimateScenario::MediumHigh => self.medium_high,
            ClimateScenario::HighEmissions => self.high_emissions,
        }
    }

    /// Check every multiplier is finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] naming the first bad scenario.
    pub fn validate(&self) -> Result<()> {
        for scenario in ClimateScenario::ALL {
            let m = self.get(scenario);
            if !m.is_finite() || m <= 0.0 {
                return Err(FloodRiskError::InvalidConfig(format!(
                    "scenario multiplier for {scenario} must be positive, got {m}"
                )));
            }
        }
        Ok(())
    }

    /// Whether any entry differs from the built-in table
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
