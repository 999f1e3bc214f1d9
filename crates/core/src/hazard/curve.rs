//! Return-period hazard curves per location and climate scenario
//!
//! Two strategies produce a curve:
//! - **Simulated**: `0.5·log10(T)` scaled by a location multiplier.
//! - **Fitted**: `rainfall_level/100 + log10(discharge_level)/5` from GEV return levels.
//!
//! Both floor the pre-scenario intensity at a minimum depth and then apply the
//! scenario multiplier, so re-scaling a curve between scenarios is an exact ratio of
//! multipliers.

use crate::config::LocationRiskConfig;
use crate::core_types::{ClimateScenario, Meters, ReturnPeriod, ScenarioMultipliers};
use crate::error::{FloodRiskError, Result};
use crate::hazard::return_levels::ReturnLevelTable;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use tracing::info;

/// Where a curve's intensities came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveSource {
    Simulated,
    Fitted,
    /// Supplied directly by the caller
    External,
}

/// One return period of a [`HazardCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HazardCurveRow {
    pub return_period: ReturnPeriod,
    /// Flood intensity under the curve's scenario
    pub intensity: Meters,
    /// Exactly `1 / return_period`
    pub annual_probability: f64,
    /// Floored intensity before the scenario multiplier
    pub baseline_intensity: Meters,
}

/// Return period → flood intensity mapping, sorted ascending by period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HazardCurve {
    pub location: String,
    pub scenario: ClimateScenario,
    pub source: CurveSource,
    pub scenario_multiplier: f64,
    pub location_multiplier: f64,
    rows: Vec<HazardCurveRow>,
}

impl HazardCurve {
    /// Curve from caller-supplied `(return period, intensity)` pairs, taken as
    /// historical-climate intensities.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::Validation`] for an empty list or a repeated period.
    pub fn from_rows(
        location: impl Into<String>,
        rows: impl IntoIterator<Item = (ReturnPeriod, Meters)>,
    ) -> Result<Self> {
        let mut pairs: Vec<(ReturnPeriod, Meters)> = rows.into_iter().collect();
        let periods: Vec<ReturnPeriod> = pairs.iter().map(|(rp, _)| *rp).collect();
        check_periods(&periods)?;
        pairs.sort_unstable_by_key(|(rp, _)| *rp);
        Ok(Self {
            location: location.into(),
            scenario: ClimateScenario::Historical,
            source: CurveSource::External,
            scenario_multiplier: 1.0,
            location_multiplier: 1.0,
            rows: pairs
                .into_iter()
                .map(|(return_period, intensity)| HazardCurveRow {
                    return_period,
                    intensity,
                    annual_probability: return_period.annual_probability(),
                    baseline_intensity: intensity,
                })
                .collect(),
        })
    }

    pub fn rows(&self) -> &[HazardCurveRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn intensity_at(&self, return_period: ReturnPeriod) -> Option<Meters> {
        self.rows
            .iter()
            .find(|row| row.return_period == return_period)
            .map(|row| row.intensity)
    }

    /// The same curve under another scenario.
    ///
    /// Intensities become `baseline × multiplier(target)`.
    pub fn rescale(&self, target: ClimateScenario, multipliers: &ScenarioMultipliers) -> Self {
        let factor = multipliers.get(target);
        Self {
            location: self.location.clone(),
            scenario: target,
            source: self.source,
            scenario_multiplier: factor,
            location_multiplier: self.location_multiplier,
            rows: self
                .rows
                .iter()
                .map(|row| HazardCurveRow {
                    intensity: row.baseline_intensity * factor,
                    ..*row
                })
                .collect(),
        }
    }
}

/// Sorted-unique check shared by every curve constructor.
fn check_periods(periods: &[ReturnPeriod]) -> Result<Vec<ReturnPeriod>> {
    if periods.is_empty() {
        return Err(FloodRiskError::validation(
            "return_periods",
            "at least one return period is required",
        ));
    }
    let mut sorted = periods.to_vec();
    sorted.sort_unstable();
    if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(FloodRiskError::validation(
            "return_periods",
            format!("duplicate return period {}", pair[0]),
        ));
    }
    Ok(sorted)
}

/// Intensity source for [`HazardCurveBuilder::build`].
#[derive(Debug, Clone, Copy)]
pub enum HazardSource<'a> {
    Simulated,
    /// GEV return levels of rainfall (mm) and discharge (m³/s), covering every
    /// requested period
    Fitted {
        rainfall: &'a ReturnLevelTable,
        discharge: &'a ReturnLevelTable,
    },
}

/// Intensity of one location's T-year event under one scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioComparison {
    pub scenario: ClimateScenario,
    pub intensity: Meters,
    /// Percent change relative to the historical scenario
    pub change_pct: f64,
}

/// Builds hazard curves from the location risk table and scenario multipliers.
#[derive(Debug, Clone, Copy)]
pub struct HazardCurveBuilder<'a> {
    risk: &'a LocationRiskConfig,
    scenarios: &'a ScenarioMultipliers,
}

impl<'a> HazardCurveBuilder<'a> {
    pub fn new(risk: &'a LocationRiskConfig, scenarios: &'a ScenarioMultipliers) -> Self {
        Self { risk, scenarios }
    }

    /// Build the curve for `location` under `scenario`.
    ///
    /// Without explicit `return_periods` the location's tiered default set is used.
    ///
    /// # Errors
    ///
    /// - [`FloodRiskError::Validation`] for an empty or duplicated period list
    /// - [`FloodRiskError::DataNotFound`] when a fitted table lacks a requested period
    pub fn build(
        &self,
        location: &str,
        scenario: ClimateScenario,
        return_periods: Option<&[ReturnPeriod]>,
        source: HazardSource<'_>,
    ) -> Result<HazardCurve> {
        let periods =
            check_periods(return_periods.unwrap_or_else(|| self.risk.default_return_periods(location)))?;
        let floor = self.risk.intensity_floor_m;
        let scenario_multiplier = self.scenarios.get(scenario);

        let (source_kind, location_multiplier, baselines) = match source {
            HazardSource::Simulated => {
                let multiplier = self.risk.multiplier(location);
                (CurveSource::Simulated, multiplier, self.simulated(&periods, multiplier)?)
            }
            HazardSource::Fitted {
                rainfall,
                discharge,
            } => (CurveSource::Fitted, 1.0, fitted(&periods, rainfall, discharge)?),
        };

        let rows: Vec<HazardCurveRow> = periods
            .iter()
            .zip(baselines)
            .map(|(&return_period, raw)| {
                let baseline_intensity = Meters::new(raw.max(floor));
                HazardCurveRow {
                    return_period,
                    intensity: baseline_intensity * scenario_multiplier,
                    annual_probability: return_period.annual_probability(),
                    baseline_intensity,
                }
            })
            .collect();

        info!(
            location,
            %scenario,
            source = ?source_kind,
            rows = rows.len(),
            "Built hazard curve"
        );
        Ok(HazardCurve {
            location: location.to_string(),
            scenario,
            source: source_kind,
            scenario_multiplier,
            location_multiplier,
            rows,
        })
    }

    /// `0.5·log10(T)` plus optional seeded noise, times the location multiplier.
    fn simulated(&self, periods: &[ReturnPeriod], multiplier: f64) -> Result<Vec<f64>> {
        let base = periods
            .iter()
            .map(|rp| 0.5 * f64::from(rp.years()).log10());
        if self.risk.intensity_noise_std == 0.0 {
            return Ok(base.map(|b| b * multiplier).collect());
        }
        let noise = Normal::new(0.0, self.risk.intensity_noise_std).map_err(|e| {
            FloodRiskError::InvalidConfig(format!("intensity noise: {e}"))
        })?;
        let mut rng = StdRng::seed_from_u64(self.risk.seed);
        Ok(base
            .map(|b| (b + noise.sample(&mut rng)) * multiplier)
            .collect())
    }

    /// Intensity of the `return_period` event of `location` under every scenario.
    ///
    /// # Errors
    ///
    /// Same as [`HazardCurveBuilder::build`] with the simulated strategy.
    pub fn compare_scenarios(
        &self,
        location: &str,
        return_period: ReturnPeriod,
    ) -> Result<Vec<ScenarioComparison>> {
        let historical = self.build(
            location,
            ClimateScenario::Historical,
            Some(&[return_period]),
            HazardSource::Simulated,
        )?;
        let Some(base) = historical.intensity_at(return_period) else {
            return Err(FloodRiskError::DataNotFound {
                table: "hazard curve",
                key: return_period.to_string(),
            });
        };
        let comparisons = ClimateScenario::ALL
            .into_iter()
            .filter_map(|scenario| {
                historical
                    .rescale(scenario, self.scenarios)
                    .intensity_at(return_period)
                    .map(|intensity| ScenarioComparison {
                        scenario,
                        intensity,
                        change_pct: (intensity.value() - base.value()) / base.value() * 100.0,
                    })
            })
            .collect();
        Ok(comparisons)
    }
}

/// `rainfall/100 + log10(discharge)/5`; a non-positive discharge level leaves only the floor.
fn fitted(
    periods: &[ReturnPeriod],
    rainfall: &ReturnLevelTable,
    discharge: &ReturnLevelTable,
) -> Result<Vec<f64>> {
    periods
        .iter()
        .map(|&rp| {
            let rain = rainfall.get(rp).ok_or_else(|| FloodRiskError::DataNotFound {
                table: "rainfall return levels",
                key: rp.to_string(),
            })?;
            let flow = discharge.get(rp).ok_or_else(|| FloodRiskError::DataNotFound {
                table: "discharge return levels",
                key: rp.to_string(),
            })?;
            if flow.magnitude <= 0.0 {
                return Ok(0.0);
            }
            Ok(rain.magnitude / 100.0 + flow.magnitude.log10() / 5.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazard::gev::GevDistribution;
    use crate::hazard::return_levels::calculate_return_levels;
    use approx::assert_relative_eq;

    fn periods(years: &[u32]) -> Vec<ReturnPeriod> {
        ReturnPeriod::from_years(years).unwrap()
    }

    #[test]
    fn test_simulated_intensity() {
        let risk = LocationRiskConfig::default();
        let scenarios = ScenarioMultipliers::default();
        let builder = HazardCurveBuilder::new(&risk, &scenarios);
        let curve = builder
            .build("Kelantan", ClimateScenario::Historical, None, HazardSource::Simulated)
            .unwrap();

        let years: Vec<u32> = curve.rows().iter().map(|r| r.return_period.years()).collect();
        assert_eq!(years, vec![5, 10, 25, 50, 100]);
        let hundred = curve.intensity_at(ReturnPeriod::new(100).unwrap()).unwrap();
        assert_relative_eq!(hundred.value(), 0.5 * 2.0 * 1.35, epsilon = 1e-12);
        for row in curve.rows() {
            assert_eq!(row.annual_probability, 1.0 / f64::from(row.return_period.years()));
        }
    }

    #[test]
    fn test_floor_applies_before_scenario() {
        let risk = LocationRiskConfig::default();
        let scenarios = ScenarioMultipliers::default();
        let builder = HazardCurveBuilder::new(&risk, &scenarios);
        // 0.5·log10(1) = 0, floored to 0.1 then scaled
        let curve = builder
            .build(
                "Johor",
                ClimateScenario::HighEmissions,
                Some(&periods(&[1])),
                HazardSource::Simulated,
            )
            .unwrap();
        assert_relative_eq!(curve.rows()[0].intensity.value(), 0.1 * 1.5);
    }

    #[test]
    fn test_rescale_historical_to_high_emissions_is_exact() {
        let risk = LocationRiskConfig::default();
        let scenarios = ScenarioMultipliers::default();
        let builder = HazardCurveBuilder::new(&risk, &scenarios);
        let historical = builder
            .build("Selangor", ClimateScenario::Historical, None, HazardSource::Simulated)
            .unwrap();
        let rescaled = historical.rescale(ClimateScenario::HighEmissions, &scenarios);
        let direct = builder
            .build("Selangor", ClimateScenario::HighEmissions, None, HazardSource::Simulated)
            .unwrap();
        for ((h, r), d) in historical.rows().iter().zip(rescaled.rows()).zip(direct.rows()) {
            assert_eq!(r.intensity.value(), h.intensity.value() * 1.5);
            assert_eq!(r.intensity, d.intensity);
        }
    }

    #[test]
    fn test_noise_is_seeded() {
        let risk = LocationRiskConfig {
            intensity_noise_std: 0.2,
            ..LocationRiskConfig::default()
        };
        let scenarios = ScenarioMultipliers::default();
        let builder = HazardCurveBuilder::new(&risk, &scenarios);
        let a = builder
            .build("Perak", ClimateScenario::Moderate, None, HazardSource::Simulated)
            .unwrap();
        let b = builder
            .build("Perak", ClimateScenario::Moderate, None, HazardSource::Simulated)
            .unwrap();
        assert_eq!(a, b);
        assert!(a.rows().iter().all(|r| r.baseline_intensity.value() >= 0.1));
    }

    #[test]
    fn test_fitted_strategy() {
        let risk = LocationRiskConfig::default();
        let scenarios = ScenarioMultipliers::default();
        let builder = HazardCurveBuilder::new(&risk, &scenarios);
        let rps = periods(&[10, 100]);
        let rain = calculate_return_levels(
            &GevDistribution::new(0.0, 150.0, 30.0).unwrap(),
            &rps,
            0.2,
        )
        .unwrap();
        let flow = calculate_return_levels(
            &GevDistribution::new(0.0, 100.0, 20.0).unwrap(),
            &rps,
            0.2,
        )
        .unwrap();
        let curve = builder
            .build(
                "Pahang",
                ClimateScenario::Moderate,
                Some(&rps),
                HazardSource::Fitted {
                    rainfall: &rain,
                    discharge: &flow,
                },
            )
            .unwrap();
        for (row, (r, q)) in curve.rows().iter().zip(rain.rows().iter().zip(flow.rows())) {
            let expected = (r.magnitude / 100.0 + q.magnitude.log10() / 5.0).max(0.1) * 1.25;
            assert_relative_eq!(row.intensity.value(), expected, epsilon = 1e-12);
        }
        assert_eq!(curve.source, CurveSource::Fitted);

        let missing = builder.build(
            "Pahang",
            ClimateScenario::Moderate,
            Some(&periods(&[10, 250])),
            HazardSource::Fitted {
                rainfall: &rain,
                discharge: &flow,
            },
        );
        assert!(matches!(missing, Err(FloodRiskError::DataNotFound { .. })));
    }

    #[test]
    fn test_compare_scenarios() {
        let risk = LocationRiskConfig::default();
        let scenarios = ScenarioMultipliers::default();
        let builder = HazardCurveBuilder::new(&risk, &scenarios);
        let rows = builder
            .compare_scenarios("Kelantan", ReturnPeriod::new(100).unwrap())
            .unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].change_pct, 0.0);
        assert_relative_eq!(rows[4].change_pct, 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_external_rows() {
        let curve = HazardCurve::from_rows(
            "site",
            [
                (ReturnPeriod::new(100).unwrap(), Meters::new(2.0)),
                (ReturnPeriod::new(10).unwrap(), Meters::new(0.5)),
            ],
        )
        .unwrap();
        assert_eq!(curve.rows()[0].return_period.years(), 10);
        assert_eq!(curve.source, CurveSource::External);
        assert!(HazardCurve::from_rows("site", Vec::<(ReturnPeriod, Meters)>::new()).is_err());
    }
}
