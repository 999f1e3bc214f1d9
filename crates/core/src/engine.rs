//! Stateless facade over the hazard, damage and impact computations
//!
//! [`FloodRiskEngine`] holds only read-only state (configuration, reference tables
//! and a country resolver) behind `Arc`s, so one engine can be cloned cheaply and
//! shared across threads. Every operation takes its data as explicit arguments.

use crate::batch::{run_batch, BatchItem};
use crate::config::EngineConfig;
use crate::core_types::{ClimateScenario, MonthFilter, Region, ReturnPeriod, TimeSeries};
use crate::damage::{
    BoundingBoxResolver, BuildingType, CountryResolver, DamageCalculator, DamageCurve,
    DamageRequest, DamageResult, DamageSummary, LocationExposure,
};
use crate::error::{FloodRiskError, Result};
use crate::hazard::{
    calculate_return_levels, generate_sample_rainfall, probability, return_period_probability,
    seasonal_probability, trend_from_series, EventCounts, EventKind, GevFitter, GevParameters,
    HazardCurve, HazardCurveBuilder, HazardSource, HistoricalSeries, HistoricalSeriesGenerator,
    ReturnLevelTable, SampleRegion, ScenarioComparison, SeasonalProbability, TrendOutcome,
};
use crate::reference::ReferenceData;
use crate::risk::{calculate_eai, linear_impact_curve, EaiResult};
use crate::validation::require;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// GEV fit plus the return levels derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FittedReturnLevels {
    pub parameters: GevParameters,
    pub return_levels: ReturnLevelTable,
}

/// How [`FloodRiskEngine::build_hazard_curve`] obtains intensities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardStrategy {
    /// Log-scaled return period times the location multiplier
    Simulated,
    /// GEV fits of `years` of synthetic rainfall and discharge ending on `end`
    Fitted { years: u32, end: NaiveDate },
}

/// Input of one location-level expected-annual-impact calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EaiRequest {
    pub location: String,
    #[serde(default)]
    pub scenario: ClimateScenario,
    /// Defaults to the location's tiered return-period set
    #[serde(default)]
    pub return_periods: Option<Vec<ReturnPeriod>>,
    /// Exposure in USD; apportioned from the country total when absent
    #[serde(default)]
    pub exposure: Option<f64>,
    /// ISO alpha-3 code of the exposure table, required when `exposure` is absent
    #[serde(default)]
    pub country_code: Option<String>,
    /// Uses a depth-damage function for this building type instead of the linear
    /// intensity curve
    #[serde(default)]
    pub building_type: Option<BuildingType>,
    #[serde(default)]
    pub include_uncertainty: bool,
}

impl EaiRequest {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            scenario: ClimateScenario::Historical,
            return_periods: None,
            exposure: None,
            country_code: None,
            building_type: None,
            include_uncertainty: false,
        }
    }
}

#[derive(Clone)]
pub struct FloodRiskEngine {
    config: Arc<EngineConfig>,
    reference: Arc<ReferenceData>,
    resolver: Arc<dyn CountryResolver>,
    fitter: GevFitter,
}

impl std::fmt::Debug for FloodRiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloodRiskEngine")
            .field("config", &self.config)
            .field("damage_functions", &self.reference.damage_functions.len())
            .finish_non_exhaustive()
    }
}

impl Default for FloodRiskEngine {
    fn default() -> Self {
        Self::from_parts(EngineConfig::default(), ReferenceData::builtin())
    }
}

impl FloodRiskEngine {
    /// Engine with built-in reference tables.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] when `config` fails validation.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_reference(config, ReferenceData::builtin())
    }

    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] when `config` fails validation.
    pub fn with_reference(config: EngineConfig, reference: ReferenceData) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, reference))
    }

    fn from_parts(config: EngineConfig, reference: ReferenceData) -> Self {
        info!(
            damage_functions = reference.damage_functions.len(),
            "Creating flood risk engine"
        );
        Self {
            fitter: GevFitter::new(config.fitting.clone()),
            config: Arc::new(config),
            reference: Arc::new(reference),
            resolver: Arc::new(BoundingBoxResolver::default()),
        }
    }

    /// Replace the coordinate → country resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn CountryResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    // ========================================================================
    // HAZARD
    // ========================================================================

    /// Fit a GEV distribution to annual maxima (or raw magnitudes).
    ///
    /// # Errors
    ///
    /// See [`GevFitter::fit`].
    pub fn fit(&self, annual_maxima: &[f64]) -> Result<GevParameters> {
        self.fitter.fit(annual_maxima)
    }

    /// Fit the annual maxima of `series` and evaluate the requested return levels.
    ///
    /// # Errors
    ///
    /// - [`FloodRiskError::InsufficientData`] with fewer years than the fit minimum
    /// - [`FloodRiskError::FitConvergence`] when the fit is unusable
    /// - [`FloodRiskError::Validation`] for an empty or duplicated period list
    pub fn fit_and_derive_return_levels(
        &self,
        series: &TimeSeries,
        return_periods: &[ReturnPeriod],
    ) -> Result<FittedReturnLevels> {
        let parameters = self.fitter.fit_series(series)?;
        let return_levels = calculate_return_levels(
            &parameters.distribution,
            return_periods,
            self.config.fitting.confidence_band,
        )?;
        Ok(FittedReturnLevels {
            parameters,
            return_levels,
        })
    }

    /// Hazard curve for a location under a scenario.
    ///
    /// # Errors
    ///
    /// - [`FloodRiskError::Validation`] for an empty or duplicated period list
    /// - fit errors of [`FloodRiskEngine::fit_and_derive_return_levels`] for the fitted
    ///   strategy
    pub fn build_hazard_curve(
        &self,
        location: &str,
        scenario: ClimateScenario,
        return_periods: Option<&[ReturnPeriod]>,
        strategy: HazardStrategy,
    ) -> Result<HazardCurve> {
        let builder = self.curve_builder();
        match strategy {
            HazardStrategy::Simulated => {
                builder.build(location, scenario, return_periods, HazardSource::Simulated)
            }
            HazardStrategy::Fitted { years, end } => {
                let periods = return_periods
                    .unwrap_or_else(|| self.config.location_risk.default_return_periods(location));
                let series = self.historical_series(location, years, end)?;
                let rainfall = self.fit_and_derive_return_levels(&series.rainfall, periods)?;
                let discharge = self.fit_and_derive_return_levels(&series.discharge, periods)?;
                builder.build(
                    location,
                    scenario,
                    Some(periods),
                    HazardSource::Fitted {
                        rainfall: &rainfall.return_levels,
                        discharge: &discharge.return_levels,
                    },
                )
            }
        }
    }

    /// `curve` under another scenario, using this engine's multipliers.
    pub fn rescale_hazard_curve(&self, curve: &HazardCurve, target: ClimateScenario) -> HazardCurve {
        curve.rescale(target, &self.config.scenarios)
    }

    /// Intensity of a location's `return_period` event under every scenario.
    ///
    /// # Errors
    ///
    /// See [`HazardCurveBuilder::compare_scenarios`].
    pub fn compare_scenarios(
        &self,
        location: &str,
        return_period: ReturnPeriod,
    ) -> Result<Vec<ScenarioComparison>> {
        self.curve_builder().compare_scenarios(location, return_period)
    }

    /// Synthetic rainfall and discharge series seeded from the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::Validation`] when `years` is zero.
    pub fn historical_series(
        &self,
        location: &str,
        years: u32,
        end: NaiveDate,
    ) -> Result<HistoricalSeries> {
        HistoricalSeriesGenerator::new(self.config.location_risk.seed).generate(location, years, end)
    }

    fn curve_builder(&self) -> HazardCurveBuilder<'_> {
        HazardCurveBuilder::new(&self.config.location_risk, &self.config.scenarios)
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    /// `1 − (1 − events/days)^window`, 0 when `total_days` is 0.
    #[expect(clippy::unused_self)]
    pub fn event_probability(&self, event_count: u64, total_days: u64, window_days: u32) -> f64 {
        probability(event_count, total_days, window_days)
    }

    /// Probability of at least one `return_period` event within `window_days`.
    #[expect(clippy::unused_self)]
    pub fn return_period_probability(&self, return_period: ReturnPeriod, window_days: f64) -> f64 {
        return_period_probability(return_period, window_days)
    }

    /// Windowed probability of every event kind in a daily rainfall series.
    pub fn event_probabilities(
        &self,
        series: &TimeSeries,
        window_days: u32,
    ) -> BTreeMap<EventKind, f64> {
        EventCounts::from_series(series, &self.config.events.thresholds)
            .all_probabilities(window_days)
    }

    pub fn seasonal_probability(
        &self,
        series: &TimeSeries,
        kind: EventKind,
        months: MonthFilter,
        window_days: u32,
    ) -> SeasonalProbability {
        seasonal_probability(
            series,
            self.config.events.thresholds.threshold(kind),
            months,
            window_days,
        )
    }

    pub fn event_trend(
        &self,
        series: &TimeSeries,
        kind: EventKind,
        window_days: u32,
        years_ahead: u32,
    ) -> TrendOutcome {
        trend_from_series(series, kind, window_days, years_ahead, &self.config.events)
    }

    /// Reproducible daily rainfall sample for a region.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::Validation`] when `years` is zero.
    pub fn sample_rainfall(
        &self,
        region: SampleRegion,
        years: u32,
        end: NaiveDate,
    ) -> Result<TimeSeries> {
        generate_sample_rainfall(region, years, end, self.config.location_risk.seed)
    }

    // ========================================================================
    // DAMAGE
    // ========================================================================

    fn damage_calculator(&self) -> DamageCalculator<'_> {
        DamageCalculator::new(
            &self.reference,
            &self.config.damage,
            &self.config.validation,
            self.resolver.as_ref(),
        )
    }

    /// Economic damage for one asset.
    ///
    /// # Errors
    ///
    /// See [`DamageCalculator::calculate`].
    pub fn calculate_damage(&self, request: &DamageRequest) -> Result<DamageResult> {
        self.damage_calculator().calculate(request)
    }

    pub fn calculate_damage_batch(&self, requests: &[DamageRequest]) -> Vec<BatchItem<DamageResult>> {
        self.damage_calculator().calculate_batch(requests)
    }

    /// Batch over loosely-typed request documents; an entry that does not parse
    /// becomes a validation failure at its index.
    pub fn calculate_damage_batch_values(
        &self,
        requests: &[serde_json::Value],
    ) -> Vec<BatchItem<DamageResult>> {
        let calculator = self.damage_calculator();
        run_batch("damage", requests, |value| {
            calculator.calculate(&parse_request::<DamageRequest>(value)?)
        })
    }

    #[expect(clippy::unused_self)]
    pub fn summarize_damage(&self, items: &[BatchItem<DamageResult>]) -> DamageSummary {
        DamageSummary::from_batch(items)
    }

    /// Exposure apportioned to a named location within a country.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::DataNotFound`] when the country has no exposure record.
    pub fn location_exposure(&self, country_code: &str, location: &str) -> Result<LocationExposure> {
        self.reference.exposure.location_exposure(
            country_code,
            location,
            &self.config.location_risk.country_level_name,
        )
    }

    // ========================================================================
    // EXPECTED ANNUAL IMPACT
    // ========================================================================

    /// Expected annual impact of an explicit hazard curve and exposure.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::ZeroExposure`] when `exposure` is not positive.
    #[expect(clippy::unused_self)]
    pub fn calculate_eai(
        &self,
        location: &str,
        curve: &HazardCurve,
        exposure: f64,
        damage: &DamageCurve,
    ) -> Result<EaiResult> {
        calculate_eai(location, curve, exposure, damage)
    }

    /// Simulated hazard curve, exposure lookup and EAI for one location.
    ///
    /// # Errors
    ///
    /// - [`FloodRiskError::Validation`] when neither `exposure` nor `country_code` is
    ///   given, or the period list is malformed
    /// - [`FloodRiskError::DataNotFound`] for a country without an exposure record
    /// - [`FloodRiskError::ZeroExposure`] for a non-positive exposure
    pub fn calculate_location_eai(&self, request: &EaiRequest) -> Result<EaiResult> {
        let curve = self.build_hazard_curve(
            &request.location,
            request.scenario,
            request.return_periods.as_deref(),
            HazardStrategy::Simulated,
        )?;
        let exposure = match request.exposure {
            Some(exposure) => exposure,
            None => {
                let country = require(request.country_code.as_deref(), "country_code")?;
                self.location_exposure(country, &request.location)?.exposure_usd
            }
        };

        let country = request
            .country_code
            .as_deref()
            .map(|code| self.reference.iso.normalize(code));
        let region = country.as_deref().map(Region::for_country);

        let (damage, provenance) = match request.building_type {
            Some(building_type) => {
                let resolved = self.reference.damage_functions.resolve(
                    building_type,
                    country.as_deref(),
                    region,
                    self.config.damage.flat_fallback_rate,
                );
                (resolved.curve, Some(resolved.provenance))
            }
            None => (linear_impact_curve(), None),
        };
        let mut result = calculate_eai(&request.location, &curve, exposure, &damage)?;
        result.damage_function_provenance = provenance;

        if request.include_uncertainty {
            let std_ratio = match request.building_type {
                Some(building_type) => {
                    self.reference
                        .uncertainty
                        .std_ratio(building_type, region, self.config.damage.default_uncertainty)
                        .0
                }
                None => self.config.damage.default_uncertainty,
            };
            return Ok(result.with_uncertainty(std_ratio));
        }
        Ok(result)
    }

    pub fn calculate_eai_batch(&self, requests: &[EaiRequest]) -> Vec<BatchItem<EaiResult>> {
        run_batch("eai", requests, |request| self.calculate_location_eai(request))
    }

    /// Batch over loosely-typed request documents.
    pub fn calculate_eai_batch_values(
        &self,
        requests: &[serde_json::Value],
    ) -> Vec<BatchItem<EaiResult>> {
        run_batch("eai", requests, |value| {
            self.calculate_location_eai(&parse_request::<EaiRequest>(value)?)
        })
    }
}

fn parse_request<T: serde::de::DeserializeOwned>(value: &serde_json::Value) -> Result<T> {
    T::deserialize(value).map_err(|e| FloodRiskError::validation("request", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Coordinates, Meters};
    use approx::assert_relative_eq;
    use serde_json::json;

    fn periods(years: &[u32]) -> Vec<ReturnPeriod> {
        ReturnPeriod::from_years(years).unwrap()
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FloodRiskEngine>();
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.fitting.min_samples = 0;
        assert!(FloodRiskEngine::new(config).is_err());
    }

    #[test]
    fn test_simulated_curve_and_rescale() {
        let engine = FloodRiskEngine::default();
        let curve = engine
            .build_hazard_curve("Kelantan", ClimateScenario::Historical, None, HazardStrategy::Simulated)
            .unwrap();
        let years: Vec<u32> = curve.rows().iter().map(|r| r.return_period.years()).collect();
        assert_eq!(years, vec![5, 10, 25, 50, 100]);

        let high = engine.rescale_hazard_curve(&curve, ClimateScenario::HighEmissions);
        for (h, base) in high.rows().iter().zip(curve.rows()) {
            assert_eq!(h.intensity, base.intensity * 1.5);
        }
    }

    #[test]
    fn test_fitted_curve() {
        let engine = FloodRiskEngine::default();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let curve = engine
            .build_hazard_curve(
                "Kelantan",
                ClimateScenario::Moderate,
                Some(&periods(&[10, 100])),
                HazardStrategy::Fitted { years: 30, end },
            )
            .unwrap();
        assert_eq!(curve.len(), 2);
        assert!(curve.rows()[1].intensity >= curve.rows()[0].intensity);
        assert!(curve.rows()[0].baseline_intensity >= Meters::new(0.1));
    }

    #[test]
    fn test_fitted_curve_needs_enough_years() {
        let engine = FloodRiskEngine::default();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let err = engine
            .build_hazard_curve(
                "Kelantan",
                ClimateScenario::Historical,
                None,
                HazardStrategy::Fitted { years: 5, end },
            )
            .unwrap_err();
        assert!(matches!(err, FloodRiskError::InsufficientData { .. }));
    }

    #[test]
    fn test_location_eai_from_exposure_table() {
        let engine = FloodRiskEngine::default();
        let mut request = EaiRequest::new("Selangor");
        request.country_code = Some("MYS".into());
        request.return_periods = Some(periods(&[10, 50, 100]));
        let result = engine.calculate_location_eai(&request).unwrap();
        assert_relative_eq!(result.exposure, 3.5e11 * 0.28, max_relative = 1e-12);
        let by_rows: f64 = result.breakdown.iter().map(|r| r.expected()).sum();
        assert_relative_eq!(result.expected_annual_impact, by_rows, max_relative = 1e-12);
        assert!(result.uncertainty.is_none());
    }

    #[test]
    fn test_location_eai_requires_exposure_source() {
        let engine = FloodRiskEngine::default();
        let err = engine
            .calculate_location_eai(&EaiRequest::new("Selangor"))
            .unwrap_err();
        assert!(matches!(err, FloodRiskError::Validation { field: "country_code", .. }));
    }

    #[test]
    fn test_batch_values_isolate_malformed_entries() {
        let engine = FloodRiskEngine::default();
        let items = engine.calculate_damage_batch_values(&[
            json!({ "latitude": 29.76, "longitude": -95.37, "flood_depth": 1.0, "country_code": "US" }),
            json!({ "latitude": 29.76, "flood_depth": 1.0 }),
            json!({ "latitude": 29.76, "longitude": -95.37, "flood_depth": 1.0, "building_type": "castle" }),
            json!({ "latitude": 29.76, "longitude": -95.37, "flood_depth": 21.0 }),
        ]);
        assert_eq!(items.len(), 4);
        assert!(items[0].is_ok());
        for item in &items[1..] {
            assert!(matches!(item.error(), Some(FloodRiskError::Validation { .. })));
        }
        let summary = engine.summarize_damage(&items);
        assert_eq!(summary.valid_calculations, 1);
        assert_eq!(summary.failed_calculations, 3);
    }

    #[test]
    fn test_custom_resolver() {
        struct Everywhere;
        impl CountryResolver for Everywhere {
            fn resolve(&self, _: Coordinates) -> String {
                "CA".to_string()
            }
        }
        let engine = FloodRiskEngine::default().with_resolver(Arc::new(Everywhere));
        let result = engine
            .calculate_damage(&DamageRequest::new(3.1, 101.7, 1.0))
            .unwrap();
        assert_eq!(result.country_code, "CA");
        assert_eq!(result.currency, "CAD");
    }

    #[test]
    fn test_event_operations() {
        let engine = FloodRiskEngine::default();
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let series = engine.sample_rainfall(SampleRegion::Peninsular, 10, end).unwrap();
        let all = engine.event_probabilities(&series, 30);
        assert_eq!(all.len(), 3);
        assert!(all[&EventKind::ExtremeRainfall] <= all[&EventKind::HeavyRainfall]);

        let monsoon = MonthFilter::from_months(&[11, 12, 1, 2, 3]).unwrap();
        let seasonal = engine.seasonal_probability(&series, EventKind::Flood, monsoon, 30);
        assert!(seasonal.season_days > 0);
        assert!((0.0..=1.0).contains(&seasonal.window_probability));

        let trend = engine.event_trend(&series, EventKind::HeavyRainfall, 30, 5);
        assert!(matches!(trend, TrendOutcome::Trend(_)));
    }
}
