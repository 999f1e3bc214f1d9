//! Single and batch damage calculation with summary statistics

use crate::batch::{run_batch, BatchItem};
use crate::config::{DamageConfig, ValidationConfig};
use crate::core_types::{Coordinates, Meters, Region};
use crate::damage::catalog::CurveProvenance;
use crate::damage::exposure::{value_per_m2, UncertaintySource, Valuation, DEFAULT_COUNTRY_KEY};
use crate::damage::function::BuildingType;
use crate::damage::resolver::CountryResolver;
use crate::error::Result;
use crate::reference::ReferenceData;
use crate::risk::{Interval, UncertaintyBounds};
use crate::validation::{
    validate_area, validate_coordinates, validate_flood_depth, validate_value_per_m2,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

fn include_uncertainty_default() -> bool {
    true
}

/// Input of one damage calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Flood depth in metres
    pub flood_depth: f64,
    #[serde(default)]
    pub location_name: Option<String>,
    /// ISO alpha-2 or alpha-3 code; inferred from coordinates when absent
    #[serde(default)]
    pub country_code: Option<String>,
    /// Overrides the region derived from the country
    #[serde(default)]
    pub region: Option<Region>,
    #[serde(default)]
    pub building_type: Option<BuildingType>,
    #[serde(default)]
    pub area_m2: Option<f64>,
    #[serde(default = "include_uncertainty_default")]
    pub include_uncertainty: bool,
}

impl DamageRequest {
    pub fn new(latitude: f64, longitude: f64, flood_depth: f64) -> Self {
        Self {
            latitude,
            longitude,
            flood_depth,
            location_name: None,
            country_code: None,
            region: None,
            building_type: None,
            area_m2: None,
            include_uncertainty: true,
        }
    }

    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    pub fn with_building_type(mut self, building_type: BuildingType) -> Self {
        self.building_type = Some(building_type);
        self
    }

    pub fn with_area(mut self, area_m2: f64) -> Self {
        self.area_m2 = Some(area_m2);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountrySource {
    Supplied,
    /// Inferred from coordinates by the [`CountryResolver`]
    Resolved,
}

/// Every lookup decision behind a [`DamageResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageProvenance {
    pub country_source: CountrySource,
    /// The `DEFAULT` economics record stood in for an unknown country
    pub economics_fallback: bool,
    pub damage_curve: CurveProvenance,
    pub uncertainty_source: Option<UncertaintySource>,
}

impl DamageProvenance {
    pub fn used_fallback(&self) -> bool {
        self.economics_fallback || self.damage_curve.used_fallback()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageResult {
    pub location_name: Option<String>,
    pub coordinates: Coordinates,
    pub country_code: String,
    pub country_name: Option<String>,
    pub region: Region,
    pub flood_depth_m: Meters,
    pub building_type: BuildingType,
    pub area_m2: f64,
    pub value_per_m2: f64,
    pub total_value: f64,
    pub damage_ratio: f64,
    pub economic_damage: f64,
    pub currency: String,
    pub valuation: Valuation,
    pub uncertainty: Option<UncertaintyBounds>,
    pub provenance: DamageProvenance,
}

/// Depth-damage calculator over borrowed reference data and configuration.
pub struct DamageCalculator<'a> {
    reference: &'a ReferenceData,
    config: &'a DamageConfig,
    limits: &'a ValidationConfig,
    resolver: &'a dyn CountryResolver,
}

impl<'a> DamageCalculator<'a> {
    pub fn new(
        reference: &'a ReferenceData,
        config: &'a DamageConfig,
        limits: &'a ValidationConfig,
        resolver: &'a dyn CountryResolver,
    ) -> Self {
        Self {
            reference,
            config,
            limits,
            resolver,
        }
    }

    /// Economic damage for one asset.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FloodRiskError::Validation`] for out-of-range coordinates, a
    /// negative or implausible depth, or a non-positive area. Missing reference data
    /// never fails; it degrades through the fallback chain recorded in the provenance.
    pub fn calculate(&self, request: &DamageRequest) -> Result<DamageResult> {
        let coordinates = validate_coordinates(request.latitude, request.longitude)?;
        let depth = validate_flood_depth(request.flood_depth, self.limits.max_flood_depth_m)?;
        let area_m2 = validate_area(request.area_m2.unwrap_or(self.config.default_area_m2))?;
        let building_type = request
            .building_type
            .unwrap_or(self.config.default_building_type);

        let (country_code, country_source) = match request.country_code.as_deref() {
            Some(code) => (self.reference.iso.normalize(code), CountrySource::Supplied),
            None => {
                let code = self.resolver.resolve(coordinates);
                debug!("Resolved country {} from coordinates", code);
                (code, CountrySource::Resolved)
            }
        };
        let known_country = (country_code != DEFAULT_COUNTRY_KEY).then_some(country_code.as_str());
        let region = request
            .region
            .unwrap_or_else(|| Region::for_country(&country_code));

        let economics = self.reference.economics.lookup(&country_code);
        let valuation = value_per_m2(economics.record, building_type, self.config.valuation_basis);
        validate_value_per_m2(valuation.value_per_m2)?;

        let resolved = self.reference.damage_functions.resolve(
            building_type,
            known_country,
            Some(region),
            self.config.flat_fallback_rate,
        );
        let damage_ratio = resolved.curve.ratio(depth);
        let total_value = area_m2 * valuation.value_per_m2;
        let economic_damage = total_value * damage_ratio;

        let (uncertainty, uncertainty_source) = if request.include_uncertainty {
            let (std_ratio, source) = self.reference.uncertainty.std_ratio(
                building_type,
                Some(region),
                self.config.default_uncertainty,
            );
            (Some(UncertaintyBounds::new(economic_damage, std_ratio)), Some(source))
        } else {
            (None, None)
        };

        Ok(DamageResult {
            location_name: request.location_name.clone(),
            coordinates,
            country_name: self.reference.iso.name(&country_code).map(str::to_string),
            country_code,
            region,
            flood_depth_m: depth,
            building_type,
            area_m2,
            value_per_m2: valuation.value_per_m2,
            total_value,
            damage_ratio,
            economic_damage,
            currency: valuation.currency.clone(),
            valuation,
            uncertainty,
            provenance: DamageProvenance {
                country_source,
                economics_fallback: economics.used_default,
                damage_curve: resolved.provenance,
                uncertainty_source,
            },
        })
    }

    /// [`DamageCalculator::calculate`] over many requests in parallel.
    pub fn calculate_batch(&self, requests: &[DamageRequest]) -> Vec<BatchItem<DamageResult>> {
        run_batch("damage", requests, |request| self.calculate(request))
    }
}

// ============================================================================
// SUMMARY
// ============================================================================

/// Descriptive statistics of a sample; `std` is the population standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Statistics {
    /// `None` for an empty sample
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let total: f64 = values.iter().sum();
        let mean = total / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            total,
            mean,
            median,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncertaintySummary {
    pub with_uncertainty: usize,
    /// Sum of the per-item 95% bounds
    pub aggregate_ci95: Interval,
    pub mean_ci95_width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageSummary {
    pub total_calculations: usize,
    pub valid_calculations: usize,
    pub failed_calculations: usize,
    pub economic_damage: Option<Statistics>,
    pub damage_ratio: Option<Statistics>,
    pub country_counts: BTreeMap<String, usize>,
    pub building_type_counts: BTreeMap<BuildingType, usize>,
    pub uncertainty: Option<UncertaintySummary>,
}

impl DamageSummary {
    /// Summarise the successful items of a batch.
    pub fn from_batch(items: &[BatchItem<DamageResult>]) -> Self {
        let valid: Vec<&DamageResult> = items.iter().filter_map(BatchItem::value).collect();

        let damages: Vec<f64> = valid.iter().map(|r| r.economic_damage).collect();
        let ratios: Vec<f64> = valid.iter().map(|r| r.damage_ratio).collect();
        let mut country_counts = BTreeMap::new();
        let mut building_type_counts = BTreeMap::new();
        for result in &valid {
            *country_counts.entry(result.country_code.clone()).or_insert(0) += 1;
            *building_type_counts.entry(result.building_type).or_insert(0) += 1;
        }

        let bounds: Vec<Interval> = valid
            .iter()
            .filter_map(|r| r.uncertainty.map(|u| u.ci95))
            .collect();
        let uncertainty = (!bounds.is_empty()).then(|| UncertaintySummary {
            with_uncertainty: bounds.len(),
            aggregate_ci95: Interval {
                lower: bounds.iter().map(|b| b.lower).sum(),
                upper: bounds.iter().map(|b| b.upper).sum(),
            },
            mean_ci95_width: bounds.iter().map(Interval::width).sum::<f64>() / bounds.len() as f64,
        });

        Self {
            total_calculations: items.len(),
            valid_calculations: valid.len(),
            failed_calculations: items.len() - valid.len(),
            economic_damage: Statistics::from_values(&damages),
            damage_ratio: Statistics::from_values(&ratios),
            country_counts,
            building_type_counts,
            uncertainty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::{BoundingBoxResolver, FunctionTier};
    use crate::FloodRiskError;
    use approx::assert_relative_eq;

    struct Fixture {
        reference: ReferenceData,
        config: DamageConfig,
        limits: ValidationConfig,
        resolver: BoundingBoxResolver,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                reference: ReferenceData::builtin(),
                config: DamageConfig::default(),
                limits: ValidationConfig::default(),
                resolver: BoundingBoxResolver::default(),
            }
        }

        fn calculator(&self) -> DamageCalculator<'_> {
            DamageCalculator::new(&self.reference, &self.config, &self.limits, &self.resolver)
        }
    }

    #[test]
    fn test_us_residential_damage() {
        let fixture = Fixture::new();
        let result = fixture
            .calculator()
            .calculate(&DamageRequest::new(29.76, -95.37, 1.5).with_country("US"))
            .unwrap();
        assert_eq!(result.value_per_m2, 1000.0);
        assert_eq!(result.total_value, 100_000.0);
        assert_relative_eq!(result.damage_ratio, 0.5, epsilon = 1e-9);
        assert_relative_eq!(result.economic_damage, 50_000.0, epsilon = 1e-9);
        assert_eq!(result.currency, "USD");
        assert_eq!(result.country_name.as_deref(), Some("United States"));
        assert_eq!(result.provenance.country_source, CountrySource::Supplied);
        assert_eq!(result.provenance.damage_curve.tier, FunctionTier::Global);

        let uncertainty = result.uncertainty.unwrap();
        assert_relative_eq!(uncertainty.std, 7_500.0, epsilon = 1e-9);
        assert_relative_eq!(uncertainty.ci95.upper, 50_000.0 + 1.96 * 7_500.0, epsilon = 1e-9);
    }

    #[test]
    fn test_country_resolved_from_coordinates() {
        let fixture = Fixture::new();
        let result = fixture
            .calculator()
            .calculate(&DamageRequest::new(3.139, 101.6869, 1.0))
            .unwrap();
        assert_eq!(result.country_code, "MY");
        assert_eq!(result.region, Region::Asia);
        assert_eq!(result.provenance.country_source, CountrySource::Resolved);
        assert!(result.provenance.economics_fallback);
        assert_relative_eq!(result.value_per_m2, 1000.0 * 25_000.0 / 65_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_alpha3_code_is_normalised() {
        let fixture = Fixture::new();
        let result = fixture
            .calculator()
            .calculate(&DamageRequest::new(-15.8, -47.9, 2.0).with_country("bra"))
            .unwrap();
        assert_eq!(result.country_code, "BR");
        assert_eq!(result.currency, "BRL");
        assert!(!result.provenance.economics_fallback);
    }

    #[test]
    fn test_flat_fallback_for_agriculture() {
        let fixture = Fixture::new();
        let request = DamageRequest::new(29.76, -95.37, 2.0)
            .with_country("US")
            .with_building_type(BuildingType::Agriculture)
            .with_area(50.0);
        let result = fixture.calculator().calculate(&request).unwrap();
        assert_relative_eq!(result.damage_ratio, 0.6, epsilon = 1e-9);
        assert_eq!(result.provenance.damage_curve.tier, FunctionTier::FlatLinear);
        assert!(result.provenance.used_fallback());
        assert_eq!(
            result.provenance.uncertainty_source,
            Some(UncertaintySource::Default)
        );
    }

    #[test]
    fn test_validation_errors() {
        let fixture = Fixture::new();
        let calculator = fixture.calculator();
        let depth_err = calculator
            .calculate(&DamageRequest::new(0.0, 0.0, 25.0))
            .unwrap_err();
        assert!(matches!(depth_err, FloodRiskError::Validation { field: "flood_depth", .. }));
        assert!(calculator.calculate(&DamageRequest::new(91.0, 0.0, 1.0)).is_err());
        assert!(calculator.calculate(&DamageRequest::new(0.0, 0.0, -0.5)).is_err());
        assert!(calculator
            .calculate(&DamageRequest::new(0.0, 0.0, 1.0).with_area(0.0))
            .is_err());
    }

    #[test]
    fn test_batch_and_summary() {
        let fixture = Fixture::new();
        let requests = vec![
            DamageRequest::new(29.76, -95.37, 1.5).with_country("US"),
            DamageRequest::new(29.76, -95.37, 30.0).with_country("US"),
            DamageRequest::new(29.76, -95.37, 1.0)
                .with_country("US")
                .with_building_type(BuildingType::Commercial),
        ];
        let items = fixture.calculator().calculate_batch(&requests);
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].error().is_some());
        assert!(items[2].is_ok());

        let summary = DamageSummary::from_batch(&items);
        assert_eq!(summary.total_calculations, 3);
        assert_eq!(summary.valid_calculations, 2);
        assert_eq!(summary.failed_calculations, 1);
        assert_eq!(summary.country_counts.get("US"), Some(&2));
        assert_eq!(summary.building_type_counts.get(&BuildingType::Commercial), Some(&1));

        let damage = summary.economic_damage.unwrap();
        assert_relative_eq!(damage.total, 50_000.0 + 60_000.0, epsilon = 1e-9);
        assert_relative_eq!(damage.median, 55_000.0, epsilon = 1e-9);
        assert_relative_eq!(damage.std, 5_000.0, epsilon = 1e-9);

        let uncertainty = summary.uncertainty.unwrap();
        let first = items[0].value().unwrap().uncertainty.unwrap().ci95;
        let third = items[2].value().unwrap().uncertainty.unwrap().ci95;
        assert_relative_eq!(uncertainty.aggregate_ci95.upper, first.upper + third.upper, epsilon = 1e-9);
    }

    #[test]
    fn test_statistics() {
        let stats = Statistics::from_values(&[4.0, 1.0, 3.0]).unwrap();
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.mean, 8.0 / 3.0, epsilon = 1e-9);
        assert!(Statistics::from_values(&[]).is_none());
    }
}
