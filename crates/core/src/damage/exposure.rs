//! Exposure valuation: per-m² asset values, country economics and exposure totals
//!
//! Two valuation bases are supported:
//! - [`ValuationBasis::FlatByLandUse`]: a fixed USD/m² baseline per land use
//! - [`ValuationBasis::GdpAdjusted`]: `1000 × gdp_per_capita / 65000`, i.e. a baseline
//!   scaled by the country's GDP per capita relative to a fixed reference economy
//!
//! Country lookups never fail for unknown codes; they degrade to the `DEFAULT`
//! economics record and say so in the returned provenance.

use crate::core_types::Region;
use crate::damage::function::{BuildingType, LandUse};
use crate::error::{FloodRiskError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Key of the fallback economics record
pub const DEFAULT_COUNTRY_KEY: &str = "DEFAULT";
/// GDP per capita of the reference economy (USD)
pub const REFERENCE_GDP_PER_CAPITA: f64 = 65_000.0;
/// Asset value per m² in the reference economy (USD)
pub const REFERENCE_VALUE_PER_M2: f64 = 1_000.0;
/// Share of a country's exposure given to a location missing from the share table
pub const DEFAULT_LOCATION_SHARE: f64 = 0.04;
/// Damage standard deviation used when no uncertainty row matches
pub const DEFAULT_UNCERTAINTY_STD: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationBasis {
    #[default]
    GdpAdjusted,
    FlatByLandUse,
}

/// Flat USD/m² baseline for a building type; types without a distinct baseline
/// are valued as residential.
pub fn land_use_value_per_m2(building_type: BuildingType) -> f64 {
    match building_type.land_use() {
        Some(LandUse::Commercial) => 1_500.0,
        Some(LandUse::Industrial) => 800.0,
        _ => 1_000.0,
    }
}

// ============================================================================
// COUNTRY ECONOMICS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryEconomics {
    pub country_code: String,
    pub country_name: String,
    pub gdp_per_capita: f64,
    pub currency: String,
}

/// Economics record used for a calculation, and whether the fallback was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicsLookup<'a> {
    pub record: &'a CountryEconomics,
    pub requested: String,
    pub used_default: bool,
}

/// Country economics keyed by upper-case ISO alpha-2 code, always holding a
/// `DEFAULT` record.
#[derive(Debug, Clone)]
pub struct EconomicsTable {
    records: FxHashMap<String, CountryEconomics>,
    default: CountryEconomics,
}

impl EconomicsTable {
    /// Build from rows; the row keyed `DEFAULT` becomes the fallback.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] when the `DEFAULT` row is missing or a
    /// GDP per capita is not positive.
    pub fn from_rows(rows: Vec<CountryEconomics>) -> Result<Self> {
        let mut records = FxHashMap::default();
        let mut default = None;
        for mut row in rows {
            if !(row.gdp_per_capita.is_finite() && row.gdp_per_capita > 0.0) {
                return Err(FloodRiskError::InvalidConfig(format!(
                    "gdp_per_capita for {} must be positive, got {}",
                    row.country_code, row.gdp_per_capita
                )));
            }
            row.country_code = row.country_code.trim().to_ascii_uppercase();
            if row.country_code == DEFAULT_COUNTRY_KEY {
                default = Some(row);
            } else {
                records.insert(row.country_code.clone(), row);
            }
        }
        let default = default.ok_or_else(|| {
            FloodRiskError::InvalidConfig("country economics table has no DEFAULT row".into())
        })?;
        Ok(Self { records, default })
    }

    pub fn builtin() -> Self {
        let record = |code: &str, name: &str, gdp: f64, currency: &str| CountryEconomics {
            country_code: code.to_string(),
            country_name: name.to_string(),
            gdp_per_capita: gdp,
            currency: currency.to_string(),
        };
        let records = [
            record("US", "United States", 65_000.0, "USD"),
            record("MX", "Mexico", 10_000.0, "MXN"),
            record("CA", "Canada", 50_000.0, "CAD"),
            record("BR", "Brazil", 8_500.0, "BRL"),
        ]
        .into_iter()
        .map(|r| (r.country_code.clone(), r))
        .collect();
        Self {
            records,
            default: record(DEFAULT_COUNTRY_KEY, "Default", 25_000.0, "USD"),
        }
    }

    pub fn default_record(&self) -> &CountryEconomics {
        &self.default
    }

    /// Record for `country_code`, or the `DEFAULT` record.
    pub fn lookup(&self, country_code: &str) -> EconomicsLookup<'_> {
        let key = country_code.trim().to_ascii_uppercase();
        match self.records.get(&key) {
            Some(record) => EconomicsLookup {
                record,
                requested: key,
                used_default: false,
            },
            None => {
                debug!("No economics for '{}', using DEFAULT record", key);
                EconomicsLookup {
                    record: &self.default,
                    requested: key,
                    used_default: true,
                }
            }
        }
    }
}

/// Asset value per m² and the inputs it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub value_per_m2: f64,
    pub currency: String,
    pub basis: ValuationBasis,
    pub gdp_per_capita: f64,
    pub economic_adjustment_factor: f64,
}

/// Value per m² for a building type in the country described by `economics`.
pub fn value_per_m2(
    economics: &CountryEconomics,
    building_type: BuildingType,
    basis: ValuationBasis,
) -> Valuation {
    let factor = economics.gdp_per_capita / REFERENCE_GDP_PER_CAPITA;
    match basis {
        ValuationBasis::GdpAdjusted => Valuation {
            value_per_m2: REFERENCE_VALUE_PER_M2 * factor,
            currency: economics.currency.clone(),
            basis,
            gdp_per_capita: economics.gdp_per_capita,
            economic_adjustment_factor: factor,
        },
        ValuationBasis::FlatByLandUse => Valuation {
            value_per_m2: land_use_value_per_m2(building_type),
            currency: "USD".to_string(),
            basis,
            gdp_per_capita: economics.gdp_per_capita,
            economic_adjustment_factor: 1.0,
        },
    }
}

// ============================================================================
// ISO TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsoCountry {
    pub alpha2: String,
    pub alpha3: String,
    pub numeric: u16,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct IsoTable {
    countries: Vec<IsoCountry>,
}

impl IsoTable {
    pub fn new(mut countries: Vec<IsoCountry>) -> Self {
        for c in &mut countries {
            c.alpha2 = c.alpha2.trim().to_ascii_uppercase();
            c.alpha3 = c.alpha3.trim().to_ascii_uppercase();
        }
        Self { countries }
    }

    pub fn builtin() -> Self {
        let country = |alpha2: &str, alpha3: &str, numeric, name: &str| IsoCountry {
            alpha2: alpha2.to_string(),
            alpha3: alpha3.to_string(),
            numeric,
            name: name.to_string(),
        };
        Self::new(vec![
            country("US", "USA", 840, "United States"),
            country("MX", "MEX", 484, "Mexico"),
            country("CA", "CAN", 124, "Canada"),
            country("BR", "BRA", 76, "Brazil"),
            country("MY", "MYS", 458, "Malaysia"),
        ])
    }

    /// Entry matching an alpha-2 or alpha-3 code (case-insensitive)
    pub fn find(&self, code: &str) -> Option<&IsoCountry> {
        let code = code.trim();
        self.countries
            .iter()
            .find(|c| c.alpha2.eq_ignore_ascii_case(code) || c.alpha3.eq_ignore_ascii_case(code))
    }

    /// Upper-case alpha-2 form of `code`; unknown codes pass through upper-cased.
    pub fn normalize(&self, code: &str) -> String {
        self.find(code)
            .map_or_else(|| code.trim().to_ascii_uppercase(), |c| c.alpha2.clone())
    }

    pub fn name(&self, code: &str) -> Option<&str> {
        self.find(code).map(|c| c.name.as_str())
    }
}

// ============================================================================
// COUNTRY EXPOSURE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalExposure {
    pub name: String,
    pub exposure_usd: f64,
    pub population: f64,
}

/// LitPop-style country exposure record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryExposure {
    /// ISO alpha-3 code
    pub country_code: String,
    pub country_name: String,
    pub total_exposure_usd: f64,
    pub population: f64,
    /// Share of total exposure inside flood zones
    pub flood_exposure_ratio: f64,
    #[serde(default)]
    pub regions: Vec<RegionalExposure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateShare {
    /// ISO alpha-3 code of the owning country
    pub country_code: String,
    pub location: String,
    pub share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareSource {
    /// The country-level location receives the full total
    CountryTotal,
    Table,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationExposure {
    pub location: String,
    pub exposure_usd: f64,
    pub share: f64,
    pub source: ShareSource,
}

/// Country exposure totals plus the state share table used to apportion them.
#[derive(Debug, Clone, Default)]
pub struct ExposureTable {
    countries: FxHashMap<String, CountryExposure>,
    shares: FxHashMap<(String, String), f64>,
}

impl ExposureTable {
    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] for a negative total, a share outside
    /// [0, 1], or shares of one country summing above 1.
    pub fn new(countries: Vec<CountryExposure>, shares: Vec<StateShare>) -> Result<Self> {
        let mut table = Self::default();
        for mut country in countries {
            if !(country.total_exposure_usd.is_finite() && country.total_exposure_usd >= 0.0) {
                return Err(FloodRiskError::InvalidConfig(format!(
                    "total exposure for {} must be non-negative, got {}",
                    country.country_code, country.total_exposure_usd
                )));
            }
            country.country_code = country.country_code.trim().to_ascii_uppercase();
            table.countries.insert(country.country_code.clone(), country);
        }

        let mut sums: FxHashMap<String, f64> = FxHashMap::default();
        for share in shares {
            if !(0.0..=1.0).contains(&share.share) {
                return Err(FloodRiskError::InvalidConfig(format!(
                    "exposure share for {} must be in [0, 1], got {}",
                    share.location, share.share
                )));
            }
            let code = share.country_code.trim().to_ascii_uppercase();
            *sums.entry(code.clone()).or_default() += share.share;
            table.shares.insert((code, share.location), share.share);
        }
        if let Some((code, sum)) = sums.into_iter().find(|(_, sum)| *sum > 1.0 + 1e-9) {
            return Err(FloodRiskError::InvalidConfig(format!(
                "exposure shares for {code} sum to {sum}, above 1"
            )));
        }
        Ok(table)
    }

    pub fn builtin() -> Self {
        let region = |name: &str, exposure_usd, population| RegionalExposure {
            name: name.to_string(),
            exposure_usd,
            population,
        };
        let malaysia = CountryExposure {
            country_code: "MYS".to_string(),
            country_name: "Malaysia".to_string(),
            total_exposure_usd: 3.5e11,
            population: 33.0e6,
            flood_exposure_ratio: 0.15,
            regions: vec![
                region("Peninsular Malaysia", 2.5e11, 26.0e6),
                region("Sabah", 0.5e11, 3.9e6),
                region("Sarawak", 0.5e11, 2.8e6),
            ],
        };
        let shares = [
            ("Selangor", 0.28),
            ("Johor", 0.14),
            ("Penang", 0.09),
            ("Sarawak", 0.10),
            ("Sabah", 0.08),
            ("Perak", 0.08),
            ("Pahang", 0.08),
            ("Kelantan", 0.06),
            ("Terengganu", 0.05),
        ]
        .into_iter()
        .map(|(location, share)| (("MYS".to_string(), location.to_string()), share))
        .collect();
        Self {
            countries: std::iter::once(("MYS".to_string(), malaysia)).collect(),
            shares,
        }
    }

    /// Full exposure record for an ISO alpha-3 code.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::DataNotFound`] when the country has no record.
    pub fn country(&self, country_code: &str) -> Result<&CountryExposure> {
        let key = country_code.trim().to_ascii_uppercase();
        self.countries
            .get(&key)
            .ok_or(FloodRiskError::DataNotFound {
                table: "country exposure",
                key,
            })
    }

    /// Total exposure (USD) for an ISO alpha-3 code.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::DataNotFound`] when the country has no record.
    pub fn total_exposure(&self, country_code: &str) -> Result<f64> {
        self.country(country_code).map(|c| c.total_exposure_usd)
    }

    /// Exposure apportioned to `location` within a country.
    ///
    /// `country_level_name` receives the full total. A location missing from the
    /// share table gets [`DEFAULT_LOCATION_SHARE`].
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::DataNotFound`] when the country has no record.
    pub fn location_exposure(
        &self,
        country_code: &str,
        location: &str,
        country_level_name: &str,
    ) -> Result<LocationExposure> {
        let country = self.country(country_code)?;
        let (share, source) = if location == country_level_name {
            (1.0, ShareSource::CountryTotal)
        } else if let Some(&share) = self
            .shares
            .get(&(country.country_code.clone(), location.to_string()))
        {
            (share, ShareSource::Table)
        } else {
            debug!(
                "No exposure share for '{}' in {}, using default {}",
                location, country.country_code, DEFAULT_LOCATION_SHARE
            );
            (DEFAULT_LOCATION_SHARE, ShareSource::Default)
        };
        Ok(LocationExposure {
            location: location.to_string(),
            exposure_usd: country.total_exposure_usd * share,
            share,
            source,
        })
    }
}

// ============================================================================
// UNCERTAINTY
// ============================================================================

/// Damage standard deviation (as a fraction of damage) for a building type,
/// optionally specific to a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncertaintyRow {
    pub building_type: BuildingType,
    #[serde(default)]
    pub region: Option<Region>,
    pub std_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UncertaintySource {
    Region,
    BuildingType,
    Default,
}

#[derive(Debug, Clone, Default)]
pub struct UncertaintyTable {
    rows: FxHashMap<(BuildingType, Option<Region>), f64>,
}

impl UncertaintyTable {
    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] for a negative or non-finite ratio.
    pub fn from_rows(rows: &[UncertaintyRow]) -> Result<Self> {
        let mut table = Self::default();
        for row in rows {
            if !(row.std_ratio.is_finite() && row.std_ratio >= 0.0) {
                return Err(FloodRiskError::InvalidConfig(format!(
                    "uncertainty for {} must be non-negative, got {}",
                    row.building_type, row.std_ratio
                )));
            }
            table.rows.insert((row.building_type, row.region), row.std_ratio);
        }
        Ok(table)
    }

    pub fn builtin() -> Self {
        let rows = [
            (BuildingType::Residential, 0.15),
            (BuildingType::Commercial, 0.20),
            (BuildingType::Industrial, 0.25),
            (BuildingType::Institutional, 0.18),
        ]
        .into_iter()
        .map(|(b, std)| ((b, None), std))
        .collect();
        Self { rows }
    }

    /// Standard deviation ratio: region row, then building-type row, then `default`.
    pub fn std_ratio(
        &self,
        building_type: BuildingType,
        region: Option<Region>,
        default: f64,
    ) -> (f64, UncertaintySource) {
        if let Some(&std) = region.and_then(|r| self.rows.get(&(building_type, Some(r)))) {
            return (std, UncertaintySource::Region);
        }
        if let Some(&std) = self.rows.get(&(building_type, None)) {
            return (std, UncertaintySource::BuildingType);
        }
        debug!("No uncertainty row for {}, using default {}", building_type, default);
        (default, UncertaintySource::Default)
    }
}
