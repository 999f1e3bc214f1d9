//! Depth-damage interpolation, exposure valuation and damage calculation
//!
//! - [`function`]: depth → damage-ratio curves and the building-type taxonomy
//! - [`catalog`]: reference damage functions and the fallback chain that picks one
//! - [`exposure`]: per-m² valuation, country economics, ISO codes, exposure totals
//! - [`resolver`]: country inference from coordinates
//! - [`calculator`]: single and batch damage calculation with summary statistics

pub mod calculator;
pub mod catalog;
pub mod exposure;
pub mod function;
pub mod resolver;

pub use calculator::{
    CountrySource, DamageCalculator, DamageProvenance, DamageRequest, DamageResult,
    DamageSummary, Statistics, UncertaintySummary,
};
pub use catalog::{
    CurveProvenance, DamageFunctionCatalog, DamageFunctionRow, FunctionScope, FunctionTier,
    ResolvedCurve,
};
pub use exposure::{
    land_use_value_per_m2, value_per_m2, CountryEconomics, CountryExposure, EconomicsLookup,
    EconomicsTable, ExposureTable, IsoCountry, IsoTable, LocationExposure, RegionalExposure,
    ShareSource, StateShare, UncertaintyRow, UncertaintySource, UncertaintyTable, Valuation,
    ValuationBasis, DEFAULT_COUNTRY_KEY,
};
pub use function::{BuildingType, DamageCurve, DamageFunction, DamagePoint, LandUse};
pub use resolver::{BoundingBoxResolver, CountryBox, CountryResolver};
