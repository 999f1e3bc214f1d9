//! Flood Risk Core Library
//!
//! Flood hazard probabilities and economic damage estimates for named locations.
//! Fits extreme-value distributions to historical maxima, derives return levels and
//! climate-scaled hazard curves, converts flood depth into monetary damage through
//! depth-damage functions and country economics, and integrates hazard against
//! exposure into an expected annual impact.
//!
//! ## Layout
//!
//! - [`hazard`]: GEV fitting, return levels, hazard curves, empirical event probabilities
//! - [`damage`]: depth-damage functions with a fallback chain, exposure valuation,
//!   single and batch damage calculation
//! - [`risk`]: expected annual impact and confidence bounds
//! - [`engine`]: [`FloodRiskEngine`], the stateless facade over all of the above
//!
//! The library logs through `tracing` and never installs a subscriber.

// Core types and utilities
pub mod core_types;

pub mod config;
pub mod error;
pub mod reference;
pub mod validation;

pub mod batch;
pub mod damage;
pub mod engine;
pub mod hazard;
pub mod risk;

// Re-export core types
pub use core_types::{
    ClimateScenario, Coordinates, Location, Meters, MonthFilter, Observation, Region,
    ReturnPeriod, ScenarioMultipliers, TimeSeries,
};

pub use batch::BatchItem;
pub use config::EngineConfig;
pub use engine::{EaiRequest, FittedReturnLevels, FloodRiskEngine, HazardStrategy};
pub use error::{ErrorKind, FloodRiskError, Result};
pub use reference::{ReferenceData, ReferenceTables};

// Re-export computation results
pub use damage::{
    BuildingType, CountryResolver, DamageCurve, DamageFunction, DamageRequest, DamageResult,
    DamageSummary,
};
pub use hazard::{
    EventKind, GevParameters, HazardCurve, ReturnLevelTable, SampleRegion, Season,
};
pub use risk::{EaiResult, UncertaintyBounds};
