//! Core types and utilities

pub mod location;
pub mod scenario;
pub mod series;
pub mod units;

pub use location::{Coordinates, Location, Region};
pub use scenario::{ClimateScenario, ScenarioMultipliers};
pub use series::{AnnualMaxima, MonthFilter, Observation, TimeSeries};
pub use units::{Meters, ReturnPeriod};
