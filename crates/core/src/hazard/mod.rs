//! Hazard side of the engine: extreme-value fitting, return levels, hazard curves
//! and empirical event probabilities.

pub mod curve;
pub mod events;
pub mod gev;
pub mod return_levels;
pub mod series_generator;

pub use curve::{CurveSource, HazardCurve, HazardCurveBuilder, HazardCurveRow, HazardSource, ScenarioComparison};
pub use events::{
    probability, return_period_probability, seasonal_probability, trend_from_counts,
    trend_from_series, EventCounts, EventKind, EventThresholds, Season, SeasonalProbability,
    TrendConfidence, TrendDirection, TrendEstimate, TrendOutcome,
};
pub use gev::{FitQuality, GevDistribution, GevFitter, GevParameters};
pub use return_levels::{calculate_return_levels, ConfidenceMethod, ReturnLevel, ReturnLevelTable};
pub use series_generator::{
    generate_sample_rainfall, HistoricalSeries, HistoricalSeriesGenerator, RainfallProfile,
    SampleRegion,
};
