//! Empirical event probabilities from daily observations
//!
//! Event days are days whose rainfall reaches a threshold. The daily event rate is
//! turned into the probability of at least one event within a time window assuming
//! independent days: `1 − (1 − p_daily)^window`.

use crate::config::EventConfig;
use crate::core_types::{MonthFilter, ReturnPeriod, TimeSeries};
use crate::error::{FloodRiskError, Result};
use crate::hazard::series_generator::{INTER_MONSOON, NORTHEAST_MONSOON, SOUTHWEST_MONSOON};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Probability of at least one event in `window_days`, given `event_count` event days
/// among `total_days` observed days.
///
/// Returns 0 when nothing was observed. Non-decreasing in `window_days` and always
/// within [0, 1].
pub fn probability(event_count: u64, total_days: u64, window_days: u32) -> f64 {
    if total_days == 0 {
        return 0.0;
    }
    let daily = (event_count as f64 / total_days as f64).clamp(0.0, 1.0);
    window_probability(daily, f64::from(window_days))
}

fn window_probability(daily: f64, window: f64) -> f64 {
    (1.0 - (1.0 - daily).powf(window)).clamp(0.0, 1.0)
}

/// Probability that a `return_period` event occurs at least once within `window_days`.
///
/// The annual probability `1/T` is spread over a 365.25-day year.
pub fn return_period_probability(return_period: ReturnPeriod, window_days: f64) -> f64 {
    window_probability(return_period.annual_probability(), window_days.max(0.0) / 365.25)
}

// ============================================================================
// EVENT KINDS
// ============================================================================

/// Rainfall-driven event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    HeavyRainfall,
    Flood,
    ExtremeRainfall,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::HeavyRainfall,
        EventKind::Flood,
        EventKind::ExtremeRainfall,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            EventKind::HeavyRainfall => "heavy_rainfall",
            EventKind::Flood => "flood",
            EventKind::ExtremeRainfall => "extreme_rainfall",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for EventKind {
    type Err = FloodRiskError;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                FloodRiskError::validation(
                    "event_type",
                    format!("unknown event type '{s}', expected heavy_rainfall, flood or extreme_rainfall"),
                )
            })
    }
}

/// Daily rainfall (mm) at or above which a day counts as an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventThresholds {
    pub heavy_rainfall_mm: f64,
    pub flood_mm: f64,
    pub extreme_rainfall_mm: f64,
}

impl Default for EventThresholds {
    fn default() -> Self {
        Self {
            heavy_rainfall_mm: 100.0,
            flood_mm: 150.0,
            extreme_rainfall_mm: 200.0,
        }
    }
}

impl EventThresholds {
    pub fn threshold(&self, kind: EventKind) -> f64 {
        match kind {
            EventKind::HeavyRainfall => self.heavy_rainfall_mm,
            EventKind::Flood => self.flood_mm,
            EventKind::ExtremeRainfall => self.extreme_rainfall_mm,
        }
    }

    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] when a threshold is not positive or the
    /// thresholds are not ordered heavy ≤ flood ≤ extreme.
    pub fn validate(&self) -> Result<()> {
        let values = [self.heavy_rainfall_mm, self.flood_mm, self.extreme_rainfall_mm];
        if values.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(FloodRiskError::InvalidConfig(format!(
                "event thresholds must be positive, got {values:?}"
            )));
        }
        if values.windows(2).any(|w| w[0] > w[1]) {
            return Err(FloodRiskError::InvalidConfig(format!(
                "event thresholds must satisfy heavy <= flood <= extreme, got {values:?}"
            )));
        }
        Ok(())
    }
}

/// Event-day counts of a daily rainfall series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCounts {
    pub total_days: u64,
    pub counts: BTreeMap<EventKind, u64>,
}

impl EventCounts {
    pub fn from_series(series: &TimeSeries, thresholds: &EventThresholds) -> Self {
        let mut total_days = 0;
        let counts = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let (events, days) =
                    series.count_exceedances(thresholds.threshold(kind), MonthFilter::ALL);
                total_days = days;
                (kind, events)
            })
            .collect();
        Self { total_days, counts }
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn probability(&self, kind: EventKind, window_days: u32) -> f64 {
        probability(self.count(kind), self.total_days, window_days)
    }

    /// Windowed probability for every event kind
    pub fn all_probabilities(&self, window_days: u32) -> BTreeMap<EventKind, f64> {
        EventKind::ALL
            .into_iter()
            .map(|kind| (kind, self.probability(kind, window_days)))
            .collect()
    }
}

// ============================================================================
// SEASONS
// ============================================================================

/// Malaysian monsoon seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    /// November to March
    NortheastMonsoon,
    /// May to September
    SouthwestMonsoon,
    /// April and October
    InterMonsoon,
}

impl Season {
    pub fn months(self) -> &'static [u32] {
        match self {
            Season::NortheastMonsoon => &NORTHEAST_MONSOON,
            Season::SouthwestMonsoon => &SOUTHWEST_MONSOON,
            Season::InterMonsoon => &INTER_MONSOON,
        }
    }

    /// # Errors
    ///
    /// Never fails for the built-in seasons; the `Result` comes from [`MonthFilter::from_months`].
    pub fn filter(self) -> Result<MonthFilter> {
        MonthFilter::from_months(self.months())
    }
}

impl FromStr for Season {
    type Err = FloodRiskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "northeast_monsoon" => Ok(Season::NortheastMonsoon),
            "southwest_monsoon" => Ok(Season::SouthwestMonsoon),
            "inter_monsoon" => Ok(Season::InterMonsoon),
            _ => Err(FloodRiskError::validation(
                "season",
                format!("unknown season '{s}'"),
            )),
        }
    }
}

/// Event probability restricted to a set of months.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonalProbability {
    pub event_count: u64,
    /// Observed days falling in the selected months
    pub season_days: u64,
    /// Event days per observed day
    pub daily_probability: f64,
    /// Probability of at least one event within the window
    pub window_probability: f64,
}

/// Apply [`probability`] to the days of `series` falling in `months`.
pub fn seasonal_probability(
    series: &TimeSeries,
    threshold_mm: f64,
    months: MonthFilter,
    window_days: u32,
) -> SeasonalProbability {
    let (event_count, season_days) = series.count_exceedances(threshold_mm, months);
    let daily_probability = if season_days == 0 {
        0.0
    } else {
        event_count as f64 / season_days as f64
    };
    SeasonalProbability {
        event_count,
        season_days,
        daily_probability,
        window_probability: probability(event_count, season_days, window_days),
    }
}

// ============================================================================
// TREND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendConfidence {
    High,
    Medium,
    Low,
}

/// Least-squares trend of yearly event counts and the projected probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendEstimate {
    pub direction: TrendDirection,
    /// Events per year
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub confidence: TrendConfidence,
    pub target_year: i32,
    /// Projected event count in `target_year`, floored at zero
    pub predicted_events: f64,
    pub current_probability: f64,
    pub predicted_probability: f64,
}

/// Trend analysis result; too little history is a marker, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrendOutcome {
    InsufficientData {
        years_observed: usize,
        current_probability: f64,
    },
    Trend(TrendEstimate),
}

/// Fit an OLS trend to `(year, event_count)` pairs and project `years_ahead` past the
/// last year.
///
/// Repeated years are summed. The projected probability scales `current_probability`
/// by predicted over mean historical events, capped at 1. A zero slope keeps the
/// current probability.
pub fn trend_from_counts(
    yearly_counts: &[(i32, u64)],
    current_probability: f64,
    years_ahead: u32,
    config: &EventConfig,
) -> TrendOutcome {
    let mut per_year: BTreeMap<i32, u64> = BTreeMap::new();
    for &(year, count) in yearly_counts {
        *per_year.entry(year).or_insert(0) += count;
    }
    if per_year.len() < 2 {
        return TrendOutcome::InsufficientData {
            years_observed: per_year.len(),
            current_probability,
        };
    }

    let n = per_year.len() as f64;
    let xs: Vec<f64> = per_year.keys().map(|&y| f64::from(y)).collect();
    let ys: Vec<f64> = per_year.values().map(|&c| c as f64).collect();
    let x_mean = xs.iter().sum::<f64>() / n;
    let y_mean = ys.iter().sum::<f64>() / n;
    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(&ys) {
        let (dx, dy) = (x - x_mean, y - y_mean);
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;
    let r_squared = if syy > 0.0 {
        (sxy * sxy) / (sxx * syy)
    } else {
        0.0
    };

    let direction = if slope > config.trend_slope_threshold {
        TrendDirection::Increasing
    } else if slope < -config.trend_slope_threshold {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };
    let confidence = if r_squared > config.high_confidence_r2 {
        TrendConfidence::High
    } else if r_squared > config.medium_confidence_r2 {
        TrendConfidence::Medium
    } else {
        TrendConfidence::Low
    };

    let last_year = per_year.keys().next_back().copied().unwrap_or_default();
    let target_year = last_year.saturating_add(i32::try_from(years_ahead).unwrap_or(i32::MAX));
    let predicted_events = (slope * f64::from(target_year) + intercept).max(0.0);
    let predicted_probability = if slope == 0.0 {
        current_probability
    } else {
        let multiplier = if y_mean > 0.0 {
            predicted_events / y_mean
        } else {
            1.0
        };
        (current_probability * multiplier).min(1.0)
    };

    TrendOutcome::Trend(TrendEstimate {
        direction,
        slope,
        intercept,
        r_squared,
        confidence,
        target_year,
        predicted_events,
        current_probability,
        predicted_probability,
    })
}

/// Trend of `kind` events in a daily rainfall series.
///
/// The current probability is the series-wide windowed probability of `kind`.
pub fn trend_from_series(
    series: &TimeSeries,
    kind: EventKind,
    window_days: u32,
    years_ahead: u32,
    config: &EventConfig,
) -> TrendOutcome {
    let threshold = config.thresholds.threshold(kind);
    let (events, days) = series.count_exceedances(threshold, MonthFilter::ALL);
    let current = probability(events, days, window_days);
    trend_from_counts(
        &series.yearly_exceedances(threshold),
        current,
        years_ahead,
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    #[test]
    fn test_zero_days_is_zero_probability() {
        assert_eq!(probability(5, 0, 365), 0.0);
        assert_eq!(probability(0, 100, 365), 0.0);
    }

    #[test]
    fn test_probability_formula() {
        let p: f64 = 150.0 / 3650.0;
        assert_relative_eq!(
            probability(150, 3650, 365),
            1.0 - (1.0 - p).powi(365),
            epsilon = 1e-12
        );
        assert_eq!(probability(10, 10, 1), 1.0);
    }

    #[test]
    fn test_return_period_probability() {
        let rp = ReturnPeriod::new(100).unwrap();
        assert_relative_eq!(return_period_probability(rp, 365.25), 0.01, epsilon = 1e-12);
        let decade = return_period_probability(rp, 3652.5);
        assert_relative_eq!(decade, 1.0 - 0.99_f64.powi(10), epsilon = 1e-12);
        assert_eq!(return_period_probability(rp, 0.0), 0.0);
    }

    #[test]
    fn test_event_kind_parsing() {
        assert_eq!("flood".parse::<EventKind>().unwrap(), EventKind::Flood);
        assert_eq!(
            "Extreme_Rainfall".parse::<EventKind>().unwrap(),
            EventKind::ExtremeRainfall
        );
        assert!("drought".parse::<EventKind>().is_err());
        assert_eq!(
            "southwest-monsoon".parse::<Season>().unwrap(),
            Season::SouthwestMonsoon
        );
    }

    #[test]
    fn test_counts_from_series() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let series = TimeSeries::daily(start, &[99.0, 100.0, 150.0, 199.9, 250.0, 5.0]).unwrap();
        let counts = EventCounts::from_series(&series, &EventThresholds::default());
        assert_eq!(counts.total_days, 6);
        assert_eq!(counts.count(EventKind::HeavyRainfall), 4);
        assert_eq!(counts.count(EventKind::Flood), 3);
        assert_eq!(counts.count(EventKind::ExtremeRainfall), 1);
        let all = counts.all_probabilities(1);
        assert_relative_eq!(all[&EventKind::Flood], 0.5);
    }

    #[test]
    fn test_seasonal_probability() {
        // Jan 30 .. Feb 2
        let start = NaiveDate::from_ymd_opt(2021, 1, 30).unwrap();
        let series = TimeSeries::daily(start, &[160.0, 0.0, 0.0, 170.0]).unwrap();
        let feb = MonthFilter::from_months(&[2]).unwrap();
        let seasonal = seasonal_probability(&series, 150.0, feb, 10);
        assert_eq!(seasonal.season_days, 2);
        assert_eq!(seasonal.event_count, 1);
        assert_relative_eq!(seasonal.daily_probability, 0.5);
        assert_relative_eq!(seasonal.window_probability, 1.0 - 0.5_f64.powi(10));

        let southwest = Season::SouthwestMonsoon.filter().unwrap();
        let empty = seasonal_probability(&series, 150.0, southwest, 10);
        assert_eq!(empty.season_days, 0);
        assert_eq!(empty.window_probability, 0.0);
    }

    #[test]
    fn test_trend_increasing() {
        let config = EventConfig::default();
        let counts = [(2018, 2), (2019, 4), (2020, 6), (2021, 8)];
        match trend_from_counts(&counts, 0.4, 2, &config) {
            TrendOutcome::Trend(t) => {
                assert_eq!(t.direction, TrendDirection::Increasing);
                assert_relative_eq!(t.slope, 2.0, epsilon = 1e-9);
                assert_relative_eq!(t.r_squared, 1.0, epsilon = 1e-9);
                assert_eq!(t.confidence, TrendConfidence::High);
                assert_eq!(t.target_year, 2023);
                assert_relative_eq!(t.predicted_events, 12.0, epsilon = 1e-6);
                // 0.4 × 12 / 5 capped at 1
                assert_relative_eq!(t.predicted_probability, 0.96, epsilon = 1e-6);
            }
            other => panic!("expected trend, got {other:?}"),
        }
    }

    #[test]
    fn test_trend_decreasing_floors_at_zero() {
        let config = EventConfig::default();
        let counts = [(2000, 10), (2001, 5), (2002, 0)];
        let TrendOutcome::Trend(t) = trend_from_counts(&counts, 0.5, 10, &config) else {
            panic!("expected trend");
        };
        assert_eq!(t.direction, TrendDirection::Decreasing);
        assert_eq!(t.predicted_events, 0.0);
        assert_eq!(t.predicted_probability, 0.0);
    }

    #[test]
    fn test_trend_flat_keeps_probability() {
        let config = EventConfig::default();
        let TrendOutcome::Trend(t) = trend_from_counts(&[(2000, 3), (2001, 3)], 0.2, 5, &config)
        else {
            panic!("expected trend");
        };
        assert_eq!(t.direction, TrendDirection::Stable);
        assert_eq!(t.r_squared, 0.0);
        assert_eq!(t.confidence, TrendConfidence::Low);
        assert_eq!(t.predicted_probability, 0.2);
    }

    #[test]
    fn test_trend_needs_two_distinct_years() {
        let config = EventConfig::default();
        assert_eq!(
            trend_from_counts(&[(2020, 3), (2020, 4)], 0.1, 5, &config),
            TrendOutcome::InsufficientData {
                years_observed: 1,
                current_probability: 0.1
            }
        );
    }

    #[test]
    fn test_trend_from_series() {
        let start = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        let series = TimeSeries::daily(start, &[0.0, 160.0, 0.0]).unwrap();
        let outcome = trend_from_series(&series, EventKind::Flood, 365, 1, &EventConfig::default());
        let TrendOutcome::Trend(t) = outcome else {
            panic!("expected trend");
        };
        assert_relative_eq!(t.slope, 1.0);
        assert_relative_eq!(t.current_probability, probability(1, 3, 365));
    }
}
