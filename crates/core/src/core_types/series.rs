//! Daily magnitude time series and block-maxima extraction

use crate::error::{FloodRiskError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One daily observation. `NaN` marks a missing value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// Rainfall (mm) or discharge (m³/s); non-negative
    pub magnitude: f64,
}

/// Ordered daily series of (date, magnitude) pairs.
///
/// Invariants: dates strictly increasing, magnitudes non-negative or `NaN`.
/// The series is owned by the caller; analyses borrow it and never mutate it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series from observations.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::Validation`] if dates are not strictly increasing or a
    /// magnitude is negative or infinite.
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        for pair in observations.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(FloodRiskError::validation(
                    "date",
                    format!(
                        "series dates must be strictly increasing ({} follows {})",
                        pair[1].date, pair[0].date
                    ),
                ));
            }
        }
        if let Some(bad) = observations
            .iter()
            .find(|o| o.magnitude < 0.0 || o.magnitude.is_infinite())
        {
            return Err(FloodRiskError::validation(
                "magnitude",
                format!("must be non-negative and finite, got {} on {}", bad.magnitude, bad.date),
            ));
        }
        Ok(Self { observations })
    }

    /// Build a daily series starting at `start`, one value per day.
    ///
    /// # Errors
    ///
    /// Same as [`TimeSeries::new`].
    pub fn daily(start: NaiveDate, values: &[f64]) -> Result<Self> {
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, &magnitude)| Observation {
                date: start + Duration::days(i as i64),
                magnitude,
            })
            .collect();
        Self::new(observations)
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Maximum magnitude per calendar year, skipping missing values.
    ///
    /// Recomputed on every call.
    pub fn annual_maxima(&self) -> AnnualMaxima {
        let mut per_year: BTreeMap<i32, f64> = BTreeMap::new();
        for obs in self.observations.iter().filter(|o| !o.magnitude.is_nan()) {
            per_year
                .entry(obs.date.year())
                .and_modify(|m| *m = m.max(obs.magnitude))
                .or_insert(obs.magnitude);
        }
        AnnualMaxima {
            years: per_year.keys().copied().collect(),
            values: per_year.values().copied().collect(),
        }
    }

    /// Number of observations in `months` and how many of them reach `threshold`.
    ///
    /// Returns `(event_days, observed_days)`; missing values count toward neither.
    pub fn count_exceedances(&self, threshold: f64, months: MonthFilter) -> (u64, u64) {
        self.observations
            .iter()
            .filter(|o| !o.magnitude.is_nan() && months.contains(o.date.month()))
            .fold((0, 0), |(events, days), o| {
                (events + u64::from(o.magnitude >= threshold), days + 1)
            })
    }

    /// Per-year count of days reaching `threshold`, in ascending year order.
    pub fn yearly_exceedances(&self, threshold: f64) -> Vec<(i32, u64)> {
        let mut per_year: BTreeMap<i32, u64> = BTreeMap::new();
        for obs in self.observations.iter().filter(|o| !o.magnitude.is_nan()) {
            *per_year.entry(obs.date.year()).or_insert(0) += u64::from(obs.magnitude >= threshold);
        }
        per_year.into_iter().collect()
    }
}

/// One maximum per calendar year of a [`TimeSeries`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnualMaxima {
    years: Vec<i32>,
    values: Vec<f64>,
}

impl AnnualMaxima {
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Set of calendar months (1 = January … 12 = December).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct MonthFilter(u16);

impl MonthFilter {
    /// Every month of the year
    pub const ALL: MonthFilter = MonthFilter(0b1_1111_1111_1110);

    /// Filter accepting exactly `months`.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::Validation`] for a month outside 1..=12 or an empty list.
    pub fn from_months(months: &[u32]) -> Result<Self> {
        if months.is_empty() {
            return Err(FloodRiskError::validation(
                "months",
                "month filter must name at least one month",
            ));
        }
        let mut mask = 0u16;
        for &m in months {
            if !(1..=12).contains(&m) {
                return Err(FloodRiskError::validation(
                    "months",
                    format!("month must be in 1..=12, got {m}"),
                ));
            }
            mask |= 1 << m;
        }
        Ok(MonthFilter(mask))
    }

    #[inline]
    pub fn contains(self, month: u32) -> bool {
        month <= 12 && self.0 & (1 << month) != 0
    }

    /// Months in ascending order
    pub fn months(self) -> Vec<u32> {
        (1..=12).filter(|&m| self.contains(m)).collect()
    }
}

impl TryFrom<Vec<u32>> for MonthFilter {
    type Error = FloodRiskError;
    fn try_from(months: Vec<u32>) -> Result<Self> {
        MonthFilter::from_months(&months)
    }
}

impl From<MonthFilter> for Vec<u32> {
    fn from(filter: MonthFilter) -> Vec<u32> {
        filter.months()
    }
}
