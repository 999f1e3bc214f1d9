//! Return levels derived from a fitted GEV distribution

use crate::core_types::ReturnPeriod;
use crate::error::{FloodRiskError, Result};
use crate::hazard::gev::GevDistribution;
use serde::Serialize;

/// How the bounds of a [`ReturnLevel`] were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum ConfidenceMethod {
    /// Fixed ±fraction around the point estimate.
    ///
    /// A heuristic band, not a statistically derived interval.
    FixedBand { fraction: f64 },
}

/// One row of a [`ReturnLevelTable`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnLevel {
    pub return_period: ReturnPeriod,
    pub magnitude: f64,
    /// Exactly `1 / return_period`
    pub annual_probability: f64,
    pub confidence_lower: f64,
    pub confidence_upper: f64,
}

/// Return levels sorted ascending by return period.
///
/// Construction guarantees strictly increasing periods, so `annual_probability`
/// is strictly decreasing down the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnLevelTable {
    rows: Vec<ReturnLevel>,
    confidence: ConfidenceMethod,
}

impl ReturnLevelTable {
    pub fn rows(&self) -> &[ReturnLevel] {
        &self.rows
    }

    pub fn confidence_method(&self) -> ConfidenceMethod {
        self.confidence
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for `period`, if it was requested
    pub fn get(&self, period: ReturnPeriod) -> Option<&ReturnLevel> {
        self.rows
            .binary_search_by_key(&period, |row| row.return_period)
            .ok()
            .map(|i| &self.rows[i])
    }
}

/// Evaluate the GEV quantile at `p = 1 − 1/T` for each requested period.
///
/// Periods may arrive in any order; the table is returned sorted ascending.
///
/// # Errors
///
/// Returns [`FloodRiskError::Validation`] for an empty or duplicated period list, a
/// 1-year period (`p = 0` has no finite quantile), or a band fraction outside [0, 1).
pub fn calculate_return_levels(
    distribution: &GevDistribution,
    return_periods: &[ReturnPeriod],
    band: f64,
) -> Result<ReturnLevelTable> {
    if return_periods.is_empty() {
        return Err(FloodRiskError::validation(
            "return_periods",
            "at least one return period is required",
        ));
    }
    if !(0.0..1.0).contains(&band) {
        return Err(FloodRiskError::validation(
            "confidence_band",
            format!("must be in [0, 1), got {band}"),
        ));
    }

    let mut sorted = return_periods.to_vec();
    sorted.sort_unstable();
    if sorted[0].years() <= 1 {
        return Err(FloodRiskError::validation(
            "return_periods",
            format!("return levels need periods above 1 year, got {}", sorted[0]),
        ));
    }
    if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(FloodRiskError::validation(
            "return_periods",
            format!("duplicate return period {}", pair[0]),
        ));
    }

    let rows = sorted
        .into_iter()
        .map(|return_period| {
            let magnitude = distribution.quantile(return_period.non_exceedance_probability());
            ReturnLevel {
                return_period,
                magnitude,
                annual_probability: return_period.annual_probability(),
                confidence_lower: magnitude * (1.0 - band),
                confidence_upper: magnitude * (1.0 + band),
            }
        })
        .collect();

    Ok(ReturnLevelTable {
        rows,
        confidence: ConfidenceMethod::FixedBand { fraction: band },
    })
}
