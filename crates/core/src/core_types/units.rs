//! Semantic unit types for flood quantities
//!
//! Newtype wrappers keep flood depths and return periods from being mixed up with
//! the many other bare numbers flowing through the engine (ratios, currency, counts).
//!
//! # Usage
//! ```
//! use flood_risk_core::core_types::units::{Meters, ReturnPeriod};
//!
//! let depth = Meters::new(1.5);
//! assert!((*depth - 1.5).abs() < f64::EPSILON);
//!
//! let rp = ReturnPeriod::new(100).unwrap();
//! assert_eq!(rp.annual_probability(), 0.01);
//! ```

use crate::error::{FloodRiskError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Mul, Sub};

/// Compare f64 values with total ordering using Rust's built-in `total_cmp`
#[inline]
fn f64_total_cmp(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

// ============================================================================
// DEPTH
// ============================================================================

/// Water depth (or flood intensity expressed as depth) in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Meters(f64);

impl Eq for Meters {}

impl PartialOrd for Meters {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Meters {
    fn cmp(&self, other: &Self) -> Ordering {
        f64_total_cmp(self.0, other.0)
    }
}

impl Deref for Meters {
    type Target = f64;
    #[inline]
    fn deref(&self) -> &f64 {
        &self.0
    }
}

impl Meters {
    /// Zero depth
    pub const ZERO: Meters = Meters(0.0);

    /// Create a new depth from a value already known to be valid.
    ///
    /// # Panics
    ///
    /// Panics when `value` is negative or NaN. Use [`Meters::try_new`] for unchecked
    /// input.
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f64) -> Self {
        assert!(value >= 0.0, "Meters::new: negative depth is invalid");
        Meters(value)
    }

    /// Checked constructor.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::Validation`] on `depth` for a negative or non-finite
    /// value.
    pub fn try_new(value: f64) -> Result<Self> {
        if value.is_finite() && value >= 0.0 {
            Ok(Meters(value))
        } else {
            Err(FloodRiskError::validation(
                "depth",
                format!("must be finite and non-negative, got {value}"),
            ))
        }
    }

    /// Get the raw f64 value
    #[inline]
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Raise the depth to at least `floor`
    #[inline]
    #[must_use]
    pub fn at_least(self, floor: Meters) -> Meters {
        Meters(self.0.max(floor.0))
    }
}

impl Add for Meters {
    type Output = Meters;
    fn add(self, rhs: Meters) -> Meters {
        Meters(self.0 + rhs.0)
    }
}

impl Sub for Meters {
    type Output = Meters;
    /// Saturates at zero; depth differences never go negative.
    fn sub(self, rhs: Meters) -> Meters {
        Meters((self.0 - rhs.0).max(0.0))
    }
}

impl Mul<f64> for Meters {
    type Output = Meters;
    fn mul(self, rhs: f64) -> Meters {
        Meters(self.0 * rhs)
    }
}

impl fmt::Display for Meters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m", self.0)
    }
}

// ============================================================================
// RETURN PERIOD
// ============================================================================

/// Average recurrence interval of an event, in whole years
///
/// The annual exceedance probability is exactly `1 / years`; it is never re-derived
/// from fitted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ReturnPeriod(u32);

impl ReturnPeriod {
    /// Create a return period of `years`.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::Validation`] when `years` is zero.
    pub fn new(years: u32) -> Result<Self> {
        if years == 0 {
            return Err(FloodRiskError::validation(
                "return_period",
                "must be a positive number of years, got 0",
            ));
        }
        Ok(ReturnPeriod(years))
    }

    /// Parse a list of year counts, failing on the first invalid entry.
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::Validation`] when any entry is zero.
    pub fn from_years(years: &[u32]) -> Result<Vec<Self>> {
        years.iter().map(|&y| Self::new(y)).collect()
    }

    /// Recurrence interval in years
    #[inline]
    pub fn years(self) -> u32 {
        self.0
    }

    /// Annual exceedance probability, `1 / T`
    #[inline]
    pub fn annual_probability(self) -> f64 {
        1.0 / f64::from(self.0)
    }

    /// Annual non-exceedance probability, `1 - 1 / T`
    #[inline]
    pub fn non_exceedance_probability(self) -> f64 {
        1.0 - self.annual_probability()
    }
}

impl TryFrom<u32> for ReturnPeriod {
    type Error = FloodRiskError;
    fn try_from(years: u32) -> Result<Self> {
        ReturnPeriod::new(years)
    }
}

impl From<ReturnPeriod> for u32 {
    fn from(rp: ReturnPeriod) -> u32 {
        rp.0
    }
}

impl fmt::Display for ReturnPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-year", self.0)
    }
}
