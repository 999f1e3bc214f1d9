//! Confidence bounds on a monetary loss

use serde::Serialize;

/// Two-sided z-score of the 95% normal interval
pub const Z_95: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Normal-approximation bounds around a loss estimate.
///
/// Lower bounds are clamped at 0; a loss cannot be negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UncertaintyBounds {
    /// Standard deviation as a fraction of the loss
    pub std_ratio: f64,
    pub std: f64,
    pub ci68: Interval,
    pub ci95: Interval,
}

impl UncertaintyBounds {
    pub fn new(loss: f64, std_ratio: f64) -> Self {
        let std = loss * std_ratio;
        let interval = |z: f64| Interval {
            lower: (loss - z * std).max(0.0),
            upper: loss + z * std,
        };
        Self {
            std_ratio,
            std,
            ci68: interval(1.0),
            ci95: interval(Z_95),
        }
    }
}
