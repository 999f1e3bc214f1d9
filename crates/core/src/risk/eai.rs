//! Expected annual impact over a hazard curve

use crate::core_types::{ClimateScenario, Meters, ReturnPeriod};
use crate::damage::{CurveProvenance, DamageCurve};
use crate::error::{FloodRiskError, Result};
use crate::hazard::HazardCurve;
use crate::risk::uncertainty::UncertaintyBounds;
use serde::Serialize;
use tracing::debug;

/// Depth at which the default impact curve reaches total loss (m)
pub const TOTAL_LOSS_DEPTH_M: f64 = 3.0;

/// Impact curve `min(1, intensity / 3 m)` used when no depth-damage function is given.
pub fn linear_impact_curve() -> DamageCurve {
    DamageCurve::Linear {
        rate_per_m: 1.0 / TOTAL_LOSS_DEPTH_M,
    }
}

/// Contribution of one hazard-curve row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnPeriodImpact {
    pub return_period: ReturnPeriod,
    pub annual_probability: f64,
    pub intensity: Meters,
    pub damage_ratio: f64,
    pub impact: f64,
}

impl ReturnPeriodImpact {
    /// `annual_probability × impact`
    pub fn expected(&self) -> f64 {
        self.annual_probability * self.impact
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EaiResult {
    pub location: String,
    pub scenario: ClimateScenario,
    pub expected_annual_impact: f64,
    pub exposure: f64,
    /// `expected_annual_impact / exposure`
    pub eai_ratio: f64,
    pub breakdown: Vec<ReturnPeriodImpact>,
    pub uncertainty: Option<UncertaintyBounds>,
    /// Fallback tier of the depth-damage function; `None` for the default impact curve
    pub damage_function_provenance: Option<CurveProvenance>,
}

impl EaiResult {
    /// Attach normal-approximation bounds with the given standard deviation ratio.
    pub fn with_uncertainty(mut self, std_ratio: f64) -> Self {
        self.uncertainty = Some(UncertaintyBounds::new(self.expected_annual_impact, std_ratio));
        self
    }
}

/// Sum `annual_probability × exposure × damage_ratio` over every row of `curve`.
///
/// The sum runs over exactly the curve's rows; there is no interpolation between
/// return periods and no tail term.
///
/// # Errors
///
/// Returns [`FloodRiskError::ZeroExposure`] when `exposure` is not a positive number.
pub fn calculate_eai(
    location: &str,
    curve: &HazardCurve,
    exposure: f64,
    damage: &DamageCurve,
) -> Result<EaiResult> {
    if !(exposure.is_finite() && exposure > 0.0) {
        return Err(FloodRiskError::ZeroExposure { exposure });
    }

    let breakdown: Vec<ReturnPeriodImpact> = curve
        .rows()
        .iter()
        .map(|row| {
            let damage_ratio = damage.ratio(row.intensity);
            ReturnPeriodImpact {
                return_period: row.return_period,
                annual_probability: row.annual_probability,
                intensity: row.intensity,
                damage_ratio,
                impact: exposure * damage_ratio,
            }
        })
        .collect();
    let expected_annual_impact: f64 = breakdown.iter().map(ReturnPeriodImpact::expected).sum();

    debug!(
        location,
        eai = expected_annual_impact,
        rows = breakdown.len(),
        "Computed expected annual impact"
    );
    Ok(EaiResult {
        location: location.to_string(),
        scenario: curve.scenario,
        expected_annual_impact,
        exposure,
        eai_ratio: expected_annual_impact / exposure,
        breakdown,
        uncertainty: None,
        damage_function_provenance: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::damage::DamageFunction;
    use approx::assert_relative_eq;

    fn rp(years: u32) -> ReturnPeriod {
        ReturnPeriod::new(years).unwrap()
    }

    #[test]
    fn test_single_row_eai() {
        let curve = HazardCurve::from_rows("site", [(rp(100), Meters::new(0.9))]).unwrap();
        let result = calculate_eai("site", &curve, 1e9, &linear_impact_curve()).unwrap();
        assert_relative_eq!(result.breakdown[0].damage_ratio, 0.3, epsilon = 1e-12);
        assert_relative_eq!(result.expected_annual_impact, 3_000_000.0, max_relative = 1e-12);
        assert_relative_eq!(result.eai_ratio, 0.003, max_relative = 1e-12);
    }

    #[test]
    fn test_eai_is_sum_of_rows() {
        let curve = HazardCurve::from_rows(
            "site",
            [
                (rp(10), Meters::new(0.5)),
                (rp(50), Meters::new(1.2)),
                (rp(100), Meters::new(2.0)),
            ],
        )
        .unwrap();
        let function = DamageFunction::from_pairs(&[(0.0, 0.0), (1.0, 0.5), (2.0, 1.0)]).unwrap();
        let result = calculate_eai("site", &curve, 1_000.0, &function.into()).unwrap();
        let expected = 0.1 * 250.0 + 0.02 * 600.0 + 0.01 * 1_000.0;
        assert_relative_eq!(result.expected_annual_impact, expected, max_relative = 1e-12);
        assert_eq!(result.breakdown.len(), 3);
        assert!(result.eai_ratio <= 1.0);
    }

    #[test]
    fn test_zero_exposure_rejected() {
        let curve = HazardCurve::from_rows("site", [(rp(10), Meters::new(0.5))]).unwrap();
        for exposure in [0.0, -5.0, f64::NAN] {
            assert!(matches!(
                calculate_eai("site", &curve, exposure, &linear_impact_curve()),
                Err(FloodRiskError::ZeroExposure { .. })
            ));
        }
    }

    #[test]
    fn test_uncertainty_variant() {
        let curve = HazardCurve::from_rows("site", [(rp(10), Meters::new(3.0))]).unwrap();
        let result = calculate_eai("site", &curve, 1_000.0, &linear_impact_curve())
            .unwrap()
            .with_uncertainty(0.2);
        let bounds = result.uncertainty.unwrap();
        assert_relative_eq!(bounds.std, 20.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.ci68.lower, 80.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.ci95.upper, 100.0 + 1.96 * 20.0, epsilon = 1e-9);
    }
}
