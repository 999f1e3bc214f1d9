//! Depth-damage functions and interpolation

use crate::core_types::Meters;
use crate::error::{FloodRiskError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Asset class whose damage is assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingType {
    Residential,
    Commercial,
    Industrial,
    Institutional,
    Agriculture,
    Infrastructure,
    Transport,
}

impl BuildingType {
    pub const ALL: [BuildingType; 7] = [
        BuildingType::Residential,
        BuildingType::Commercial,
        BuildingType::Industrial,
        BuildingType::Institutional,
        BuildingType::Agriculture,
        BuildingType::Infrastructure,
        BuildingType::Transport,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            BuildingType::Residential => "residential",
            BuildingType::Commercial => "commercial",
            BuildingType::Industrial => "industrial",
            BuildingType::Institutional => "institutional",
            BuildingType::Agriculture => "agriculture",
            BuildingType::Infrastructure => "infrastructure",
            BuildingType::Transport => "transport",
        }
    }

    /// Coarse land-use category; `None` for non-building assets
    pub const fn land_use(self) -> Option<LandUse> {
        match self {
            BuildingType::Residential => Some(LandUse::Residential),
            BuildingType::Commercial => Some(LandUse::Commercial),
            BuildingType::Industrial => Some(LandUse::Industrial),
            BuildingType::Institutional => Some(LandUse::Institutional),
            BuildingType::Agriculture | BuildingType::Infrastructure | BuildingType::Transport => {
                None
            }
        }
    }
}

impl fmt::Display for BuildingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for BuildingType {
    type Err = FloodRiskError;

    fn from_str(s: &str) -> Result<Self> {
        BuildingType::ALL
            .into_iter()
            .find(|b| b.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                FloodRiskError::validation("building_type", format!("unsupported building type '{s}'"))
            })
    }
}

/// Coarse land-use category used by the synthetic curves and flat valuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandUse {
    Residential,
    Commercial,
    Industrial,
    Institutional,
}

impl LandUse {
    /// Steepness and midpoint depth (m) of the synthetic sigmoid curve
    const fn sigmoid_parameters(self) -> (f64, f64) {
        match self {
            LandUse::Residential => (2.0, 1.5),
            LandUse::Commercial => (2.5, 1.2),
            LandUse::Industrial => (1.8, 1.8),
            LandUse::Institutional => (2.2, 1.4),
        }
    }
}

/// One control point of a [`DamageFunction`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamagePoint {
    pub depth_m: f64,
    pub damage_ratio: f64,
}

/// Piecewise-linear depth → damage-ratio curve.
///
/// Invariants: at least two points, depths strictly increasing, ratios in [0, 1] and
/// non-decreasing with depth. Outside the tabulated depth range the ratio is held at
/// the boundary value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DamageFunction {
    points: Vec<DamagePoint>,
}

impl DamageFunction {
    /// Build a function from control points in any order.
    ///
    /// # Errors
    ///
    /// - [`FloodRiskError::InsufficientData`] with fewer than two points
    /// - [`FloodRiskError::Validation`] for non-finite values, ratios outside [0, 1],
    ///   repeated depths or a ratio that decreases with depth
    pub fn new(mut points: Vec<DamagePoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(FloodRiskError::InsufficientData {
                what: "damage function interpolation",
                required: 2,
                actual: points.len(),
            });
        }
        for p in &points {
            if !p.depth_m.is_finite() || !p.damage_ratio.is_finite() {
                return Err(FloodRiskError::validation(
                    "damage_function",
                    format!("non-finite control point ({}, {})", p.depth_m, p.damage_ratio),
                ));
            }
            if !(0.0..=1.0).contains(&p.damage_ratio) {
                return Err(FloodRiskError::validation(
                    "damage_function",
                    format!("damage ratio {} outside [0, 1]", p.damage_ratio),
                ));
            }
        }
        points.sort_by(|a, b| a.depth_m.total_cmp(&b.depth_m));
        for w in points.windows(2) {
            if w[1].depth_m == w[0].depth_m {
                return Err(FloodRiskError::validation(
                    "damage_function",
                    format!("repeated depth {} m", w[0].depth_m),
                ));
            }
            if w[1].damage_ratio < w[0].damage_ratio {
                return Err(FloodRiskError::validation(
                    "damage_function",
                    format!(
                        "damage ratio decreases from {} at {} m to {} at {} m",
                        w[0].damage_ratio, w[0].depth_m, w[1].damage_ratio, w[1].depth_m
                    ),
                ));
            }
        }
        Ok(Self { points })
    }

    /// Build from `(depth_m, damage_ratio)` pairs.
    ///
    /// # Errors
    ///
    /// Same as [`DamageFunction::new`].
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(depth_m, damage_ratio)| DamagePoint {
                    depth_m,
                    damage_ratio,
                })
                .collect(),
        )
    }

    /// Synthetic logistic curve `1 / (1 + e^(−k(d − m)))` sampled every 0.5 m from 0 to 5.5 m.
    pub fn sigmoid(land_use: LandUse) -> Self {
        let (k, midpoint) = land_use.sigmoid_parameters();
        let points = (0..12)
            .map(|i| {
                let depth_m = f64::from(i) * 0.5;
                DamagePoint {
                    depth_m,
                    damage_ratio: (1.0 / (1.0 + (-k * (depth_m - midpoint)).exp())).min(1.0),
                }
            })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[DamagePoint] {
        &self.points
    }

    /// Interpolated damage ratio at `depth`, clamped to the table's end values.
    pub fn ratio(&self, depth: Meters) -> f64 {
        let d = depth.value();
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if d <= first.depth_m {
            return first.damage_ratio;
        }
        if d >= last.depth_m {
            return last.damage_ratio;
        }
        // First point strictly deeper than d; 1 ≤ upper < len here
        let upper = self.points.partition_point(|p| p.depth_m <= d);
        let (lo, hi) = (self.points[upper - 1], self.points[upper]);
        let t = (d - lo.depth_m) / (hi.depth_m - lo.depth_m);
        lo.damage_ratio + t * (hi.damage_ratio - lo.damage_ratio)
    }
}

/// Damage curve used for a calculation: a tabulated function or a linear ramp.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DamageCurve {
    Table { function: DamageFunction },
    /// `min(1, rate_per_m × depth)`
    Linear { rate_per_m: f64 },
}

impl DamageCurve {
    pub fn ratio(&self, depth: Meters) -> f64 {
        match self {
            DamageCurve::Table { function } => function.ratio(depth),
            DamageCurve::Linear { rate_per_m } => (rate_per_m * depth.value()).clamp(0.0, 1.0),
        }
    }
}

impl From<DamageFunction> for DamageCurve {
    fn from(function: DamageFunction) -> Self {
        DamageCurve::Table { function }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_interpolation() {
        let f = DamageFunction::from_pairs(&[(0.0, 0.0), (1.0, 0.5), (2.0, 1.0)]).unwrap();
        assert_relative_eq!(f.ratio(Meters::new(1.5)), 0.75, epsilon = 1e-9);
        assert_relative_eq!(f.ratio(Meters::new(0.25)), 0.125, epsilon = 1e-9);
        assert_eq!(f.ratio(Meters::new(1.0)), 0.5);
    }

    #[test]
    fn test_clamps_at_table_ends() {
        let f = DamageFunction::from_pairs(&[(0.5, 0.1), (3.0, 0.8)]).unwrap();
        assert_eq!(f.ratio(Meters::ZERO), 0.1);
        assert_eq!(f.ratio(Meters::new(0.5)), 0.1);
        assert_eq!(f.ratio(Meters::new(3.0)), 0.8);
        assert_eq!(f.ratio(Meters::new(15.0)), 0.8);
    }

    #[test]
    fn test_unsorted_points_are_ordered() {
        let f = DamageFunction::from_pairs(&[(2.0, 1.0), (0.0, 0.0), (1.0, 0.4)]).unwrap();
        let depths: Vec<f64> = f.points().iter().map(|p| p.depth_m).collect();
        assert_eq!(depths, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_rejects_malformed_functions() {
        assert!(matches!(
            DamageFunction::from_pairs(&[(1.0, 0.5)]),
            Err(FloodRiskError::InsufficientData { required: 2, actual: 1, .. })
        ));
        assert!(DamageFunction::from_pairs(&[(0.0, 0.0), (1.0, 1.2)]).is_err());
        assert!(DamageFunction::from_pairs(&[(0.0, 0.5), (1.0, 0.2)]).is_err());
        assert!(DamageFunction::from_pairs(&[(1.0, 0.2), (1.0, 0.3)]).is_err());
        assert!(DamageFunction::from_pairs(&[(0.0, f64::NAN), (1.0, 0.3)]).is_err());
    }

    #[test]
    fn test_sigmoid_is_monotone_and_bounded() {
        for land_use in [
            LandUse::Residential,
            LandUse::Commercial,
            LandUse::Industrial,
            LandUse::Institutional,
        ] {
            let f = DamageFunction::sigmoid(land_use);
            assert_eq!(f.points().len(), 12);
            assert_eq!(f.points()[11].depth_m, 5.5);
            let (_, midpoint) = land_use.sigmoid_parameters();
            assert_relative_eq!(f.ratio(Meters::new(midpoint)), 0.5, epsilon = 0.05);
            for w in f.points().windows(2) {
                assert!(w[1].damage_ratio >= w[0].damage_ratio);
                assert!(w[1].damage_ratio <= 1.0);
            }
        }
    }

    #[test]
    fn test_linear_curve() {
        let curve = DamageCurve::Linear { rate_per_m: 0.3 };
        assert_relative_eq!(curve.ratio(Meters::new(2.0)), 0.6, epsilon = 1e-9);
        assert_eq!(curve.ratio(Meters::new(5.0)), 1.0);
    }

    #[test]
    fn test_building_type_parsing() {
        assert_eq!("Commercial".parse::<BuildingType>().unwrap(), BuildingType::Commercial);
        assert!("castle".parse::<BuildingType>().is_err());
        assert_eq!(BuildingType::Transport.land_use(), None);
    }
}
