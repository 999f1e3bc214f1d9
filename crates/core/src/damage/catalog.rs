//! Damage-function catalog and the fallback chain used to pick a curve
//!
//! Functions are keyed by building type and scope (country, continental region or
//! global). Resolution walks the scopes from most to least specific, then falls back
//! to a synthetic sigmoid for building land uses and finally to a flat linear ramp,
//! so resolution always succeeds. Every tier that was tried and missed is recorded in
//! the returned [`CurveProvenance`].

use crate::core_types::Region;
use crate::damage::function::{BuildingType, DamageCurve, DamageFunction, DamagePoint, LandUse};
use crate::error::{FloodRiskError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// One control point of a reference damage function, as stored in a flat table.
///
/// A row with a `country_code` is country-scoped; otherwise a `region` makes it
/// region-scoped; otherwise it belongs to the global table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageFunctionRow {
    pub building_type: BuildingType,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub region: Option<Region>,
    pub depth_m: f64,
    pub damage_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "scope", content = "key")]
pub enum FunctionScope {
    Country(String),
    Region(Region),
    Global,
}

impl fmt::Display for FunctionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionScope::Country(code) => write!(f, "country {code}"),
            FunctionScope::Region(region) => write!(f, "region {region}"),
            FunctionScope::Global => f.write_str("global"),
        }
    }
}

/// Tier of the fallback chain a curve came from, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionTier {
    Country,
    Region,
    Global,
    Sigmoid,
    FlatLinear,
}

/// Where a damage curve came from and which tiers missed before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveProvenance {
    pub tier: FunctionTier,
    /// Key of the table used; `None` for the synthetic tiers
    pub scope: Option<FunctionScope>,
    /// Tiers tried without a match, in the order they were tried
    pub missed: Vec<FunctionTier>,
}

impl CurveProvenance {
    /// True when anything other than the first tier tried supplied the curve
    pub fn used_fallback(&self) -> bool {
        !self.missed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedCurve {
    pub curve: DamageCurve,
    pub provenance: CurveProvenance,
}

/// Read-only store of reference damage functions.
#[derive(Debug, Clone, Default)]
pub struct DamageFunctionCatalog {
    functions: FxHashMap<(BuildingType, FunctionScope), DamageFunction>,
}

impl DamageFunctionCatalog {
    /// Group flat rows into one function per (building type, scope).
    ///
    /// # Errors
    ///
    /// Returns [`FloodRiskError::InvalidConfig`] when a group does not form a valid
    /// [`DamageFunction`] (fewer than two points, duplicate depths, decreasing or
    /// out-of-range ratios).
    pub fn from_rows(rows: &[DamageFunctionRow]) -> Result<Self> {
        let mut grouped: FxHashMap<(BuildingType, FunctionScope), Vec<DamagePoint>> =
            FxHashMap::default();
        for row in rows {
            let scope = match (&row.country_code, row.region) {
                (Some(code), _) => FunctionScope::Country(code.trim().to_ascii_uppercase()),
                (None, Some(region)) => FunctionScope::Region(region),
                (None, None) => FunctionScope::Global,
            };
            grouped
                .entry((row.building_type, scope))
                .or_default()
                .push(DamagePoint {
                    depth_m: row.depth_m,
                    damage_ratio: row.damage_ratio,
                });
        }

        let mut functions = FxHashMap::default();
        for ((building_type, scope), points) in grouped {
            let function = DamageFunction::new(points).map_err(|e| {
                FloodRiskError::InvalidConfig(format!(
                    "damage function for {building_type} ({scope}): {e}"
                ))
            })?;
            functions.insert((building_type, scope), function);
        }
        Ok(Self { functions })
    }

    /// Global literature tables for the four building land uses.
    pub fn builtin() -> Self {
        let mut functions = FxHashMap::default();
        for (building_type, land_use) in [
            (BuildingType::Residential, LandUse::Residential),
            (BuildingType::Commercial, LandUse::Commercial),
            (BuildingType::Industrial, LandUse::Industrial),
            (BuildingType::Institutional, LandUse::Institutional),
        ] {
            functions.insert(
                (building_type, FunctionScope::Global),
                literature_function(land_use),
            );
        }
        Self { functions }
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn get(&self, building_type: BuildingType, scope: &FunctionScope) -> Option<&DamageFunction> {
        self.functions.get(&(building_type, scope.clone()))
    }

    /// Building types with at least one table, sorted
    pub fn building_types(&self) -> Vec<BuildingType> {
        let mut types: Vec<BuildingType> = self.functions.keys().map(|(b, _)| *b).collect();
        types.sort_unstable();
        types.dedup();
        types
    }

    /// Pick the most specific curve for a building type.
    ///
    /// `region` overrides the region derived from `country_code`. A region that
    /// resolves to [`Region::Global`] is skipped, since the global table is its own tier.
    pub fn resolve(
        &self,
        building_type: BuildingType,
        country_code: Option<&str>,
        region: Option<Region>,
        flat_rate_per_m: f64,
    ) -> ResolvedCurve {
        let country = country_code.map(|c| c.trim().to_ascii_uppercase());
        let region = region.or_else(|| country.as_deref().map(Region::for_country));

        let mut candidates = Vec::with_capacity(3);
        if let Some(code) = country {
            candidates.push((FunctionTier::Country, FunctionScope::Country(code)));
        }
        if let Some(region) = region.filter(|r| *r != Region::Global) {
            candidates.push((FunctionTier::Region, FunctionScope::Region(region)));
        }
        candidates.push((FunctionTier::Global, FunctionScope::Global));

        let mut missed = Vec::new();
        for (tier, scope) in candidates {
            if let Some(function) = self.get(building_type, &scope) {
                return ResolvedCurve {
                    curve: function.clone().into(),
                    provenance: CurveProvenance {
                        tier,
                        scope: Some(scope),
                        missed,
                    },
                };
            }
            debug!("No {} damage function for {}, falling back", building_type, scope);
            missed.push(tier);
        }

        if let Some(land_use) = building_type.land_use() {
            debug!("Using synthetic sigmoid curve for {}", building_type);
            return ResolvedCurve {
                curve: DamageFunction::sigmoid(land_use).into(),
                provenance: CurveProvenance {
                    tier: FunctionTier::Sigmoid,
                    scope: None,
                    missed,
                },
            };
        }

        missed.push(FunctionTier::Sigmoid);
        debug!(
            "No land use for {}, using flat {} per metre",
            building_type, flat_rate_per_m
        );
        ResolvedCurve {
            curve: DamageCurve::Linear {
                rate_per_m: flat_rate_per_m,
            },
            provenance: CurveProvenance {
                tier: FunctionTier::FlatLinear,
                scope: None,
                missed,
            },
        }
    }
}

/// Published depth-damage curves used as the global defaults
fn literature_function(land_use: LandUse) -> DamageFunction {
    let (depths, ratios): (&[f64], &[f64]) = match land_use {
        LandUse::Residential => (
            &[0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 5.0],
            &[0.0, 0.15, 0.35, 0.5, 0.65, 0.8, 0.9, 0.95],
        ),
        LandUse::Commercial => (
            &[0.0, 0.3, 0.6, 1.0, 1.5, 2.0, 3.0, 4.0],
            &[0.0, 0.2, 0.4, 0.6, 0.75, 0.85, 0.92, 0.97],
        ),
        LandUse::Industrial => (
            &[0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 4.0],
            &[0.0, 0.1, 0.25, 0.4, 0.55, 0.7, 0.8, 0.9],
        ),
        LandUse::Institutional => (
            &[0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 5.0],
            &[0.0, 0.15, 0.3, 0.45, 0.6, 0.75, 0.85, 0.95],
        ),
    };
    let points = depths
        .iter()
        .zip(ratios)
        .map(|(&depth_m, &damage_ratio)| DamagePoint {
            depth_m,
            damage_ratio,
        })
        .collect();
    // Literal tables above are sorted and monotone
    DamageFunction::new(points).unwrap_or_else(|_| DamageFunction::sigmoid(land_use))
}
