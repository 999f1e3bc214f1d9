//! Reference tables shared read-only by every calculation
//!
//! Tables arrive as flat JSON row lists. Any table left out of a document keeps its
//! built-in default, so a caller can replace just the damage functions, say, without
//! restating the economics.

use crate::damage::{
    CountryEconomics, CountryExposure, DamageFunctionCatalog, DamageFunctionRow, EconomicsTable,
    ExposureTable, IsoCountry, IsoTable, StateShare, UncertaintyRow, UncertaintyTable,
};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Raw row lists as loaded from a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceTables {
    pub damage_functions: Option<Vec<DamageFunctionRow>>,
    pub country_economics: Option<Vec<CountryEconomics>>,
    pub iso_countries: Option<Vec<IsoCountry>>,
    pub country_exposures: Option<Vec<CountryExposure>>,
    pub state_shares: Option<Vec<StateShare>>,
    pub uncertainty: Option<Vec<UncertaintyRow>>,
}

#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub damage_functions: DamageFunctionCatalog,
    pub economics: EconomicsTable,
    pub iso: IsoTable,
    pub exposure: ExposureTable,
    pub uncertainty: UncertaintyTable,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceData {
    pub fn builtin() -> Self {
        Self {
            damage_functions: DamageFunctionCatalog::builtin(),
            economics: EconomicsTable::builtin(),
            iso: IsoTable::builtin(),
            exposure: ExposureTable::builtin(),
            uncertainty: UncertaintyTable::builtin(),
        }
    }

    /// Build from row lists, keeping the built-in table for every `None`.
    ///
    /// Country exposures and state shares are replaced together: supplying either one
    /// drops both built-in exposure tables.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FloodRiskError::InvalidConfig`] when a supplied table is
    /// malformed.
    pub fn from_tables(tables: ReferenceTables) -> Result<Self> {
        let mut data = Self::builtin();
        if let Some(rows) = tables.damage_functions {
            data.damage_functions = DamageFunctionCatalog::from_rows(&rows)?;
        }
        if let Some(rows) = tables.country_economics {
            data.economics = EconomicsTable::from_rows(rows)?;
        }
        if let Some(rows) = tables.iso_countries {
            data.iso = IsoTable::new(rows);
        }
        if tables.country_exposures.is_some() || tables.state_shares.is_some() {
            data.exposure = ExposureTable::new(
                tables.country_exposures.unwrap_or_default(),
                tables.state_shares.unwrap_or_default(),
            )?;
        }
        if let Some(rows) = tables.uncertainty {
            data.uncertainty = UncertaintyTable::from_rows(&rows)?;
        }
        info!(
            damage_functions = data.damage_functions.len(),
            "Reference data loaded"
        );
        Ok(data)
    }

    /// # Errors
    ///
    /// Returns [`crate::FloodRiskError::InvalidConfig`] when the document does not parse
    /// or a table is malformed.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_tables(serde_json::from_str(json)?)
    }
}
