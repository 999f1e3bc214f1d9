//! Locations, coordinates and continental regions
//!
//! A [`Location`] is identified by name, coordinates, or both. Country and region tags
//! are optional; when absent they are resolved downstream (see
//! [`crate::damage::CountryResolver`] and [`Region::for_country`]).

use crate::error::Result;
use crate::validation::validate_coordinates;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated latitude/longitude pair in decimal degrees.
///
/// Invariant: latitude ∈ [-90, 90], longitude ∈ [-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    /// Create a validated coordinate pair.
    ///
    /// # Errors
    ///
    /// Returns [`crate::FloodRiskError::Validation`] when either value is out of range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        validate_coordinates(latitude, longitude)
    }

    /// Only called by the validator after range checks.
    pub(crate) const fn new_unchecked(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

#[derive(Deserialize)]
struct RawCoordinates {
    latitude: f64,
    longitude: f64,
}

impl<'de> Deserialize<'de> for Coordinates {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawCoordinates::deserialize(deserializer)?;
        Coordinates::new(raw.latitude, raw.longitude).map_err(serde::de::Error::custom)
    }
}

/// Continental grouping used to pick a regional damage-function subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Europe,
    NorthAmerica,
    CentralSouthAmerica,
    Asia,
    Africa,
    Oceania,
    /// Catch-all for countries without a regional table
    Global,
}

const EUROPE: &[&str] = &[
    "DE", "FR", "IT", "ES", "NL", "BE", "AT", "CH", "SE", "NO", "DK", "FI", "PL", "CZ", "HU",
    "RO", "BG", "GR", "PT", "IE", "LU", "SK", "SI", "EE", "LV", "LT", "CY", "MT", "HR", "GB",
    "IS", "LI", "MC", "SM", "VA", "AD", "AL", "BA", "ME", "MK", "RS", "XK", "MD", "UA", "BY",
    "RU",
];
const NORTH_AMERICA: &[&str] = &["US", "CA", "MX", "GT", "BZ", "SV", "HN", "NI", "CR", "PA"];
const CENTRAL_SOUTH_AMERICA: &[&str] = &[
    "BR", "AR", "CL", "PE", "CO", "VE", "EC", "BO", "PY", "UY", "GY", "SR", "GF",
];
const ASIA: &[&str] = &[
    "CN", "IN", "JP", "KR", "TH", "VN", "MY", "SG", "ID", "PH", "BD", "PK", "LK", "MM", "KH",
    "LA", "BN", "TL", "MN", "KZ", "UZ", "TM", "TJ", "KG", "AF", "IR", "IQ", "SY", "JO", "LB",
    "IL", "PS", "SA", "YE", "OM", "AE", "QA", "BH", "KW", "TR", "GE", "AM", "AZ",
];
const AFRICA: &[&str] = &[
    "NG", "ET", "EG", "ZA", "KE", "UG", "DZ", "SD", "MA", "AO", "GH", "MZ", "MG", "CM", "CI",
    "NE", "BF", "ML", "MW", "ZM", "SO", "SN", "TD", "ZW", "GN", "RW", "BJ", "TN", "BI", "ER",
    "SL", "TG", "CF", "LY", "LR", "MR", "GA", "BW", "LS", "GQ", "GM", "GW", "SZ", "DJ", "KM",
    "CV", "ST", "SC", "MU",
];
const OCEANIA: &[&str] = &[
    "AU", "NZ", "PG", "FJ", "SB", "NC", "PF", "VU", "WS", "KI", "FM", "TO", "MH", "PW", "CK",
    "NU", "TK", "TV", "NR", "AS", "GU", "MP", "VI", "PR", "UM",
];

impl Region {
    /// All continental regions, excluding [`Region::Global`]
    pub const CONTINENTAL: [Region; 6] = [
        Region::Europe,
        Region::NorthAmerica,
        Region::CentralSouthAmerica,
        Region::Asia,
        Region::Africa,
        Region::Oceania,
    ];

    /// ISO alpha-2 codes belonging to this region
    pub fn member_codes(self) -> &'static [&'static str] {
        match self {
            Region::Europe => EUROPE,
            Region::NorthAmerica => NORTH_AMERICA,
            Region::CentralSouthAmerica => CENTRAL_SOUTH_AMERICA,
            Region::Asia => ASIA,
            Region::Africa => AFRICA,
            Region::Oceania => OCEANIA,
            Region::Global => &[],
        }
    }

    /// Region for an ISO alpha-2 code (case-insensitive), or [`Region::Global`]
    pub fn for_country(country_code: &str) -> Region {
        Region::CONTINENTAL
            .into_iter()
            .find(|region| {
                region
                    .member_codes()
                    .iter()
                    .any(|code| code.eq_ignore_ascii_case(country_code))
            })
            .unwrap_or(Region::Global)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Europe => "Europe",
            Region::NorthAmerica => "North America",
            Region::CentralSouthAmerica => "Central & South America",
            Region::Asia => "Asia",
            Region::Africa => "Africa",
            Region::Oceania => "Oceania",
            Region::Global => "Global",
        };
        f.write_str(name)
    }
}

/// A place whose hazard or damage is being assessed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Human-readable identifier, e.g. `"Kelantan"` or `"Malaysia (Country)"`
    pub name: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// ISO alpha-2 country code
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub region: Option<Region>,
}

impl Location {
    /// Location identified by name only
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinates: None,
            country_code: None,
            region: None,
        }
    }

    /// Location identified by a coordinate pair; the name is the formatted pair.
    pub fn at(coordinates: Coordinates) -> Self {
        Self {
            name: format!(
                "{:.4},{:.4}",
                coordinates.latitude(),
                coordinates.longitude()
            ),
            coordinates: Some(coordinates),
            country_code: None,
            region: None,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Self {
        self.coordinates = Some(coordinates);
        self
    }

    pub fn with_country(mut self, country_code: impl Into<String>) -> Self {
        self.country_code = Some(country_code.into());
        self
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
