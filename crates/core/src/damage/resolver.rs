//! Country inference from coordinates

use crate::core_types::Coordinates;
use crate::damage::exposure::DEFAULT_COUNTRY_KEY;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maps a coordinate pair to an ISO alpha-2 country code.
///
/// Implementations must be pure and thread-safe; batch calculations share one
/// resolver across worker threads.
pub trait CountryResolver: Send + Sync {
    /// Country code for the point, or `"DEFAULT"` when unknown
    fn resolve(&self, coordinates: Coordinates) -> String;
}

/// Inclusive latitude/longitude rectangle tagged with a country code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryBox {
    pub country_code: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl CountryBox {
    fn contains(&self, coordinates: Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&coordinates.latitude())
            && (self.min_lon..=self.max_lon).contains(&coordinates.longitude())
    }
}

/// First-match rectangular geofence.
///
/// Boxes overlap (e.g. the US and Canada boxes), so order matters: earlier boxes win.
#[derive(Debug, Clone)]
pub struct BoundingBoxResolver {
    boxes: Vec<CountryBox>,
}

impl BoundingBoxResolver {
    pub fn new(boxes: Vec<CountryBox>) -> Self {
        Self { boxes }
    }
}

impl Default for BoundingBoxResolver {
    fn default() -> Self {
        let b = |code: &str, lat: (f64, f64), lon: (f64, f64)| CountryBox {
            country_code: code.to_string(),
            min_lat: lat.0,
            max_lat: lat.1,
            min_lon: lon.0,
            max_lon: lon.1,
        };
        Self::new(vec![
            b("US", (25.0, 49.0), (-125.0, -66.0)),
            b("MX", (14.0, 33.0), (-118.0, -86.0)),
            b("CA", (42.0, 70.0), (-141.0, -52.0)),
            b("BR", (-34.0, 5.0), (-74.0, -35.0)),
            b("MY", (0.8, 7.5), (99.5, 119.5)),
            b("DE", (36.0, 71.0), (-10.0, 40.0)),
            b("CN", (20.0, 50.0), (70.0, 140.0)),
            b("AU", (-35.0, 37.0), (110.0, 155.0)),
        ])
    }
}

impl CountryResolver for BoundingBoxResolver {
    fn resolve(&self, coordinates: Coordinates) -> String {
        match self.boxes.iter().find(|b| b.contains(coordinates)) {
            Some(hit) => hit.country_code.clone(),
            None => {
                debug!(
                    "No country box contains ({}, {})",
                    coordinates.latitude(),
                    coordinates.longitude()
                );
                DEFAULT_COUNTRY_KEY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lat: f64, lon: f64) -> Coordinates {
        Coordinates::new(lat, lon).unwrap()
    }

    #[test]
    fn test_default_boxes() {
        let resolver = BoundingBoxResolver::default();
        assert_eq!(resolver.resolve(at(3.139, 101.6869)), "MY");
        assert_eq!(resolver.resolve(at(19.43, -99.13)), "MX");
        assert_eq!(resolver.resolve(at(-23.55, -46.63)), "BR");
        assert_eq!(resolver.resolve(at(52.52, 13.40)), "DE");
        assert_eq!(resolver.resolve(at(0.0, -30.0)), "DEFAULT");
    }

    #[test]
    fn test_first_match_wins() {
        // Toronto sits in both the US and Canada boxes
        let resolver = BoundingBoxResolver::default();
        assert_eq!(resolver.resolve(at(43.65, -79.38)), "US");
    }

    #[test]
    fn test_custom_resolver() {
        struct Fixed;
        impl CountryResolver for Fixed {
            fn resolve(&self, _: Coordinates) -> String {
                "TH".to_string()
            }
        }
        let resolver: Box<dyn CountryResolver> = Box::new(Fixed);
        assert_eq!(resolver.resolve(at(13.75, 100.5)), "TH");
    }
}
