//! Object catalog and planetary ephemeris traits. Object lookup and full
//! ephemeris computation live behind these boundaries; the tracking
//! session only ever asks for a name and gets back coordinates.

use crate::angle::Degrees;

#[derive(Debug, Clone, Copy)]
pub struct ObjectPosition {
    pub ra_deg: Degrees,
    pub dec_deg: Degrees,
    pub is_planet: bool,
}

pub trait Catalog: Send + Sync {
    fn lookup(&self, object_name: &str) -> Option<ObjectPosition>;
}

pub trait Ephemerides: Send + Sync {
    /// Recomputes (ra, dec) for a planet at `time` as seen from
    /// (latitude, longitude); `None` if the name isn't a known planet.
    fn planet_position(
        &self,
        object_name: &str,
        time: chrono::DateTime<chrono::Utc>,
        latitude_deg: Degrees,
        longitude_deg: Degrees,
    ) -> Option<(Degrees, Degrees)>;
}

/// A short fixed-star catalog, sufficient for running and testing this
/// crate without a full external catalog/ephemeris service. Coordinates
/// are J2000 RA/Dec in degrees.
pub struct FixedStarCatalog {
    entries: Vec<(&'static str, ObjectPosition)>,
}

impl Default for FixedStarCatalog {
    fn default() -> Self {
        FixedStarCatalog {
            entries: vec![
                (
                    "polaris",
                    ObjectPosition {
                        ra_deg: 37.95,
                        dec_deg: 89.26,
                        is_planet: false,
                    },
                ),
                (
                    "vega",
                    ObjectPosition {
                        ra_deg: 279.23,
                        dec_deg: 38.78,
                        is_planet: false,
                    },
                ),
                (
                    "sirius",
                    ObjectPosition {
                        ra_deg: 101.29,
                        dec_deg: -16.72,
                        is_planet: false,
                    },
                ),
                (
                    "betelgeuse",
                    ObjectPosition {
                        ra_deg: 88.79,
                        dec_deg: 7.41,
                        is_planet: false,
                    },
                ),
            ],
        }
    }
}

impl Catalog for FixedStarCatalog {
    fn lookup(&self, object_name: &str) -> Option<ObjectPosition> {
        let needle = object_name.to_lowercase();
        self.entries
            .iter()
            .find(|(name, _)| *name == needle)
            .map(|(_, pos)| *pos)
    }
}

/// No built-in ephemeris model; planets resolve to `None` until a real
/// ephemeris library is wired in behind this trait.
pub struct NoEphemerides;

impl Ephemerides for NoEphemerides {
    fn planet_position(
        &self,
        _object_name: &str,
        _time: chrono::DateTime<chrono::Utc>,
        _latitude_deg: Degrees,
        _longitude_deg: Degrees,
    ) -> Option<(Degrees, Degrees)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_known_star_case_insensitively() {
        let catalog = FixedStarCatalog::default();
        let found = catalog.lookup("Vega").unwrap();
        assert!(!found.is_planet);
        assert_float_eq::assert_float_absolute_eq!(found.ra_deg, 279.23);
    }

    #[test]
    fn unknown_object_returns_none() {
        let catalog = FixedStarCatalog::default();
        assert!(catalog.lookup("not-a-real-object").is_none());
    }
}
