//! Astronomy library trait: given equatorial coordinates and a
//! timestamp, returns horizontal coordinates. Coordinate precession,
//! sidereal time and refraction live behind this boundary so the
//! tracking session never needs to know how they're computed.
//!
//! The concrete implementation reuses the `astro_math` module verbatim
//! (sidereal time, hour angle, alt/az conversions).

use crate::angle::Degrees;
use crate::astro_math;

pub struct HorizontalPosition {
    pub altitude_deg: Degrees,
    pub azimuth_deg: Degrees,
}

pub trait AstronomyLibrary: Send + Sync {
    fn equatorial_to_horizontal(
        &self,
        ra_deg: Degrees,
        dec_deg: Degrees,
        time: chrono::DateTime<chrono::Utc>,
        latitude_deg: Degrees,
        longitude_deg: Degrees,
    ) -> HorizontalPosition;
}

pub struct AstroMathLibrary;

impl AstronomyLibrary for AstroMathLibrary {
    fn equatorial_to_horizontal(
        &self,
        ra_deg: Degrees,
        dec_deg: Degrees,
        time: chrono::DateTime<chrono::Utc>,
        latitude_deg: Degrees,
        longitude_deg: Degrees,
    ) -> HorizontalPosition {
        let ra_hours = astro_math::deg_to_hours(ra_deg);
        let ha = astro_math::calculate_hour_angle(time, longitude_deg, ra_hours);
        let altitude_deg = astro_math::calculate_alt_from_ha_dec(ha, dec_deg, latitude_deg);
        let azimuth_deg = astro_math::calculate_az_from_ha_dec(ha, dec_deg, latitude_deg);
        HorizontalPosition {
            altitude_deg,
            azimuth_deg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn equatorial_to_horizontal_matches_astro_math_directly() {
        let lib = AstroMathLibrary;
        let time = chrono::Utc.with_ymd_and_hms(2021, 1, 30, 21, 20, 0).unwrap();
        let pos = lib.equatorial_to_horizontal(180.0, 36.466667, time, 52.5, 90.0);
        assert!((-90.0..=90.0).contains(&pos.altitude_deg));
        assert!((0.0..=360.0).contains(&pos.azimuth_deg));
    }
}
