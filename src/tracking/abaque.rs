//! Empirical dome-position lookup table: maps a target's (altitude,
//! azimuth) to the dome azimuth that keeps its slit aligned, via
//! bilinear interpolation over a table of measured points. Stored on
//! disk as JSON, one row per altitude, each row a sorted list of
//! (azimuth, dome_azimuth) pairs.

use serde::{Deserialize, Serialize};

use crate::angle::{self, Degrees};
use crate::error::AbaqueError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbaqueRow {
    pub altitude_deg: Degrees,
    /// Sorted by azimuth.
    pub points: Vec<(Degrees, Degrees)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbaqueData {
    /// Sorted by altitude.
    pub rows: Vec<AbaqueRow>,
}

#[derive(Debug, Clone, Copy)]
pub struct LookupResult {
    pub dome_azimuth_deg: Degrees,
    pub in_bounds: bool,
}

pub struct Abaque {
    data: AbaqueData,
}

impl Abaque {
    pub fn load(path: &str) -> Result<Self, AbaqueError> {
        let body = std::fs::read_to_string(path).map_err(|e| AbaqueError::Unreadable {
            path: path.to_string(),
            detail: e.to_string(),
        })?;
        let data: AbaqueData =
            serde_json::from_str(&body).map_err(|e| AbaqueError::Malformed {
                path: path.to_string(),
                detail: e.to_string(),
            })?;
        if data.rows.is_empty() {
            return Err(AbaqueError::Malformed {
                path: path.to_string(),
                detail: "no altitude rows".into(),
            });
        }
        Ok(Abaque { data })
    }

    pub fn from_data(data: AbaqueData) -> Self {
        Abaque { data }
    }

    /// Bilinear interpolation over (altitude, object azimuth) with
    /// circular handling of the dome-azimuth output, falling back to
    /// nearest neighbour on any interpolation failure. Inputs are
    /// clamped into the table's range; `in_bounds` reflects whether
    /// clamping was needed.
    pub fn lookup(&self, altitude_deg: Degrees, azimuth_deg: Degrees) -> LookupResult {
        let rows = &self.data.rows;
        let alt_min = rows.first().unwrap().altitude_deg;
        let alt_max = rows.last().unwrap().altitude_deg;
        let alt_in_bounds = (alt_min..=alt_max).contains(&altitude_deg);
        let clamped_alt = altitude_deg.clamp(alt_min, alt_max);

        let (lo_row, hi_row, alt_frac) = match bracket_rows(rows, clamped_alt) {
            Some(b) => b,
            None => return self.nearest_neighbour(altitude_deg, azimuth_deg),
        };

        let lo_point = interpolate_row(lo_row, azimuth_deg);
        let hi_point = interpolate_row(hi_row, azimuth_deg);

        let (lo_val, lo_in_bounds) = match lo_point {
            Some(v) => v,
            None => return self.nearest_neighbour(altitude_deg, azimuth_deg),
        };
        let (hi_val, hi_in_bounds) = match hi_point {
            Some(v) => v,
            None => return self.nearest_neighbour(altitude_deg, azimuth_deg),
        };

        let dome_azimuth_deg = circular_lerp(lo_val, hi_val, alt_frac);
        LookupResult {
            dome_azimuth_deg,
            in_bounds: alt_in_bounds && lo_in_bounds && hi_in_bounds,
        }
    }

    fn nearest_neighbour(&self, altitude_deg: Degrees, azimuth_deg: Degrees) -> LookupResult {
        let mut best: Option<(f64, Degrees)> = None;
        for row in &self.data.rows {
            for &(az, dome_az) in &row.points {
                let d_alt = row.altitude_deg - altitude_deg;
                let d_az = angle::shortest_path(azimuth_deg, az);
                let dist = (d_alt * d_alt + d_az * d_az).sqrt();
                if best.map(|(best_dist, _)| dist < best_dist).unwrap_or(true) {
                    best = Some((dist, dome_az));
                }
            }
        }
        LookupResult {
            dome_azimuth_deg: best.map(|(_, v)| v).unwrap_or(0.0),
            in_bounds: false,
        }
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "rows={} altitude_range=[{:.1},{:.1}]",
            self.data.rows.len(),
            self.data.rows.first().map(|r| r.altitude_deg).unwrap_or(0.0),
            self.data.rows.last().map(|r| r.altitude_deg).unwrap_or(0.0),
        )
    }
}

fn bracket_rows(rows: &[AbaqueRow], altitude_deg: Degrees) -> Option<(&AbaqueRow, &AbaqueRow, f64)> {
    if rows.len() == 1 {
        return Some((&rows[0], &rows[0], 0.0));
    }
    for window in rows.windows(2) {
        let (lo, hi) = (&window[0], &window[1]);
        if (lo.altitude_deg..=hi.altitude_deg).contains(&altitude_deg) {
            let span = hi.altitude_deg - lo.altitude_deg;
            let frac = if span.abs() < f64::EPSILON {
                0.0
            } else {
                (altitude_deg - lo.altitude_deg) / span
            };
            return Some((lo, hi, frac));
        }
    }
    None
}

/// Linear interpolation of a row's dome azimuth at `azimuth_deg`, with
/// an `in_bounds` flag for the azimuth axis.
fn interpolate_row(row: &AbaqueRow, azimuth_deg: Degrees) -> Option<(Degrees, bool)> {
    let points = &row.points;
    if points.is_empty() {
        return None;
    }
    if points.len() == 1 {
        return Some((points[0].1, points[0].0 == azimuth_deg));
    }
    let az_min = points.first().unwrap().0;
    let az_max = points.last().unwrap().0;
    let in_bounds = (az_min..=az_max).contains(&azimuth_deg);
    let clamped = azimuth_deg.clamp(az_min, az_max);

    for window in points.windows(2) {
        let (lo, hi) = (window[0], window[1]);
        if (lo.0..=hi.0).contains(&clamped) {
            let span = hi.0 - lo.0;
            let frac = if span.abs() < f64::EPSILON {
                0.0
            } else {
                (clamped - lo.0) / span
            };
            return Some((circular_lerp(lo.1, hi.1, frac), in_bounds));
        }
    }
    None
}

/// Interpolates between two dome-azimuth values following the shorter
/// arc, so a midpoint between 350° and 10° lands on 0°, not 180°.
fn circular_lerp(from: Degrees, to: Degrees, frac: f64) -> Degrees {
    let delta = angle::shortest_path(from, to);
    angle::normalize_360(from + delta * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_abaque() -> Abaque {
        Abaque::from_data(AbaqueData {
            rows: vec![
                AbaqueRow {
                    altitude_deg: 10.0,
                    points: vec![(0.0, 350.0), (90.0, 80.0), (180.0, 170.0)],
                },
                AbaqueRow {
                    altitude_deg: 50.0,
                    points: vec![(0.0, 10.0), (90.0, 100.0), (180.0, 190.0)],
                },
            ],
        })
    }

    #[test]
    fn exact_grid_point_returns_grid_value() {
        let abaque = sample_abaque();
        let result = abaque.lookup(10.0, 90.0);
        assert_float_eq::assert_float_absolute_eq!(result.dome_azimuth_deg, 80.0, 1e-9);
        assert!(result.in_bounds);
    }

    #[test]
    fn interpolates_across_the_360_boundary_on_the_short_arc() {
        let abaque = sample_abaque();
        // At altitude 10, azimuth 0 => dome 350; at altitude 50, azimuth 0 => dome 10.
        // Midpoint altitude (30) should land near 0, the short way around.
        let result = abaque.lookup(30.0, 0.0);
        let wrapped = if result.dome_azimuth_deg > 180.0 {
            result.dome_azimuth_deg - 360.0
        } else {
            result.dome_azimuth_deg
        };
        assert!(wrapped.abs() < 1.0, "expected near 0, got {}", result.dome_azimuth_deg);
    }

    #[test]
    fn out_of_bounds_query_is_clamped_and_flagged() {
        let abaque = sample_abaque();
        let result = abaque.lookup(90.0, 90.0);
        assert!(!result.in_bounds);
    }

    #[test]
    fn nearest_neighbour_used_for_single_point_rows() {
        let abaque = Abaque::from_data(AbaqueData {
            rows: vec![AbaqueRow {
                altitude_deg: 20.0,
                points: vec![(45.0, 50.0)],
            }],
        });
        let result = abaque.lookup(20.0, 45.0);
        assert_float_eq::assert_float_absolute_eq!(result.dome_azimuth_deg, 50.0, 1e-9);
    }
}
