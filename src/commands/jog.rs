//! `jog(delta, speed?)`: open-loop relative rotation, position read
//! back via encoder when available.

use super::CommandContext;
use crate::angle::{self, Degrees};
use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::encoder::reader::EncoderReader;
use crate::error::DomeError;
use crate::hardware::MotorGpio;

const DEFAULT_STEP_DELAY_SECONDS: f64 = 0.002;

pub async fn handle_jog<G, R, A, C, Eph>(
    ctx: &mut CommandContext<G, R, A, C, Eph>,
    delta_deg: Degrees,
    speed: Option<f64>,
) -> Result<(), DomeError>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    ctx.session.driver.clear_stop_request();
    let nominal_delay = speed.unwrap_or(DEFAULT_STEP_DELAY_SECONDS);
    ctx.session.driver.rotate(delta_deg, nominal_delay, true)?;

    ctx.last_known_position_deg = if let Ok(sample) = ctx.session.encoder.read_angle(500.0).await {
        sample.angle
    } else {
        angle::normalize_360(ctx.last_known_position_deg + delta_deg)
    };
    Ok(())
}
