//! `goto(angle, speed?)`.

use std::time::Duration;

use super::CommandContext;
use crate::angle::{self, Degrees};
use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::encoder::reader::EncoderReader;
use crate::error::DomeError;
use crate::hardware::MotorGpio;
use crate::motor::feedback::FeedbackController;

/// Used when no command-specific `speed` is supplied; matches the
/// normal regime's default step delay.
const DEFAULT_STEP_DELAY_SECONDS: f64 = 0.002;
const REFINE_TOLERANCE_DEG: Degrees = 0.5;
const REFINE_MAX_ITERATIONS: u32 = 6;
const REFINE_MAX_CORRECTION_DEG: Degrees = 10.0;

pub async fn handle_goto<G, R, A, C, Eph>(
    ctx: &mut CommandContext<G, R, A, C, Eph>,
    target_deg: Degrees,
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
    let current = current_position(ctx).await;
    let delta = angle::shortest_path(current, target_deg);

    if delta.abs() > ctx.session.tracking_config.feedback_min_deg {
        ctx.session.driver.rotate(delta, nominal_delay, true)?;
        if ctx.session.encoder.is_available().await {
            let mut controller = FeedbackController::new(&mut ctx.session.driver, &ctx.session.encoder);
            let _ = controller
                .rotate_with_feedback(
                    target_deg,
                    nominal_delay,
                    REFINE_TOLERANCE_DEG,
                    REFINE_MAX_ITERATIONS,
                    REFINE_MAX_CORRECTION_DEG,
                    false,
                    Duration::from_secs(30),
                )
                .await;
        }
    } else if ctx.session.encoder.is_available().await {
        let mut controller = FeedbackController::new(&mut ctx.session.driver, &ctx.session.encoder);
        let _ = controller
            .rotate_with_feedback(
                target_deg,
                nominal_delay,
                REFINE_TOLERANCE_DEG,
                REFINE_MAX_ITERATIONS,
                REFINE_MAX_CORRECTION_DEG,
                false,
                Duration::from_secs(30),
            )
            .await;
    } else {
        ctx.session.driver.rotate(delta, nominal_delay, true)?;
    }

    ctx.last_known_position_deg = angle::normalize_360(target_deg);
    Ok(())
}

async fn current_position<G, R, A, C, Eph>(ctx: &CommandContext<G, R, A, C, Eph>) -> Degrees
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    if let Ok(sample) = ctx.session.encoder.read_angle(500.0).await {
        sample.angle
    } else {
        ctx.last_known_position_deg
    }
}
