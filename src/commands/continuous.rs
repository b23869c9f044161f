//! `continuous(direction)`: one degree of open-loop rotation
//! every 100 ms until stopped. See `ContinuousState` in `mod.rs` for
//! why this is a cooperative tick rather than a dedicated thread.

use std::time::{Duration, Instant};

use super::{CommandContext, ContinuousState, CONTINUOUS_STEP_DEGREES, CONTINUOUS_STEP_PERIOD_MS};
use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::encoder::reader::EncoderReader;
use crate::hardware::MotorGpio;
use crate::ipc::command_file::Direction;

const STEP_DELAY_SECONDS: f64 = 0.001;

pub fn start<G, R, A, C, Eph>(ctx: &mut CommandContext<G, R, A, C, Eph>, direction: Direction)
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    ctx.session.driver.clear_stop_request();
    ctx.continuous = Some(ContinuousState {
        direction,
        next_step_at: Instant::now(),
    });
    tracing::info!(?direction, "continuous rotation started");
}

/// Emits at most one step per call; a no-op unless continuous mode is
/// active and its 100 ms cursor has elapsed.
pub fn tick<G, R, A, C, Eph>(ctx: &mut CommandContext<G, R, A, C, Eph>)
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    let Some(state) = ctx.continuous.as_mut() else {
        return;
    };
    let now = Instant::now();
    if now < state.next_step_at {
        return;
    }
    let delta = if state.direction.forward() {
        CONTINUOUS_STEP_DEGREES
    } else {
        -CONTINUOUS_STEP_DEGREES
    };
    state.next_step_at = now + Duration::from_millis(CONTINUOUS_STEP_PERIOD_MS);
    if let Err(err) = ctx.session.driver.rotate(delta, STEP_DELAY_SECONDS, false) {
        tracing::warn!(?err, "continuous rotation step failed");
        ctx.last_error = Some(err.to_string());
        ctx.continuous = None;
        return;
    }
    ctx.last_known_position_deg = crate::angle::normalize_360(ctx.last_known_position_deg + delta);
}
