//! `stop`: cooperative stop of any ongoing rotation or continuous-mode
//! cursor. Does not end an active tracking session — that's
//! `tracking_stop`.

use super::CommandContext;
use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::encoder::reader::EncoderReader;
use crate::hardware::MotorGpio;

pub fn handle_stop<G, R, A, C, Eph>(ctx: &mut CommandContext<G, R, A, C, Eph>)
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    ctx.session.driver.request_stop();
    ctx.continuous = None;
    tracing::info!("stop command received");
}
