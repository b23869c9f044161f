//! `tracking_start(object_name)` / `tracking_stop`.

use super::CommandContext;
use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::encoder::reader::EncoderReader;
use crate::error::DomeError;
use crate::hardware::MotorGpio;
use crate::ipc::session_record::SessionRecord;

pub async fn handle_tracking_start<G, R, A, C, Eph>(
    ctx: &mut CommandContext<G, R, A, C, Eph>,
    object_name: &str,
    skip_goto: bool,
) -> Result<(), DomeError>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    ctx.session.driver.clear_stop_request();
    ctx.session.start_tracking(object_name, skip_goto).await
}

pub fn handle_tracking_stop<G, R, A, C, Eph>(
    ctx: &mut CommandContext<G, R, A, C, Eph>,
) -> Option<SessionRecord>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    ctx.session.stop()
}
