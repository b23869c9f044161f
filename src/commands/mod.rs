//! IPC command dispatch, one module per command kind.

pub mod continuous;
pub mod goto;
pub mod jog;
pub mod stop;
pub mod tracking;

use std::time::Instant;

use uuid::Uuid;

use crate::angle::Degrees;
use crate::astro::AstronomyLibrary;
use crate::catalog::{Catalog, Ephemerides};
use crate::encoder::reader::EncoderReader;
use crate::error::DomeError;
use crate::hardware::MotorGpio;
use crate::ipc::command_file::{CommandKind, Direction, MotorCommand};
use crate::ipc::session_record::SessionRecord;
use crate::tracking::session::Session;

/// State of the `continuous(direction)` command: a cooperative tick
/// driven by the main command loop rather than a dedicated background
/// thread, since continuous rotation and tracking corrections already
/// share the single motor driver.
pub struct ContinuousState {
    pub direction: Direction,
    pub next_step_at: Instant,
}

pub const CONTINUOUS_STEP_DEGREES: Degrees = 1.0;
pub const CONTINUOUS_STEP_PERIOD_MS: u64 = 100;

/// Everything the motor service's command loop needs across ticks:
/// the session (driver + encoder + tracking state), the idempotence
/// guard, and the continuous-rotation cursor.
pub struct CommandContext<G, R, A, C, Eph>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    pub session: Session<G, R, A, C, Eph>,
    pub last_command_id: Option<Uuid>,
    pub continuous: Option<ContinuousState>,
    pub last_known_position_deg: Degrees,
    pub last_error: Option<String>,
}

impl<G, R, A, C, Eph> CommandContext<G, R, A, C, Eph>
where
    G: MotorGpio,
    R: EncoderReader,
    A: AstronomyLibrary,
    C: Catalog,
    Eph: Ephemerides,
{
    pub fn new(session: Session<G, R, A, C, Eph>) -> Self {
        CommandContext {
            session,
            last_command_id: None,
            continuous: None,
            last_known_position_deg: 0.0,
            last_error: None,
        }
    }

    /// Dispatches one command, ignoring a command whose id matches the
    /// last one dispatched. Returns `Ok(Some(record))` when a tracking
    /// session just ended.
    pub async fn dispatch(&mut self, command: MotorCommand) -> Result<Option<SessionRecord>, DomeError> {
        if self.last_command_id == Some(command.id) {
            tracing::debug!(id = ?command.id, "duplicate command id, ignoring");
            return Ok(None);
        }
        self.last_command_id = Some(command.id);

        match command.kind {
            CommandKind::Stop => {
                stop::handle_stop(self);
                Ok(None)
            }
            CommandKind::Goto { angle, speed } => {
                goto::handle_goto(self, angle, speed).await?;
                Ok(None)
            }
            CommandKind::Jog { delta, speed } => {
                jog::handle_jog(self, delta, speed).await?;
                Ok(None)
            }
            CommandKind::Continuous { direction } => {
                continuous::start(self, direction);
                Ok(None)
            }
            CommandKind::TrackingStart { object, skip_goto } => {
                tracking::handle_tracking_start(self, &object, skip_goto).await?;
                Ok(None)
            }
            CommandKind::TrackingStop => Ok(tracking::handle_tracking_stop(self)),
            CommandKind::Status => Ok(None),
        }
    }

    /// Advances the continuous-rotation cursor by at most one step;
    /// called once per main-loop iteration.
    pub fn tick_continuous(&mut self) {
        continuous::tick(self);
    }
}
