//! Motor service entry point: wires up the session, command dispatch
//! loop, and status publishing.

use std::sync::{Arc, Mutex, RwLock as StdRwLock};
use std::time::{Duration, Instant};

use dome_core::angle::Degrees;
use dome_core::astro::AstroMathLibrary;
use dome_core::catalog::{FixedStarCatalog, NoEphemerides};
use dome_core::commands::CommandContext;
use dome_core::config::Config;
use dome_core::encoder::reader::FileEncoderReader;
use dome_core::hardware::gpio::{RppalMotorGpio, SimulatedMotorGpio};
use dome_core::ipc::command_file::MotorCommand;
use dome_core::ipc::encoder_file::EncoderSample;
use dome_core::ipc::session_record::{prune_old_sessions, SessionRecord};
use dome_core::ipc::status_file::{BoundedLog, MotorStatus, ServiceMode, ServiceStatus};
use dome_core::ipc::IpcFile;
use dome_core::motor::driver::MotorDriver;
use dome_core::stop_token::StopToken;
use dome_core::tracking::abaque::{Abaque, AbaqueData, AbaqueRow};
use dome_core::tracking::regime::{AdaptiveRegimeManager, Regime};
use dome_core::tracking::session::Session;

const MAIN_LOOP_PERIOD: Duration = Duration::from_millis(50);
const ERROR_RECOVERY_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETAINED_SESSIONS: usize = 100;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::load("dome-motord") {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration load failed, exiting");
            std::process::exit(1);
        }
    };

    let simulate = std::env::var("DOME_SIMULATE").is_ok();
    let stop_token = StopToken::new();

    let encoder_path = std::path::Path::new(&config.encoder.ipc_dir).join("ems22_position.json");
    let encoder_reader = FileEncoderReader::new(
        IpcFile::<EncoderSample>::new(encoder_path),
        config.encoder.max_age_ms,
    );

    let abaque = load_abaque(&config.tracking.abaque_path);
    let regime_manager = AdaptiveRegimeManager::new(config.adaptive.clone());
    let tracking_config = config.tracking.clone();
    let site = config.site.clone();

    let result = if simulate {
        tracing::warn!("DOME_SIMULATE set, running against an in-memory motor");
        let position = Arc::new(Mutex::new(0.0));
        let gpio = SimulatedMotorGpio::new(position, config.motor.steps_per_dome_revolution());
        let driver = MotorDriver::new(gpio, config.motor.clone(), stop_token.clone());
        let session = Session::new(
            driver,
            encoder_reader,
            AstroMathLibrary,
            FixedStarCatalog::default(),
            NoEphemerides,
            regime_manager,
            abaque,
            tracking_config,
            site,
            stop_token,
        );
        run(session, config).await
    } else {
        let gpio = match RppalMotorGpio::open(&config.motor) {
            Ok(gpio) => gpio,
            Err(e) => {
                tracing::error!(error = %e, "failed to open motor GPIO, exiting");
                std::process::exit(1);
            }
        };
        let driver = MotorDriver::new(gpio, config.motor.clone(), stop_token.clone());
        let session = Session::new(
            driver,
            encoder_reader,
            AstroMathLibrary,
            FixedStarCatalog::default(),
            NoEphemerides,
            regime_manager,
            abaque,
            tracking_config,
            site,
            stop_token,
        );
        run(session, config).await
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "motor service terminated with error");
        std::process::exit(1);
    }
}

/// Falls back to a single flat row (identity mapping) if the configured
/// abaque file can't be loaded, so the service still starts in a
/// degraded but usable state.
fn load_abaque(path: &str) -> Abaque {
    match Abaque::load(path) {
        Ok(abaque) => abaque,
        Err(e) => {
            tracing::warn!(error = %e, path, "abaque load failed, using identity fallback");
            Abaque::from_data(AbaqueData {
                rows: vec![AbaqueRow {
                    altitude_deg: 0.0,
                    points: vec![(0.0, 0.0), (180.0, 180.0), (359.9, 359.9)],
                }],
            })
        }
    }
}

async fn run<G, R, A, C, Eph>(
    session: Session<G, R, A, C, Eph>,
    config: Config,
) -> Result<(), dome_core::error::DomeError>
where
    G: dome_core::hardware::MotorGpio,
    R: dome_core::encoder::reader::EncoderReader,
    A: dome_core::astro::AstronomyLibrary,
    C: dome_core::catalog::Catalog,
    Eph: dome_core::catalog::Ephemerides,
{
    let shutdown = Arc::new(StdRwLock::new(false));
    {
        let shutdown = shutdown.clone();
        let _ = ctrlc::set_handler(move || {
            tracing::info!("shutdown signal received");
            *shutdown.write().unwrap() = true;
        });
    }

    let command_path = std::path::Path::new(&config.encoder.ipc_dir).join("motor_command.json");
    let status_path = std::path::Path::new(&config.encoder.ipc_dir).join("motor_status.json");
    let sessions_dir = std::path::Path::new(&config.encoder.ipc_dir).join("sessions");
    let _ = tokio::fs::create_dir_all(&sessions_dir).await;

    let command_file = IpcFile::<MotorCommand>::new(command_path);
    let status_file = IpcFile::<MotorStatus>::new(status_path);

    let mut ctx = CommandContext::new(session);
    let mut tracking_log = BoundedLog::default();
    let mut error_since: Option<Instant> = None;

    #[cfg(unix)]
    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]);

    loop {
        if *shutdown.read().unwrap() {
            tracing::info!("motor service shutting down");
            return Ok(());
        }

        if let Ok(command) = command_file.read().await {
            match ctx.dispatch(command).await {
                Ok(Some(record)) => {
                    tracking_log.push(
                        format!("tracking stopped: {} corrections", record.total_corrections),
                        "info",
                    );
                    persist_session(&sessions_dir, &record).await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "command dispatch failed");
                    ctx.last_error = Some(e.to_string());
                    error_since = Some(Instant::now());
                }
            }
        }

        ctx.tick_continuous();

        if ctx.session.is_active() {
            if let Err(e) = ctx.session.check_and_correct(chrono::Utc::now()).await {
                tracing::warn!(error = %e, "tracking correction failed");
                ctx.last_error = Some(e.to_string());
                error_since = Some(Instant::now());
            }
        }

        if let Some(since) = error_since {
            if since.elapsed() > ERROR_RECOVERY_TIMEOUT {
                tracing::info!("error state auto-cleared after recovery timeout");
                ctx.last_error = None;
                error_since = None;
            }
        }

        let status = build_status(&ctx, &tracking_log, std::env::var("DOME_SIMULATE").is_ok());
        if let Err(e) = status_file.write_atomic(&status).await {
            tracing::warn!(error = %e, "failed to publish motor status");
        }

        #[cfg(unix)]
        let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Watchdog]);

        tokio::time::sleep(MAIN_LOOP_PERIOD).await;
    }
}

async fn persist_session(sessions_dir: &std::path::Path, record: &SessionRecord) {
    let path = sessions_dir.join(format!("{}.json", record.session_id));
    let file = IpcFile::<SessionRecord>::new(path);
    if let Err(e) = file.write_atomic(record).await {
        tracing::warn!(error = %e, "failed to persist session record");
    }
    if let Err(e) = prune_old_sessions(sessions_dir, MAX_RETAINED_SESSIONS).await {
        tracing::warn!(error = %e, "failed to prune old session records");
    }
}

fn build_status<G, R, A, C, Eph>(
    ctx: &CommandContext<G, R, A, C, Eph>,
    tracking_log: &BoundedLog,
    simulation: bool,
) -> MotorStatus
where
    G: dome_core::hardware::MotorGpio,
    R: dome_core::encoder::reader::EncoderReader,
    A: dome_core::astro::AstronomyLibrary,
    C: dome_core::catalog::Catalog,
    Eph: dome_core::catalog::Ephemerides,
{
    let (status, mode, tracking_object): (ServiceStatus, ServiceMode, Option<String>) =
        if ctx.last_error.is_some() {
            (ServiceStatus::Error, ServiceMode::Idle, None)
        } else if ctx.session.is_active() {
            let mode = match ctx.session.regime_manager.current() {
                Some(Regime::Critical) => ServiceMode::Critical,
                Some(Regime::Continuous) => ServiceMode::Continuous,
                _ => ServiceMode::Normal,
            };
            (ServiceStatus::Tracking, mode, ctx.session.current_object_name())
        } else if ctx.continuous.is_some() {
            (ServiceStatus::Moving, ServiceMode::Idle, None)
        } else {
            (ServiceStatus::Idle, ServiceMode::Idle, None)
        };

    let position: Degrees = ctx.last_known_position_deg;

    MotorStatus {
        status,
        position,
        target: None,
        progress: 100,
        mode,
        tracking_object,
        simulation,
        error: ctx.last_error.clone(),
        last_update: chrono::Utc::now(),
        tracking_logs: tracking_log.entries(),
        tracking_info: None,
    }
}
