//! Encoder daemon entry point: wires up the SPI bus, reference switch,
//! TCP query port, and IPC publishing loop.

use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;

use dome_core::config::Config;
use dome_core::encoder::{query, EncoderDaemon};
use dome_core::error::EncoderError;
use dome_core::hardware::{ReferenceSwitch, SpiBus};
use dome_core::ipc::encoder_file::EncoderSample;
use dome_core::ipc::IpcFile;

/// A fixed-angle stand-in for `RppalSpiBus`/`RppalReferenceSwitch`, used
/// when `DOME_SIMULATE=1`.
struct NullSpiBus;
impl SpiBus for NullSpiBus {
    fn read_raw_bytes(&mut self) -> Result<[u8; 2], EncoderError> {
        Ok([0x00, 0x00])
    }
}

struct NullReferenceSwitch;
impl ReferenceSwitch for NullReferenceSwitch {
    fn is_active(&mut self) -> Result<bool, EncoderError> {
        Ok(false)
    }
}

/// Startup SPI acquisition can race other processes briefly releasing
/// the bus (e.g. a previous instance of this daemon shutting down), so
/// the initial open gets a few exponential-backoff attempts before the
/// daemon gives up and exits.
fn open_spi_with_retry(
    bus: u8,
    select: u8,
) -> Result<dome_core::hardware::spi::RppalSpiBus, EncoderError> {
    const NUM_TRIES: u64 = 5;
    retry::retry_with_index(
        retry::delay::Exponential::from_millis(20).take(NUM_TRIES as usize),
        |_| dome_core::hardware::spi::RppalSpiBus::open(bus, select),
    )
    .map_err(|e: retry::Error<EncoderError>| match e {
        retry::Error::Operation { error, .. } => error,
        retry::Error::Internal(msg) => EncoderError::Spi(msg),
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = match Config::load("dome-encoderd") {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "configuration load failed, exiting");
            std::process::exit(1);
        }
    };

    if !config.encoder.enabled {
        tracing::info!("encoder disabled in configuration, exiting");
        return;
    }

    let ipc_path = std::path::Path::new(&config.encoder.ipc_dir).join("ems22_position.json");
    let file = IpcFile::<EncoderSample>::new(ipc_path);
    let latest_angle = Arc::new(tokio::sync::RwLock::new(0.0));

    let simulate = std::env::var("DOME_SIMULATE").is_ok();
    let result = if simulate {
        tracing::warn!("DOME_SIMULATE set, running with a null SPI bus");
        run(
            NullSpiBus,
            NullReferenceSwitch,
            config.encoder.clone(),
            file,
            latest_angle,
            config.encoder.tcp_port,
            config.encoder.poll_hz,
        )
        .await
    } else {
        let spi = match open_spi_with_retry(config.encoder.spi_bus, config.encoder.spi_select) {
            Ok(spi) => spi,
            Err(e) => {
                tracing::error!(error = %e, "failed to open SPI bus, exiting");
                std::process::exit(1);
            }
        };
        let switch = match dome_core::hardware::gpio::RppalReferenceSwitch::open(
            config.encoder.switch_pin,
        ) {
            Ok(switch) => switch,
            Err(e) => {
                tracing::error!(error = %e, "failed to open reference switch GPIO, exiting");
                std::process::exit(1);
            }
        };
        run(
            spi,
            switch,
            config.encoder.clone(),
            file,
            latest_angle,
            config.encoder.tcp_port,
            config.encoder.poll_hz,
        )
        .await
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "encoder daemon terminated with error");
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
async fn run<S: SpiBus, W: ReferenceSwitch>(
    spi: S,
    switch: W,
    config: dome_core::config::EncoderConfig,
    file: IpcFile<EncoderSample>,
    latest_angle: Arc<tokio::sync::RwLock<f64>>,
    tcp_port: u16,
    poll_hz: f64,
) -> Result<(), dome_core::error::IpcError> {
    let shutdown = Arc::new(StdRwLock::new(false));
    {
        let shutdown = shutdown.clone();
        let _ = ctrlc::set_handler(move || {
            tracing::info!("shutdown signal received");
            *shutdown.write().unwrap() = true;
        });
    }

    tokio::spawn(query::serve(tcp_port, latest_angle.clone()));

    let mut daemon = EncoderDaemon::new(spi, switch, config.clone(), file);
    let period = Duration::from_secs_f64(1.0 / poll_hz.max(1.0));

    #[cfg(unix)]
    let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Ready]);

    loop {
        if *shutdown.read().unwrap() {
            tracing::info!("encoder daemon shutting down");
            return Ok(());
        }

        if let Some(sample) = daemon.tick() {
            *latest_angle.write().await = sample.angle;
            daemon.publish(&sample).await?;

            if daemon.consecutive_spi_errors() >= daemon.max_consecutive_spi_errors() {
                tracing::warn!(
                    consecutive_errors = daemon.consecutive_spi_errors(),
                    "too many consecutive SPI errors, closing and reopening SPI handle"
                );
                if let Err(e) = daemon.reopen_spi() {
                    tracing::error!(error = %e, "failed to reopen SPI handle, exiting");
                    std::process::exit(1);
                }
            }
        }

        #[cfg(unix)]
        let _ = sd_notify::notify(false, &[sd_notify::NotifyState::Watchdog]);

        tokio::time::sleep(period).await;
    }
}
