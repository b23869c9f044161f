use thiserror::Error;

/// Motor driver faults.
#[derive(Debug, Error)]
pub enum MotorError {
    #[error("GPIO line {pin} could not be claimed: {detail}")]
    GpioClaim { pin: u8, detail: String },

    #[error("step requested before GPIO initialization")]
    NotInitialized,

    #[error("pulse delay {requested_secs}s on pin {pin} below safety floor, clamped")]
    DelayBelowFloor { pin: u8, requested_secs: f64 },
}

/// Encoder faults.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("no encoder sample available at {path}")]
    Absent { path: String },

    #[error("encoder sample at {path} is stale: age {age_ms}ms exceeds {max_age_ms}ms")]
    StaleData {
        path: String,
        age_ms: f64,
        max_age_ms: f64,
    },

    #[error("encoder frozen: no movement for {stagnant_secs}s while motor active")]
    Frozen { stagnant_secs: f64 },

    #[error("SPI read error: {0}")]
    Spi(String),
}

/// Abaque faults.
#[derive(Debug, Error)]
pub enum AbaqueError {
    #[error("abaque file {path} missing or unreadable: {detail}")]
    Unreadable { path: String, detail: String },

    #[error("abaque file {path} malformed: {detail}")]
    Malformed { path: String, detail: String },
}

/// IPC faults.
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("IPC file {path} locked, skipping this tick")]
    Locked { path: String },

    #[error("IPC file {path} unreadable: {detail}")]
    Unreadable { path: String, detail: String },

    #[error("IPC file {path} write failed: {detail}")]
    WriteFailed { path: String, detail: String },
}

/// Configuration faults — all are startup failures, never recovered
/// from at runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration key: {key}")]
    MissingKey { key: String },

    #[error("invalid value for {key}: {detail}")]
    InvalidValue { key: String, detail: String },

    #[error("could not load configuration from {path}: {detail}")]
    LoadFailed { path: String, detail: String },
}

/// Top-level error composing the per-subsystem taxonomies, used at the
/// boundaries where more than one subsystem's faults can surface (the
/// command dispatcher, the binaries' `main`).
#[derive(Debug, Error)]
pub enum DomeError {
    #[error(transparent)]
    Motor(#[from] MotorError),
    #[error(transparent)]
    Encoder(#[from] EncoderError),
    #[error(transparent)]
    Abaque(#[from] AbaqueError),
    #[error(transparent)]
    Ipc(#[from] IpcError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type DomeResult<T> = Result<T, DomeError>;
