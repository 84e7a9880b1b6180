use std::path::PathBuf;

use thiserror::Error as ThisError;

/// Crate-wide error for the daemon bootstrap and resource handles.
#[derive(ThisError, Debug)]
pub enum DaemonError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Hardware(#[from] HardwareError),

    #[error(transparent)]
    InstanceLock(#[from] crate::instance_lock::InstanceLockError),

    #[error("Resource task for {0} is no longer running")]
    ResourceClosed(String),

    #[error("Provisioning failed: {0}")]
    ProvisioningFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DaemonError>;

/// An update payload failed a resource-specific type or range check.
///
/// Reported to the requester; the resource state is left untouched.
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{0} is read-only")]
    ReadOnly(&'static str),

    #[error("Invalid input: missing '{0}'")]
    MissingField(&'static str),

    #[error("Invalid input: 'value' must be a boolean")]
    ExpectedBoolean,

    #[error("Invalid input: 'temperature' must be a number")]
    ExpectedNumber,

    #[error("Invalid input: expected 3 colour channels, got {0}")]
    ChannelCount(usize),

    #[error("Invalid input: colour channel {channel} is not a number")]
    NotANumber { channel: usize },

    #[error("Invalid input: colour channel {channel} = {value} is outside [0,255]")]
    ChannelOutOfRange { channel: usize, value: f64 },

    #[error("{0} is an invalid temperature unit.")]
    UnknownUnits(String),

    #[error("Invalid input: {value} {units} is outside [{min},{max}]")]
    TemperatureOutOfRange {
        value: f64,
        units: crate::resource::Units,
        min: f64,
        max: f64,
    },

    #[error("Invalid input: {0} does not accept this command")]
    Mismatch(&'static str),

    #[error("Invalid input: {0}")]
    InvalidPayload(String),
}

/// Pin access failure raised by a sensor adapter.
#[derive(ThisError, Debug)]
pub enum HardwareError {
    #[error("Hardware unavailable at {path:?}: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("Invalid reading from {pin}: {reason}")]
    InvalidReading { pin: String, reason: String },

    #[error("{0} cannot be driven")]
    NotAnActuator(&'static str),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// A notification could not be handed to the transport.
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    #[error("notification channel closed")]
    ChannelClosed,
}
