#![allow(dead_code)] // Some variants are reserved for adapter-level typed returns

//! Unified error types for the AquaGuard firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level control loop's error handling uniform.  All variants are `Copy`
//! so they can be cheaply passed through the motor controller and the
//! connectivity machinery without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned out-of-range data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// A cloud command failed validation.
    Command(CommandError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// Ultrasonic echo never arrived within the measurement window.
    EchoTimeout,
    /// Distance sample outside the configured plausible range.
    OutOfRange,
    /// Too few valid samples in a cycle to compute a trusted median.
    TooFewValidSamples,
    /// GPIO read returned an error.
    GpioReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EchoTimeout => write!(f, "echo timeout"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::TooFewValidSamples => write!(f, "too few valid samples"),
            Self::GpioReadFailed => write!(f, "GPIO read failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// Relay GPIO set failed.
    GpioWriteFailed,
    /// Relay driver not initialised.
    NotReady,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::NotReady => write!(f, "relay not ready"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

/// Connectivity and cloud-transport failures.
///
/// None of these are fatal: every one of them feeds the backoff/retry
/// machinery and is recovered locally.  Nothing in this enum may trigger
/// a device restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// WiFi session could not be established within the bounded timeout.
    ConnectFailed,
    /// WiFi link dropped after being up.
    LinkDown,
    /// No usable credentials configured.
    NoCredentials,
    /// HTTP request could not be sent (socket/DNS/TLS failure).
    RequestFailed,
    /// HTTP response carried a non-success status.
    BadStatus(u16),
    /// Response body was not parseable.
    MalformedResponse,
    /// Operation attempted while the link is down.
    NotConnected,
    /// Payload exceeds the transport's fixed buffer.
    PayloadTooLarge,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::LinkDown => write!(f, "link down"),
            Self::NoCredentials => write!(f, "no credentials"),
            Self::RequestFailed => write!(f, "request failed"),
            Self::BadStatus(code) => write!(f, "HTTP status {code}"),
            Self::MalformedResponse => write!(f, "malformed response"),
            Self::NotConnected => write!(f, "not connected"),
            Self::PayloadTooLarge => write!(f, "payload too large"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Command validation errors
// ---------------------------------------------------------------------------

/// Cloud command envelope failures detected before dispatch.
///
/// These map onto ack rejection strings; they never abort the poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Body was not valid JSON or not the expected envelope shape.
    MalformedEnvelope,
    /// Command arrived without an id; it cannot be acknowledged.
    MissingId,
    /// `type` field not one of the known command types.
    UnknownType,
    /// Payload failed type-specific validation.
    BadPayload,
}

impl CommandError {
    /// Stable wire name, used as the ack `detail` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedEnvelope => "malformed_envelope",
            Self::MissingId => "missing_id",
            Self::UnknownType => "unknown_type",
            Self::BadPayload => "bad_payload",
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedEnvelope => write!(f, "malformed envelope"),
            Self::MissingId => write!(f, "missing id"),
            Self::UnknownType => write!(f, "unknown command type"),
            Self::BadPayload => write!(f, "bad payload"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
