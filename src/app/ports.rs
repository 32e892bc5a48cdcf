//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DeviceService (domain)
//! ```
//!
//! Driven adapters (sensors, relay, panel, link, cloud transport, storage)
//! implement these traits.  The [`DeviceService`](super::service::DeviceService)
//! consumes them via generics, so the domain core never touches hardware
//! directly and the whole safety core runs unmodified on the host.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **StoragePort** implementations SHOULD encrypt sensitive keys.
//! - All port errors are typed — callers must handle every variant explicitly.

use crate::cloud::messages::{AckStatus, CloudCommand, MessageKind};
use crate::config::SystemConfig;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: raw level-sensing capabilities.
///
/// The ultrasonic transport (trigger/echo timing) lives behind this trait;
/// the domain only ever sees a distance sample or its absence.
pub trait SensorPort {
    /// One raw distance sample in millimetres; `None` on echo timeout.
    fn read_distance(&mut self) -> Option<u16>;

    /// Low-water float switch at the pump intake.
    /// `true` = water present.  Read every control tick — this is the
    /// hard gate for motor starts.
    fn read_low_water_switch(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → pump contactor)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the single motor relay.
///
/// Implementations must power up with the relay off and treat repeated
/// writes of the same state as no-ops, so the controller's "one physical
/// write per transition" contract holds at the GPIO level.
pub trait RelayPort {
    fn set_motor_relay(&mut self, on: bool);

    /// Last commanded state (not a hardware readback).
    fn motor_relay_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Panel port (driven adapter: operator switches → domain)
// ───────────────────────────────────────────────────────────────

/// Debounced operator panel inputs, polled once per control tick.
pub trait PanelPort {
    /// Mode selector position. `true` = Auto.
    fn auto_mode_selected(&mut self) -> bool;

    /// Manual motor switch position. `true` = operator wants the pump on.
    /// Honoured only in Manual mode, and never past the safety gates.
    fn manual_motor_on(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → LEDs / buzzer)
// ───────────────────────────────────────────────────────────────

/// Panel indicators.  Purely informational; nothing here feeds back into
/// control decisions.
pub trait IndicatorPort {
    fn set_auto_mode_led(&mut self, on: bool);
    fn set_tank_full_led(&mut self, on: bool);
    fn set_tank_low_led(&mut self, on: bool);
    fn set_buzzer(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Link port (driven adapter: domain ↔ WiFi session)
// ───────────────────────────────────────────────────────────────

/// WiFi session control consumed by the connectivity manager.
///
/// `connect` may block, but only up to the configured bounded timeout;
/// a timeout is reported as an ordinary [`CommsError`], never a fault.
/// Nothing reachable from this trait may restart the device.
pub trait LinkPort {
    /// Attempt to bring the session up.  Bounded-blocking.
    fn connect(&mut self) -> Result<(), CommsError>;

    /// Tear the session down (also used before a controlled restart).
    fn disconnect(&mut self);

    /// Liveness of the underlying link right now.
    fn is_up(&self) -> bool;

    /// Signal strength of the current association, if any.
    fn rssi(&self) -> Option<i8>;
}

// ───────────────────────────────────────────────────────────────
// Cloud port (driven adapter: domain ↔ backend transport)
// ───────────────────────────────────────────────────────────────

/// Backend transport: authenticated JSON over whatever carrier the adapter
/// implements.  Every call is bounded-blocking and side-effect free on
/// failure (the retry machinery decides what happens next).
pub trait CloudPort {
    /// Deliver one signed message body to the endpoint for `kind`.
    fn send(&mut self, kind: MessageKind, body: &[u8]) -> Result<(), CommsError>;

    /// Fetch pending commands for this device.
    fn fetch_commands(&mut self) -> Result<Vec<CloudCommand>, CommsError>;

    /// Acknowledge one command.  Called exactly once per processed command.
    fn ack(&mut self, id: &str, status: AckStatus, detail: &str) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: time sources → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic and wall-clock time.
///
/// Wall-clock values appear only once the platform clock has synced and
/// passes a sanity check; callers must treat `None` as "no trusted clock"
/// and degrade accordingly (the maintenance scheduler simply never fires).
pub trait ClockPort {
    /// Seconds since boot.  Monotonic, never goes backwards.
    fn uptime_secs(&self) -> u64;

    /// Local wall-clock (hour, minute), if synced.
    fn wall_clock_hm(&self) -> Option<(u8, u8)>;

    /// Unix epoch seconds, if synced.
    fn epoch_secs(&self) -> Option<u64>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / diagnostics)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`DeviceEvent`](super::events::DeviceEvent)s
/// through this port.  Adapters decide where they go (serial log, bench
/// capture, etc.); delivery to the cloud goes through the outbound queue
/// instead.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::DeviceEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// # Security
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges should be rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.  This prevents a compromised channel from injecting
/// dangerous operating parameters (e.g., a runtime limit of `u32::MAX`).
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for config, boot journal, credentials.
///
/// # Security
///
/// - Implementations SHOULD encrypt sensitive keys (WiFi password, HMAC
///   secret).  On ESP32, prefer the encrypted NVS partition for these.
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic — no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Encryption or decryption failed (wrong key, corrupted blob).
    EncryptionError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::EncryptionError => write!(f, "encryption error"),
        }
    }
}
