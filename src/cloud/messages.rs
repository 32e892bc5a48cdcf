//! Wire shapes for the backend API.
//!
//! All outbound bodies are JSON with snake_case fields and carry
//! `protocol_version` so the backend can branch on incompatible firmware.
//! Inbound command envelopes are parsed leniently: unknown extra fields are
//! ignored, but a missing `id` or `type` makes the envelope malformed.

use serde::{Deserialize, Serialize};

use crate::error::CommandError;

/// Bumped on any backward-incompatible change to payload structure, field
/// naming or the signing procedure.
pub const PROTOCOL_VERSION: u8 = 1;

pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Outbound ─────────────────────────────────────────────────

/// Which backend endpoint a queued body is destined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    SensorData,
    MotorStatus,
    Heartbeat,
    SystemAlert,
}

impl MessageKind {
    /// Endpoint path, matching the backend's edge functions.
    pub const fn path(self) -> &'static str {
        match self {
            Self::SensorData => "/functions/v1/api/sensor-data",
            Self::MotorStatus => "/functions/v1/api/motor-status",
            Self::Heartbeat => "/functions/v1/api/heartbeat",
            Self::SystemAlert => "/functions/v1/api/system-alert",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SensorData => "sensor_data",
            Self::MotorStatus => "motor_status",
            Self::Heartbeat => "heartbeat",
            Self::SystemAlert => "system_alert",
        }
    }
}

/// Pending-command poll endpoint (GET).
pub const COMMANDS_PATH: &str = "/functions/v1/api/commands";

/// Command acknowledgement endpoint (POST).
pub const COMMAND_ACK_PATH: &str = "/functions/v1/api/command-ack";

/// Periodic tank reading.
#[derive(Debug, Serialize)]
pub struct TelemetryRecord<'a> {
    pub device_id: &'a str,
    pub tank_type: &'a str,
    pub level_percentage: f32,
    pub level_liters: f32,
    pub sensor_health: &'a str,
    pub float_switch: bool,
    pub motor_running: bool,
    pub auto_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_strength: Option<i8>,
    /// Epoch seconds, `0` before the first clock sync.
    pub timestamp: u64,
    pub protocol_version: u8,
}

/// Motor state transition, one per transition, queued in order.
#[derive(Debug, Serialize)]
pub struct MotorStatusRecord<'a> {
    pub device_id: &'a str,
    pub action: &'a str,
    pub reason: &'a str,
    pub level_at_time: f32,
    pub motor_running: bool,
    pub timestamp: u64,
    pub protocol_version: u8,
}

/// Liveness report, sent directly (never queued).
#[derive(Debug, Serialize)]
pub struct HeartbeatRecord<'a> {
    pub device_id: &'a str,
    pub firmware_version: &'a str,
    pub uptime_secs: u64,
    pub free_heap_bytes: u32,
    pub link_state: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi_dbm: Option<i8>,
    pub motor_state: &'a str,
    pub motor_mode: &'a str,
    pub pump_starts: u32,
    pub pump_runtime_secs: u64,
    pub queue_depth: u8,
    pub queue_dropped: u32,
    pub boot_count: u32,
    pub last_boot_reason: &'a str,
    pub timestamp: u64,
    pub protocol_version: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// Out-of-band condition report (sensor failures, emergency stops, boot
/// after crash).
#[derive(Debug, Serialize)]
pub struct SystemAlertRecord<'a> {
    pub device_id: &'a str,
    pub severity: AlertSeverity,
    pub code: &'a str,
    pub detail: &'a str,
    pub timestamp: u64,
    pub protocol_version: u8,
}

// ── Inbound ──────────────────────────────────────────────────

/// One command envelope from the backend's pending-command feed.
#[derive(Debug, Clone, Deserialize)]
pub struct CloudCommand {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Outcome reported back for every received command id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckStatus {
    Accepted,
    Rejected,
    /// Same id delivered again; not re-executed.
    Duplicate,
    Unknown,
}

impl AckStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Duplicate => "duplicate",
            Self::Unknown => "unknown_command",
        }
    }
}

/// Ack body sent to the backend.
#[derive(Debug, Serialize)]
pub struct CommandAck<'a> {
    pub device_id: &'a str,
    pub command_id: &'a str,
    pub status: &'a str,
    pub detail: &'a str,
    pub protocol_version: u8,
}

/// Parse the body of a pending-command poll.  The feed is a JSON array of
/// envelopes; an empty body or empty array means no work.
pub fn parse_command_feed(body: &[u8]) -> Result<Vec<CloudCommand>, CommandError> {
    if body.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_slice::<Vec<CloudCommand>>(body).map_err(|_| CommandError::MalformedEnvelope)
}
