//! Typed inbound commands.
//!
//! The cloud delivers loosely-typed envelopes; this is the narrow set of
//! actions the device actually accepts.  Anything else is acked back as
//! `unknown_command` — the firmware must keep running through backend
//! releases that invent new command types.

use crate::cloud::messages::CloudCommand;
use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MotorStart,
    MotorStop,
    EmergencyStop,
    EmergencyReset,
    /// Controlled restart via the maintenance sequence, not an immediate
    /// reboot.
    Restart,
}

impl Command {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MotorStart => "motor_start",
            Self::MotorStop => "motor_stop",
            Self::EmergencyStop => "emergency_stop",
            Self::EmergencyReset => "emergency_reset",
            Self::Restart => "restart",
        }
    }

    /// Map a cloud envelope onto a typed command.  Payloads are currently
    /// ignored: every accepted command is parameterless.
    pub fn parse(envelope: &CloudCommand) -> Result<Self, CommandError> {
        if envelope.id.is_empty() {
            return Err(CommandError::MissingId);
        }
        match envelope.kind.as_str() {
            "motor_start" => Ok(Self::MotorStart),
            "motor_stop" => Ok(Self::MotorStop),
            "emergency_stop" => Ok(Self::EmergencyStop),
            "emergency_reset" => Ok(Self::EmergencyReset),
            "restart" => Ok(Self::Restart),
            _ => Err(CommandError::UnknownType),
        }
    }
}
