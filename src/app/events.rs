//! Outbound application events.
//!
//! The [`DeviceService`](super::service::DeviceService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters decide what to
//! do with them — the default sink logs, the cloud plane serializes its own
//! wire records independently.

use crate::cloud::messages::AlertSeverity;
use crate::conn::LinkChange;
use crate::motor::{MotorEvent, MotorMode};
use crate::sensors::TankSnapshot;

use super::commands::Command;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// The service finished booting, all ports wired.
    Started,

    /// A fresh sensor cycle completed.
    Sampled(TankSnapshot),

    /// The motor controller transitioned.
    Motor(MotorEvent),

    /// The connectivity supervisor transitioned.
    Link(LinkChange),

    /// The panel selector flipped between auto and manual.
    ModeChanged(MotorMode),

    /// A cloud command was executed (or refused).
    CommandHandled { command: Command, accepted: bool },

    /// An out-of-band condition worth a system alert.
    Alert { severity: AlertSeverity, code: &'static str },

    /// A controlled restart is imminent.
    RestartPending { reason: &'static str },
}
