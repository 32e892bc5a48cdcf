//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).  The cloud plane
//! serializes its own wire records; this sink is for the person holding
//! the serial cable.

use log::{error, info, warn};

use crate::app::events::DeviceEvent;
use crate::app::ports::EventSink;
use crate::cloud::messages::AlertSeverity;

/// Adapter that logs every [`DeviceEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &DeviceEvent) {
        match event {
            DeviceEvent::Started => {
                info!("START | all ports wired, control loop running");
            }
            DeviceEvent::Sampled(snap) => {
                info!(
                    "LEVEL | {:.1}% ({:.0} L) | dist={:.0}mm | health={} | intake={}",
                    snap.level.percent,
                    snap.level.liters,
                    snap.level.distance_mm,
                    snap.level.health,
                    if snap.low_water_switch { "wet" } else { "dry" },
                );
            }
            DeviceEvent::Motor(ev) => {
                info!(
                    "MOTOR | {} | reason={} | level={:.1}% | running={}",
                    ev.action.as_str(),
                    ev.reason,
                    ev.level_at_time,
                    ev.running,
                );
            }
            DeviceEvent::Link(change) => {
                info!("LINK | {} -> {}", change.from, change.to);
            }
            DeviceEvent::ModeChanged(mode) => {
                info!("MODE | panel selected {}", mode.as_str());
            }
            DeviceEvent::CommandHandled { command, accepted } => {
                if *accepted {
                    info!("CMD | {} accepted", command.as_str());
                } else {
                    warn!("CMD | {} refused", command.as_str());
                }
            }
            DeviceEvent::Alert { severity, code } => match severity {
                AlertSeverity::Info => info!("ALERT | info | {code}"),
                AlertSeverity::Warning => warn!("ALERT | warning | {code}"),
                AlertSeverity::Critical => error!("ALERT | critical | {code}"),
            },
            DeviceEvent::RestartPending { reason } => {
                warn!("MAINT | restart pending, reason={reason}");
            }
        }
    }
}
