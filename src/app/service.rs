//! Device service — the hexagonal core.
//!
//! [`DeviceService`] owns every decision-making component (filter, motor
//! controller, connectivity supervisor, queue, intake, maintenance) and
//! wires them together in one cooperative tick.  All I/O flows through
//! port traits injected at call sites, so the entire loop runs against
//! mock adapters on the host.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!  PanelPort  ──▶ │        DeviceService          │ ──▶ RelayPort
//!  LinkPort   ◀──▶│ filter · motor · conn · queue │ ──▶ IndicatorPort
//!  CloudPort  ◀──▶│    intake · maintenance       │
//!                 └──────────────────────────────┘
//! ```
//!
//! Tick ordering is a hard invariant: sensing, the safety evaluation and
//! the relay write all complete before any network I/O is attempted.  A
//! wedged backend can therefore delay telemetry, never a safety stop.

use log::{info, warn};

use crate::cloud::messages::{
    AckStatus, AlertSeverity, HeartbeatRecord, MessageKind, MotorStatusRecord, SystemAlertRecord,
    TelemetryRecord, FIRMWARE_VERSION, PROTOCOL_VERSION,
};
use crate::cloud::intake::CommandIntake;
use crate::cloud::queue::OutboundQueue;
use crate::config::SystemConfig;
use crate::conn::ConnectivityManager;
use crate::diagnostics;
use crate::maintenance::MaintenanceScheduler;
use crate::motor::{MotorAction, MotorController, MotorEvent, MotorMode, MotorState};
use crate::sensors::filter::{LevelFilter, SourceHealth};
use crate::sensors::TankSnapshot;

use super::commands::Command;
use super::events::DeviceEvent;
use super::ports::{
    ClockPort, CloudPort, EventSink, IndicatorPort, LinkPort, PanelPort, RelayPort, SensorPort,
};

// ── Cadence bookkeeping ───────────────────────────────────────

/// Fires immediately, then every `every` seconds.
struct Cadence {
    every: u64,
    last: Option<u64>,
}

impl Cadence {
    fn new(every: u64) -> Self {
        Self { every, last: None }
    }

    fn due(&self, now: u64) -> bool {
        self.last.is_none_or(|t| now.saturating_sub(t) >= self.every)
    }

    fn mark(&mut self, now: u64) {
        self.last = Some(now);
    }
}

/// Consecutive heartbeat misses before the backend is reported
/// unresponsive.  Informational only: nothing restarts on its account.
const HEARTBEAT_MISS_LIMIT: u8 = 3;

/// What the caller must do after a tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickOutcome {
    /// A controlled restart is due; the caller performs the actual reset.
    pub restart: Option<&'static str>,
}

// ── DeviceService ─────────────────────────────────────────────

pub struct DeviceService {
    config: SystemConfig,
    filter: LevelFilter,
    motor: MotorController,
    conn: ConnectivityManager,
    queue: OutboundQueue,
    intake: CommandIntake,
    maintenance: MaintenanceScheduler,

    snapshot: TankSnapshot,
    have_sample: bool,
    prev_health: SourceHealth,
    critical_latched: bool,

    prev_manual_switch: bool,

    boot_count: u32,
    boot_reason: heapless::String<48>,

    heartbeat_misses: u8,
    backend_responsive: bool,

    sensor_cadence: Cadence,
    telemetry_cadence: Cadence,
    heartbeat_cadence: Cadence,
    tick_count: u64,
}

impl DeviceService {
    pub fn new(config: SystemConfig) -> Self {
        let filter = LevelFilter::new(&config);
        let motor = MotorController::new(&config);
        let conn = ConnectivityManager::new(&config);
        let queue = OutboundQueue::new(&config);
        let intake = CommandIntake::new(&config);
        let maintenance = MaintenanceScheduler::new(&config);
        Self {
            snapshot: TankSnapshot::empty(false),
            have_sample: false,
            prev_health: SourceHealth::Good,
            critical_latched: false,
            prev_manual_switch: false,
            boot_count: 0,
            boot_reason: heapless::String::new(),
            heartbeat_misses: 0,
            backend_responsive: true,
            sensor_cadence: Cadence::new(u64::from(config.sensor_cycle_secs)),
            telemetry_cadence: Cadence::new(u64::from(config.telemetry_interval_secs)),
            heartbeat_cadence: Cadence::new(u64::from(config.heartbeat_interval_secs)),
            tick_count: 0,
            filter,
            motor,
            conn,
            queue,
            intake,
            maintenance,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Announce the boot.  The alert reaches the backend once the link
    /// comes up; timestamps are zero until the first clock sync.  Journal
    /// data is kept so every heartbeat can repeat the boot story.
    pub fn start(&mut self, boot_count: u32, boot_reason: &str, sink: &mut impl EventSink) {
        self.boot_count = boot_count;
        self.boot_reason.clear();
        let _ = self.boot_reason.push_str(boot_reason);
        info!(
            "service: {} '{}' starting (fw {FIRMWARE_VERSION}, boot {boot_count}: {boot_reason})",
            self.config.tank_kind.as_str(),
            self.config.device_id
        );
        self.enqueue_alert(AlertSeverity::Info, "boot", boot_reason, 0, 0);
        sink.emit(&DeviceEvent::Started);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One cooperative cycle.  Local control first, network after, in a
    /// fixed order; at most one restart decision per call.
    pub fn tick(
        &mut self,
        hw: &mut (impl SensorPort + RelayPort + PanelPort + IndicatorPort),
        link: &mut impl LinkPort,
        cloud: &mut impl CloudPort,
        clock: &impl ClockPort,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        self.tick_count += 1;
        let now = clock.uptime_secs();
        let epoch = clock.epoch_secs().unwrap_or(0);

        // 1. Panel switches (mode selector + manual motor switch).
        self.service_panel(hw, now, epoch, sink);

        // 2. Sensor cycle on its own cadence; the low-water switch is
        //    cheap and fresh every tick.
        if self.sensor_cadence.due(now) {
            self.sensor_cadence.mark(now);
            let level = self.filter.sample(hw, now);
            self.snapshot = TankSnapshot {
                level,
                low_water_switch: hw.read_low_water_switch(),
            };
            self.have_sample = true;
            sink.emit(&DeviceEvent::Sampled(self.snapshot));
            self.watch_sensor_health(now, epoch, sink);
        } else {
            self.snapshot.low_water_switch = hw.read_low_water_switch();
        }

        // 3. Motor safety evaluation.
        if let Some(event) = self.motor.tick(&self.snapshot, now) {
            self.handle_motor_event(event, epoch, sink);
        }
        // A pending restart keeps the pump down through the grace window.
        if self.maintenance.restart_pending().is_some() {
            if let Some(event) = self.motor.maintenance_stop(&self.snapshot, now) {
                self.handle_motor_event(event, epoch, sink);
            }
        }

        // 4. Relay and indicators.  This write must precede all network
        //    I/O below; the driver makes repeat writes no-ops.
        hw.set_motor_relay(self.motor.relay_demand());
        self.drive_indicators(hw);

        // 5. Telemetry enqueue (local, no I/O yet).
        if self.have_sample && self.telemetry_cadence.due(now) {
            self.telemetry_cadence.mark(now);
            self.enqueue_telemetry(link.rssi(), now, epoch);
        }

        // 6. Connectivity supervision.
        if let Some(change) = self.conn.tick(link, now) {
            info!("link: {} -> {}", change.from.as_str(), change.to.as_str());
            sink.emit(&DeviceEvent::Link(change));
        }

        // 7. Cloud traffic, only while online.
        if self.conn.is_online() {
            self.queue.flush(cloud, now);

            if self.heartbeat_cadence.due(now) {
                self.heartbeat_cadence.mark(now);
                self.send_heartbeat(link, cloud, now, epoch);
            }

            if self.intake.poll_due(now) {
                let pending = self.intake.collect(cloud, now);
                for item in pending {
                    let (status, detail) = self.handle_command(item.command, now, epoch, sink);
                    self.intake.ack(cloud, &item.id, status, detail);
                }
            }
        }

        // 8. Maintenance schedule and the armed-restart countdown.
        if self.maintenance.tick(clock.wall_clock_hm(), now) {
            self.enqueue_alert(
                AlertSeverity::Info,
                "restart_pending",
                "scheduled_maintenance",
                now,
                epoch,
            );
            sink.emit(&DeviceEvent::RestartPending { reason: "scheduled_maintenance" });
        }
        let restart = self.maintenance.restart_due(now);
        if restart.is_some() && !self.queue.is_empty() {
            // One last drain attempt; whatever remains is lost to the
            // restart, which is why the grace period exists.
            if self.conn.is_online() {
                self.queue.flush(cloud, now);
            }
        }

        TickOutcome { restart }
    }

    // ── Command handling ──────────────────────────────────────

    /// Execute one cloud command against the motor/maintenance layer.
    /// Returns the ack outcome; rejections carry the refusal reason.
    pub fn handle_command(
        &mut self,
        command: Command,
        now: u64,
        epoch: u64,
        sink: &mut impl EventSink,
    ) -> (AckStatus, &'static str) {
        let (status, detail) = match command {
            Command::MotorStart => match self.motor.request_manual_start(&self.snapshot, now) {
                Ok(event) => {
                    self.handle_motor_event(event, epoch, sink);
                    (AckStatus::Accepted, "")
                }
                Err(rej) => (AckStatus::Rejected, rej.as_str()),
            },
            Command::MotorStop => match self.motor.request_manual_stop(&self.snapshot, now) {
                Ok(event) => {
                    self.handle_motor_event(event, epoch, sink);
                    (AckStatus::Accepted, "")
                }
                Err(rej) => (AckStatus::Rejected, rej.as_str()),
            },
            Command::EmergencyStop => {
                match self.motor.emergency_stop("emergency_stop", &self.snapshot, now) {
                    Some(event) => {
                        self.handle_motor_event(event, epoch, sink);
                        (AckStatus::Accepted, "")
                    }
                    // Already latched: success, nothing to do.
                    None => (AckStatus::Accepted, "already_stopped"),
                }
            }
            Command::EmergencyReset => match self.motor.emergency_reset(&self.snapshot, now) {
                Ok(event) => {
                    self.handle_motor_event(event, epoch, sink);
                    (AckStatus::Accepted, "")
                }
                Err(rej) => (AckStatus::Rejected, rej.as_str()),
            },
            Command::Restart => {
                if self.maintenance.request_restart("cloud_command", now) {
                    self.enqueue_alert(AlertSeverity::Info, "restart_pending", "cloud_command", now, epoch);
                    sink.emit(&DeviceEvent::RestartPending { reason: "cloud_command" });
                    (AckStatus::Accepted, "")
                } else {
                    (AckStatus::Accepted, "already_armed")
                }
            }
        };

        info!(
            "command: {} -> {} {}",
            command.as_str(),
            status.as_str(),
            detail
        );
        sink.emit(&DeviceEvent::CommandHandled {
            command,
            accepted: status == AckStatus::Accepted,
        });
        (status, detail)
    }

    /// Downstream (top tank) demand signal; ORs with the start threshold
    /// in the auto gate.
    pub fn set_downstream_request(&mut self, want: bool) {
        self.motor.set_downstream_request(want);
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn motor_state(&self) -> MotorState {
        self.motor.state()
    }

    pub fn motor_mode(&self) -> MotorMode {
        self.motor.mode()
    }

    pub fn link_state(&self) -> crate::conn::LinkState {
        self.conn.state()
    }

    pub fn snapshot(&self) -> &TankSnapshot {
        &self.snapshot
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// `false` after [`HEARTBEAT_MISS_LIMIT`] consecutive heartbeat
    /// misses, back to `true` on the first delivered one.
    pub fn backend_responsive(&self) -> bool {
        self.backend_responsive
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn service_panel(
        &mut self,
        hw: &mut impl PanelPort,
        now: u64,
        epoch: u64,
        sink: &mut impl EventSink,
    ) {
        let auto = hw.auto_mode_selected();
        let manual_on = hw.manual_motor_on();

        if let Some(mode) = self.motor.set_mode(auto, now) {
            // Re-baseline the motor switch so a flip into Manual with the
            // switch already on does not read as a start request.
            self.prev_manual_switch = manual_on;
            sink.emit(&DeviceEvent::ModeChanged(mode));
        }

        if manual_on != self.prev_manual_switch {
            self.prev_manual_switch = manual_on;
            if self.motor.mode() == MotorMode::Manual {
                let result = if manual_on {
                    self.motor.request_manual_start(&self.snapshot, now)
                } else {
                    self.motor.request_manual_stop(&self.snapshot, now)
                };
                match result {
                    Ok(event) => self.handle_motor_event(event, epoch, sink),
                    Err(rej) => info!("panel: motor switch ignored ({})", rej.as_str()),
                }
            }
        }
    }

    fn watch_sensor_health(&mut self, now: u64, epoch: u64, sink: &mut impl EventSink) {
        let health = self.snapshot.level.health;
        if health == SourceHealth::Failed && self.prev_health != SourceHealth::Failed {
            warn!("sensor: level source failed");
            self.enqueue_alert(AlertSeverity::Critical, "sensor_failed", "", now, epoch);
            sink.emit(&DeviceEvent::Alert {
                severity: AlertSeverity::Critical,
                code: "sensor_failed",
            });
        } else if health == SourceHealth::Good && self.prev_health == SourceHealth::Failed {
            info!("sensor: level source recovered");
            self.enqueue_alert(AlertSeverity::Info, "sensor_recovered", "", now, epoch);
        }
        self.prev_health = health;

        // Critically low water, latched with hysteresis so a level hovering
        // at the threshold does not spam the backend.
        let percent = self.snapshot.level.percent;
        if health != SourceHealth::Failed {
            if !self.critical_latched && percent <= self.config.critical_level_percent {
                self.critical_latched = true;
                self.enqueue_alert(AlertSeverity::Critical, "critical_level", "", now, epoch);
                sink.emit(&DeviceEvent::Alert {
                    severity: AlertSeverity::Critical,
                    code: "critical_level",
                });
            } else if self.critical_latched && percent > self.config.critical_level_percent + 5.0 {
                self.critical_latched = false;
            }
        }
    }

    fn handle_motor_event(&mut self, event: MotorEvent, epoch: u64, sink: &mut impl EventSink) {
        sink.emit(&DeviceEvent::Motor(event));

        let record = MotorStatusRecord {
            device_id: self.config.device_id.as_str(),
            action: event.action.as_str(),
            reason: event.reason,
            level_at_time: event.level_at_time,
            motor_running: event.running,
            timestamp: epoch,
            protocol_version: PROTOCOL_VERSION,
        };
        match serde_json::to_vec(&record) {
            Ok(body) => self.queue.enqueue(MessageKind::MotorStatus, body, event.at),
            Err(err) => warn!("telemetry: motor record serialization failed ({err})"),
        }

        if event.action == MotorAction::EmergencyStop {
            self.enqueue_alert(AlertSeverity::Critical, event.reason, "", event.at, epoch);
            sink.emit(&DeviceEvent::Alert {
                severity: AlertSeverity::Critical,
                code: event.reason,
            });
        }
    }

    fn drive_indicators(&self, hw: &mut impl IndicatorPort) {
        hw.set_auto_mode_led(self.motor.mode() == MotorMode::Auto);
        let percent = self.snapshot.level.percent;
        let critical = self.have_sample && percent <= self.config.critical_level_percent;
        hw.set_tank_full_led(self.have_sample && percent >= self.config.high_level_percent);
        hw.set_tank_low_led(critical);
        hw.set_buzzer(critical || self.motor.state() == MotorState::EmergencyStopped);
    }

    fn enqueue_telemetry(&mut self, rssi: Option<i8>, now: u64, epoch: u64) {
        let record = TelemetryRecord {
            device_id: self.config.device_id.as_str(),
            tank_type: self.config.tank_kind.as_str(),
            level_percentage: self.snapshot.level.percent,
            level_liters: self.snapshot.level.liters,
            sensor_health: self.snapshot.level.health.as_str(),
            float_switch: self.snapshot.low_water_switch,
            motor_running: self.motor.is_running(),
            auto_mode: self.motor.mode() == MotorMode::Auto,
            signal_strength: rssi,
            timestamp: epoch,
            protocol_version: PROTOCOL_VERSION,
        };
        match serde_json::to_vec(&record) {
            Ok(body) => self.queue.enqueue(MessageKind::SensorData, body, now),
            Err(err) => warn!("telemetry: record serialization failed ({err})"),
        }
    }

    /// Heartbeats are deliberately sent direct, not queued: a stale
    /// heartbeat carries no information.
    fn send_heartbeat(
        &mut self,
        link: &impl LinkPort,
        cloud: &mut impl CloudPort,
        now: u64,
        epoch: u64,
    ) {
        let record = HeartbeatRecord {
            device_id: self.config.device_id.as_str(),
            firmware_version: FIRMWARE_VERSION,
            uptime_secs: now,
            free_heap_bytes: diagnostics::free_heap_bytes(),
            link_state: self.conn.state().as_str(),
            rssi_dbm: link.rssi(),
            motor_state: self.motor.state().as_str(),
            motor_mode: self.motor.mode().as_str(),
            pump_starts: self.motor.total_starts(),
            pump_runtime_secs: self.motor.total_runtime_secs(),
            queue_depth: self.queue.len() as u8,
            queue_dropped: self
                .queue
                .evicted_total()
                .saturating_add(self.queue.exhausted_total()),
            boot_count: self.boot_count,
            last_boot_reason: self.boot_reason.as_str(),
            timestamp: epoch,
            protocol_version: PROTOCOL_VERSION,
        };
        let Ok(body) = serde_json::to_vec(&record) else {
            return;
        };
        // A miss is never retried out of band; the next try happens a
        // full interval later.
        match cloud.send(MessageKind::Heartbeat, &body) {
            Ok(()) => {
                if !self.backend_responsive {
                    info!(
                        "heartbeat: backend responsive again after {} misses",
                        self.heartbeat_misses
                    );
                }
                self.heartbeat_misses = 0;
                self.backend_responsive = true;
            }
            Err(err) => {
                self.heartbeat_misses = self.heartbeat_misses.saturating_add(1);
                warn!("heartbeat: send failed ({err}), miss {}", self.heartbeat_misses);
                if self.heartbeat_misses == HEARTBEAT_MISS_LIMIT {
                    self.backend_responsive = false;
                    warn!("heartbeat: backend unresponsive ({HEARTBEAT_MISS_LIMIT} consecutive misses)");
                }
            }
        }
    }

    fn enqueue_alert(
        &mut self,
        severity: AlertSeverity,
        code: &'static str,
        detail: &str,
        now: u64,
        epoch: u64,
    ) {
        let record = SystemAlertRecord {
            device_id: self.config.device_id.as_str(),
            severity,
            code,
            detail,
            timestamp: epoch,
            protocol_version: PROTOCOL_VERSION,
        };
        match serde_json::to_vec(&record) {
            Ok(body) => self.queue.enqueue(MessageKind::SystemAlert, body, now),
            Err(err) => warn!("alert: serialization failed ({err})"),
        }
    }
}
