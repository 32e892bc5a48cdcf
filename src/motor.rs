//! Motor safety controller — the single writer of the pump relay.
//!
//! States: `Idle`, `Running`, `CoolingDown`, `EmergencyStopped`, with an
//! orthogonal `Auto`/`Manual` mode.  Every mutation goes through the one
//! `transition()` function, which also owns the relay demand and produces
//! the [`MotorEvent`] for the outbound queue — no other component may touch
//! the relay.
//!
//! Transition priority (highest first):
//! 1. emergency stop (any state, sticky until an explicit reset)
//! 2. safety stop out of `Running` (switch cleared / sensor failed /
//!    low level / overflow guard / runtime limit)
//! 3. cooldown expiry
//! 4. auto start
//! 5. manual start/stop
//!
//! The low-water switch is a hard gate: nothing in any mode can start the
//! pump while it reads dry.  Repeated runtime-limit trips latch the
//! emergency stop — a pump that keeps hitting its runtime ceiling is
//! assumed mechanically wrong, not just slow.

use log::{info, warn};

use crate::config::{SystemConfig, TankKind};
use crate::sensors::TankSnapshot;
use crate::sensors::filter::SourceHealth;

// ---------------------------------------------------------------------------
// States, modes, events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    Idle,
    Running,
    CoolingDown,
    EmergencyStopped,
}

impl MotorState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::CoolingDown => "cooling_down",
            Self::EmergencyStopped => "emergency_stopped",
        }
    }
}

impl core::fmt::Display for MotorState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorMode {
    Auto,
    Manual,
}

impl MotorMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
        }
    }
}

/// What a transition did, for the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorAction {
    Start,
    Stop,
    EmergencyStop,
    EmergencyReset,
    /// Cooldown finished; pump available again.
    Ready,
}

impl MotorAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::EmergencyStop => "emergency_stop",
            Self::EmergencyReset => "emergency_reset",
            Self::Ready => "ready",
        }
    }
}

/// Emitted on every state transition and enqueued for the cloud.
#[derive(Debug, Clone, Copy)]
pub struct MotorEvent {
    pub action: MotorAction,
    pub reason: &'static str,
    /// Level percent at the moment of the transition.
    pub level_at_time: f32,
    /// Relay demand after the transition.
    pub running: bool,
    /// Uptime seconds of the transition.
    pub at: u64,
}

/// Why a start/stop/reset request was refused.  Reported verbatim in the
/// command ack — rejections are never silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorRejection {
    EmergencyStopped,
    NotInManualMode,
    FloatSwitchUnsafe,
    SensorUnsafe,
    CoolingDown,
    AlreadyRunning,
    NotRunning,
    NotEmergencyStopped,
    MotorNotFitted,
}

impl MotorRejection {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmergencyStopped => "emergency_stopped",
            Self::NotInManualMode => "not_in_manual_mode",
            Self::FloatSwitchUnsafe => "float_switch_unsafe",
            Self::SensorUnsafe => "sensor_unsafe",
            Self::CoolingDown => "cooling_down",
            Self::AlreadyRunning => "already_running",
            Self::NotRunning => "not_running",
            Self::NotEmergencyStopped => "not_emergency_stopped",
            Self::MotorNotFitted => "motor_not_fitted",
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct MotorController {
    state: MotorState,
    mode: MotorMode,

    // Thresholds (fixed per boot; config reloads require a restart)
    start_percent: f32,
    stop_percent: f32,
    high_percent: f32,
    max_runtime_secs: u64,
    cooldown_secs: u64,
    max_runtime_faults: u8,
    /// Top-tank units run the same firmware without a pump.
    motor_fitted: bool,

    // Timers and latches
    state_since: u64,
    run_started_at: Option<u64>,
    last_stop_at: Option<u64>,
    runtime_faults: u8,
    downstream_request: bool,
    relay_demand: bool,

    // Lifetime accounting (heartbeat diagnostics)
    total_starts: u32,
    total_runtime_secs: u64,
}

impl MotorController {
    pub fn new(cfg: &SystemConfig) -> Self {
        Self {
            state: MotorState::Idle,
            mode: MotorMode::Auto,
            start_percent: cfg.auto_start_percent,
            stop_percent: cfg.auto_stop_percent,
            high_percent: cfg.high_level_percent,
            max_runtime_secs: u64::from(cfg.max_runtime_secs),
            cooldown_secs: u64::from(cfg.cooldown_secs),
            max_runtime_faults: cfg.max_runtime_faults,
            motor_fitted: cfg.tank_kind == TankKind::SumpTank,
            state_since: 0,
            run_started_at: None,
            last_stop_at: None,
            runtime_faults: 0,
            downstream_request: false,
            relay_demand: false,
            total_starts: 0,
            total_runtime_secs: 0,
        }
    }

    // -- read-side ---------------------------------------------------------

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn mode(&self) -> MotorMode {
        self.mode
    }

    /// Relay state this controller currently demands.  The service applies
    /// it through the relay port every tick; the driver makes repeat writes
    /// no-ops.
    pub fn relay_demand(&self) -> bool {
        self.relay_demand
    }

    pub fn is_running(&self) -> bool {
        self.state == MotorState::Running
    }

    pub fn runtime_faults(&self) -> u8 {
        self.runtime_faults
    }

    pub fn total_starts(&self) -> u32 {
        self.total_starts
    }

    pub fn total_runtime_secs(&self) -> u64 {
        self.total_runtime_secs
    }

    // -- external signals --------------------------------------------------

    /// Downstream (overhead) tank requests water.  Supplements the start
    /// threshold in the auto gate; every other gate still applies.
    pub fn set_downstream_request(&mut self, want: bool) {
        if self.downstream_request != want {
            info!("motor: downstream request {}", if want { "set" } else { "cleared" });
        }
        self.downstream_request = want;
    }

    /// Follow the panel mode selector.  Ignored while emergency-stopped —
    /// the latch owns the mode until an explicit reset.
    /// Returns the new mode when it actually changed.
    pub fn set_mode(&mut self, auto: bool, now: u64) -> Option<MotorMode> {
        if self.state == MotorState::EmergencyStopped {
            return None;
        }
        let want = if auto { MotorMode::Auto } else { MotorMode::Manual };
        if want == self.mode {
            return None;
        }
        self.mode = want;
        info!("motor: mode -> {} (t+{now}s)", want.as_str());
        Some(want)
    }

    // -- per-tick evaluation ----------------------------------------------

    /// One safety evaluation.  At most one transition per call, in the
    /// documented priority order.  Connectivity state has no input here.
    pub fn tick(&mut self, snap: &TankSnapshot, now: u64) -> Option<MotorEvent> {
        match self.state {
            // Sticky: only an explicit reset leaves this state.
            MotorState::EmergencyStopped => None,
            MotorState::Running => self.check_safety_stops(snap, now),
            MotorState::CoolingDown => {
                if now.saturating_sub(self.state_since) >= self.cooldown_secs {
                    Some(self.transition(
                        MotorState::Idle,
                        MotorAction::Ready,
                        "cooldown_complete",
                        snap,
                        now,
                    ))
                } else {
                    None
                }
            }
            MotorState::Idle => self.check_auto_start(snap, now),
        }
    }

    fn check_safety_stops(&mut self, snap: &TankSnapshot, now: u64) -> Option<MotorEvent> {
        if !snap.low_water_switch {
            return Some(self.safety_stop("float_switch_cleared", snap, now));
        }
        // Failed health means the level cannot confirm safe operation.
        if snap.level.health == SourceHealth::Failed {
            return Some(self.safety_stop("sensor_failed", snap, now));
        }
        if snap.level.percent <= self.stop_percent {
            return Some(self.safety_stop("auto_stop", snap, now));
        }
        if snap.level.percent >= self.high_percent {
            return Some(self.safety_stop("overflow_guard", snap, now));
        }

        let runtime = self
            .run_started_at
            .map_or(0, |t| now.saturating_sub(t));
        if runtime >= self.max_runtime_secs {
            self.runtime_faults = self.runtime_faults.saturating_add(1);
            warn!(
                "motor: runtime limit hit after {runtime}s (fault {}/{})",
                self.runtime_faults, self.max_runtime_faults
            );
            if self.runtime_faults >= self.max_runtime_faults {
                self.mode = MotorMode::Manual;
                return Some(self.transition(
                    MotorState::EmergencyStopped,
                    MotorAction::EmergencyStop,
                    "runtime_fault_limit",
                    snap,
                    now,
                ));
            }
            return Some(self.safety_stop("runtime_limit", snap, now));
        }

        None
    }

    fn check_auto_start(&mut self, snap: &TankSnapshot, now: u64) -> Option<MotorEvent> {
        if !self.motor_fitted || self.mode != MotorMode::Auto {
            return None;
        }
        // Ambiguous sensor state never justifies a start.
        if snap.level.health == SourceHealth::Failed {
            return None;
        }
        if !snap.low_water_switch {
            return None;
        }
        if snap.level.percent >= self.high_percent {
            return None;
        }
        let threshold_met = snap.level.percent >= self.start_percent;
        if !threshold_met && !self.downstream_request {
            return None;
        }
        if !self.cooldown_elapsed(now) {
            return None;
        }

        let reason = if threshold_met { "auto_start" } else { "downstream_request" };
        Some(self.transition(MotorState::Running, MotorAction::Start, reason, snap, now))
    }

    // -- command entry points ---------------------------------------------

    pub fn request_manual_start(
        &mut self,
        snap: &TankSnapshot,
        now: u64,
    ) -> Result<MotorEvent, MotorRejection> {
        if !self.motor_fitted {
            return Err(MotorRejection::MotorNotFitted);
        }
        match self.state {
            MotorState::EmergencyStopped => return Err(MotorRejection::EmergencyStopped),
            MotorState::Running => return Err(MotorRejection::AlreadyRunning),
            MotorState::CoolingDown => return Err(MotorRejection::CoolingDown),
            MotorState::Idle => {}
        }
        if self.mode != MotorMode::Manual {
            return Err(MotorRejection::NotInManualMode);
        }
        // Manual bypasses level thresholds, never the hard gates.
        if snap.level.health == SourceHealth::Failed {
            return Err(MotorRejection::SensorUnsafe);
        }
        if !snap.low_water_switch {
            return Err(MotorRejection::FloatSwitchUnsafe);
        }
        Ok(self.transition(MotorState::Running, MotorAction::Start, "manual_start", snap, now))
    }

    pub fn request_manual_stop(
        &mut self,
        snap: &TankSnapshot,
        now: u64,
    ) -> Result<MotorEvent, MotorRejection> {
        if !self.motor_fitted {
            return Err(MotorRejection::MotorNotFitted);
        }
        if self.state == MotorState::EmergencyStopped {
            return Err(MotorRejection::EmergencyStopped);
        }
        if self.mode != MotorMode::Manual {
            return Err(MotorRejection::NotInManualMode);
        }
        if self.state != MotorState::Running {
            return Err(MotorRejection::NotRunning);
        }
        // Operator stop: straight to Idle, but the stop still arms the
        // cooldown gate so auto cannot bounce the pump.
        Ok(self.transition(MotorState::Idle, MotorAction::Stop, "manual_stop", snap, now))
    }

    /// Unconditional, from any state.  Forces Manual mode and latches until
    /// [`Self::emergency_reset`].  Returns `None` when already latched.
    pub fn emergency_stop(
        &mut self,
        reason: &'static str,
        snap: &TankSnapshot,
        now: u64,
    ) -> Option<MotorEvent> {
        if self.state == MotorState::EmergencyStopped {
            return None;
        }
        self.mode = MotorMode::Manual;
        Some(self.transition(
            MotorState::EmergencyStopped,
            MotorAction::EmergencyStop,
            reason,
            snap,
            now,
        ))
    }

    /// Explicit operator reset.  Clears the runtime-fault counter and arms
    /// a fresh cooldown so auto mode cannot restart the pump immediately;
    /// manual operation is available at once.
    pub fn emergency_reset(
        &mut self,
        snap: &TankSnapshot,
        now: u64,
    ) -> Result<MotorEvent, MotorRejection> {
        if self.state != MotorState::EmergencyStopped {
            return Err(MotorRejection::NotEmergencyStopped);
        }
        self.runtime_faults = 0;
        self.last_stop_at = Some(now);
        Ok(self.transition(
            MotorState::Idle,
            MotorAction::EmergencyReset,
            "emergency_reset",
            snap,
            now,
        ))
    }

    /// Stop for a controlled restart.  No-op unless running.
    pub fn maintenance_stop(&mut self, snap: &TankSnapshot, now: u64) -> Option<MotorEvent> {
        if self.state == MotorState::Running {
            Some(self.transition(MotorState::Idle, MotorAction::Stop, "maintenance_stop", snap, now))
        } else {
            None
        }
    }

    // -- internals ---------------------------------------------------------

    fn cooldown_elapsed(&self, now: u64) -> bool {
        self.last_stop_at
            .is_none_or(|t| now.saturating_sub(t) >= self.cooldown_secs)
    }

    fn safety_stop(&mut self, reason: &'static str, snap: &TankSnapshot, now: u64) -> MotorEvent {
        warn!("motor: safety stop ({reason}) at {:.1}%", snap.level.percent);
        self.transition(MotorState::CoolingDown, MotorAction::Stop, reason, snap, now)
    }

    /// The only place `state` and `relay_demand` change.
    fn transition(
        &mut self,
        to: MotorState,
        action: MotorAction,
        reason: &'static str,
        snap: &TankSnapshot,
        now: u64,
    ) -> MotorEvent {
        let from = self.state;
        if from == MotorState::Running && to != MotorState::Running {
            self.last_stop_at = Some(now);
            if let Some(t) = self.run_started_at.take() {
                self.total_runtime_secs += now.saturating_sub(t);
            }
        }
        if to == MotorState::Running {
            self.run_started_at = Some(now);
            self.total_starts += 1;
        }

        self.state = to;
        self.state_since = now;
        self.relay_demand = to == MotorState::Running;

        info!("motor: {} -> {} ({reason})", from.as_str(), to.as_str());
        MotorEvent {
            action,
            reason,
            level_at_time: snap.level.percent,
            running: self.relay_demand,
            at: now,
        }
    }
}
