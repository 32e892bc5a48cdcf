//! Shared mock adapters for the service-level tests.
//!
//! [`Rig`] bundles a [`DeviceService`] with mock implementations of every
//! port it consumes, so a test drives whole control ticks and inspects the
//! side effects.  The hardware and cloud mocks append to one shared
//! [`IoCall`] log, which makes the relay-before-network tick ordering
//! assertable across adapter boundaries.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use aquaguard::app::events::DeviceEvent;
use aquaguard::app::ports::{
    ClockPort, CloudPort, EventSink, IndicatorPort, LinkPort, PanelPort, RelayPort, SensorPort,
};
use aquaguard::app::service::{DeviceService, TickOutcome};
use aquaguard::cloud::messages::{AckStatus, CloudCommand, MessageKind};
use aquaguard::config::SystemConfig;
use aquaguard::error::CommsError;

// ── Shared side-effect log ────────────────────────────────────

/// Externally observable port calls, in the order they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum IoCall {
    Relay(bool),
    CloudSend(MessageKind),
    CommandPoll,
    CommandAck,
}

pub type IoLog = Rc<RefCell<Vec<IoCall>>>;

// ── Hardware mock (sensor + relay + panel + indicators) ───────

pub struct MockHardware {
    /// Raw sample returned for every `read_distance` call; `None` = timeout.
    pub distance_mm: Option<u16>,
    /// Float switch level: `true` = water present at the intake.
    pub water_present: bool,
    /// Panel mode selector: `true` = Auto.
    pub auto_selected: bool,
    /// Panel manual motor switch.
    pub manual_switch: bool,

    relay: bool,
    pub auto_led: bool,
    pub full_led: bool,
    pub low_led: bool,
    pub buzzer: bool,
    pub distance_reads: u32,
    ops: IoLog,
}

impl MockHardware {
    pub fn new(ops: IoLog) -> Self {
        Self {
            distance_mm: None,
            water_present: false,
            auto_selected: true,
            manual_switch: false,
            relay: false,
            auto_led: false,
            full_led: false,
            low_led: false,
            buzzer: false,
            distance_reads: 0,
            ops,
        }
    }
}

impl SensorPort for MockHardware {
    fn read_distance(&mut self) -> Option<u16> {
        self.distance_reads += 1;
        self.distance_mm
    }

    fn read_low_water_switch(&mut self) -> bool {
        self.water_present
    }
}

impl RelayPort for MockHardware {
    fn set_motor_relay(&mut self, on: bool) {
        self.ops.borrow_mut().push(IoCall::Relay(on));
        self.relay = on;
    }

    fn motor_relay_on(&self) -> bool {
        self.relay
    }
}

impl PanelPort for MockHardware {
    fn auto_mode_selected(&mut self) -> bool {
        self.auto_selected
    }

    fn manual_motor_on(&mut self) -> bool {
        self.manual_switch
    }
}

impl IndicatorPort for MockHardware {
    fn set_auto_mode_led(&mut self, on: bool) {
        self.auto_led = on;
    }

    fn set_tank_full_led(&mut self, on: bool) {
        self.full_led = on;
    }

    fn set_tank_low_led(&mut self, on: bool) {
        self.low_led = on;
    }

    fn set_buzzer(&mut self, on: bool) {
        self.buzzer = on;
    }
}

// ── Link mock ─────────────────────────────────────────────────

pub struct MockLink {
    carrier: bool,
    /// Fail this many `connect` calls before letting one succeed.
    pub fail_next: u32,
    pub connects: u32,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self { carrier: false, fail_next: 0, connects: 0 }
    }

    pub fn drop_carrier(&mut self) {
        self.carrier = false;
    }
}

impl LinkPort for MockLink {
    fn connect(&mut self) -> Result<(), CommsError> {
        self.connects += 1;
        if self.fail_next > 0 {
            self.fail_next -= 1;
            Err(CommsError::ConnectFailed)
        } else {
            self.carrier = true;
            Ok(())
        }
    }

    fn disconnect(&mut self) {
        self.carrier = false;
    }

    fn is_up(&self) -> bool {
        self.carrier
    }

    fn rssi(&self) -> Option<i8> {
        self.carrier.then_some(-58)
    }
}

// ── Cloud mock ────────────────────────────────────────────────

pub struct MockCloud {
    pub sent: Vec<(MessageKind, Vec<u8>)>,
    pub acks: Vec<(String, AckStatus, String)>,
    /// Fail this many `send` calls before letting one succeed.
    pub fail_sends: u32,
    pub fail_fetch: bool,
    batches: VecDeque<Vec<CloudCommand>>,
    ops: IoLog,
}

#[allow(dead_code)]
impl MockCloud {
    pub fn new(ops: IoLog) -> Self {
        Self {
            sent: Vec::new(),
            acks: Vec::new(),
            fail_sends: 0,
            fail_fetch: false,
            batches: VecDeque::new(),
            ops,
        }
    }

    /// Queue a single-command batch for the next poll.
    pub fn push_command(&mut self, id: &str, kind: &str) {
        self.batches.push_back(vec![envelope(id, kind)]);
    }

    /// Queue several commands to arrive in one poll.
    pub fn push_batch(&mut self, commands: &[(&str, &str)]) {
        self.batches
            .push_back(commands.iter().map(|(id, kind)| envelope(id, kind)).collect());
    }

    pub fn sent_count(&self, kind: MessageKind) -> usize {
        self.sent.iter().filter(|(k, _)| *k == kind).count()
    }

    /// How many delivered system-alert bodies contain `needle`.
    pub fn alerts_containing(&self, needle: &str) -> usize {
        self.sent
            .iter()
            .filter(|(kind, body)| {
                *kind == MessageKind::SystemAlert && String::from_utf8_lossy(body).contains(needle)
            })
            .count()
    }
}

fn envelope(id: &str, kind: &str) -> CloudCommand {
    CloudCommand {
        id: id.into(),
        kind: kind.into(),
        payload: serde_json::Value::Null,
    }
}

impl CloudPort for MockCloud {
    fn send(&mut self, kind: MessageKind, body: &[u8]) -> Result<(), CommsError> {
        self.ops.borrow_mut().push(IoCall::CloudSend(kind));
        if self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Err(CommsError::RequestFailed);
        }
        self.sent.push((kind, body.to_vec()));
        Ok(())
    }

    fn fetch_commands(&mut self) -> Result<Vec<CloudCommand>, CommsError> {
        self.ops.borrow_mut().push(IoCall::CommandPoll);
        if self.fail_fetch {
            return Err(CommsError::RequestFailed);
        }
        Ok(self.batches.pop_front().unwrap_or_default())
    }

    fn ack(&mut self, id: &str, status: AckStatus, detail: &str) -> Result<(), CommsError> {
        self.ops.borrow_mut().push(IoCall::CommandAck);
        self.acks.push((id.into(), status, detail.into()));
        Ok(())
    }
}

// ── Clock mock ────────────────────────────────────────────────

/// Settable clock.  `ClockPort` takes `&self`, hence the cells.
pub struct TestClock {
    now: Cell<u64>,
    hm: Cell<Option<(u8, u8)>>,
    epoch_base: Cell<Option<u64>>,
}

#[allow(dead_code)]
impl TestClock {
    pub fn new() -> Self {
        Self {
            now: Cell::new(0),
            hm: Cell::new(None),
            epoch_base: Cell::new(None),
        }
    }

    pub fn set(&self, uptime_secs: u64) {
        self.now.set(uptime_secs);
    }

    pub fn set_wall_clock(&self, hm: Option<(u8, u8)>) {
        self.hm.set(hm);
    }

    /// Pretend NTP synced: epoch = `epoch_now` at the current uptime.
    pub fn sync_epoch(&self, epoch_now: u64) {
        self.epoch_base.set(Some(epoch_now - self.now.get()));
    }
}

impl ClockPort for TestClock {
    fn uptime_secs(&self) -> u64 {
        self.now.get()
    }

    fn wall_clock_hm(&self) -> Option<(u8, u8)> {
        self.hm.get()
    }

    fn epoch_secs(&self) -> Option<u64> {
        self.epoch_base.get().map(|base| base + self.now.get())
    }
}

// ── Event capture sink ────────────────────────────────────────

pub struct CaptureSink {
    pub events: Vec<DeviceEvent>,
}

#[allow(dead_code)]
impl CaptureSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Reasons of all motor transitions, in order.
    pub fn motor_reasons(&self) -> Vec<&'static str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                DeviceEvent::Motor(ev) => Some(ev.reason),
                _ => None,
            })
            .collect()
    }

    pub fn alert_count(&self, code: &str) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Alert { code: c, .. } if *c == code))
            .count()
    }

    pub fn restart_pending_reason(&self) -> Option<&'static str> {
        self.events.iter().find_map(|e| match e {
            DeviceEvent::RestartPending { reason } => Some(*reason),
            _ => None,
        })
    }
}

impl EventSink for CaptureSink {
    fn emit(&mut self, event: &DeviceEvent) {
        self.events.push(event.clone());
    }
}

// ── The rig ───────────────────────────────────────────────────

/// A booted service plus every mock it talks to.
pub struct Rig {
    pub svc: DeviceService,
    pub hw: MockHardware,
    pub link: MockLink,
    pub cloud: MockCloud,
    pub clock: TestClock,
    pub sink: CaptureSink,
    ops: IoLog,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_config(SystemConfig::default())
    }

    pub fn with_config(config: SystemConfig) -> Self {
        let ops: IoLog = Rc::new(RefCell::new(Vec::new()));
        let mut svc = DeviceService::new(config);
        let mut sink = CaptureSink::new();
        svc.start(1, "power_on", &mut sink);
        Self {
            svc,
            hw: MockHardware::new(Rc::clone(&ops)),
            link: MockLink::new(),
            cloud: MockCloud::new(Rc::clone(&ops)),
            clock: TestClock::new(),
            sink,
            ops,
        }
    }

    /// One control tick at the clock's current uptime.
    pub fn tick(&mut self) -> TickOutcome {
        self.svc.tick(
            &mut self.hw,
            &mut self.link,
            &mut self.cloud,
            &self.clock,
            &mut self.sink,
        )
    }

    /// Jump the clock to `uptime_secs` and tick once.
    pub fn tick_at(&mut self, uptime_secs: u64) -> TickOutcome {
        self.clock.set(uptime_secs);
        self.tick()
    }

    pub fn ops(&self) -> Vec<IoCall> {
        self.ops.borrow().clone()
    }
}
