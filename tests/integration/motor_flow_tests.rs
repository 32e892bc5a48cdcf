//! Service-level tests for the sensing → safety → relay pipeline.
//!
//! Distances assume the default tank geometry: 250 cm height, sensor at the
//! rim, so `percent = (2500 - distance_mm) / 25`.  The first sensor cycle
//! seeds the filter directly; later cycles move through the EMA.

use aquaguard::motor::{MotorMode, MotorState};

use crate::mock_hw::{IoCall, Rig};

// ── Auto start ────────────────────────────────────────────────

#[test]
fn auto_start_drives_relay_and_indicators() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500); // 80%, above the 75% start threshold
    rig.hw.water_present = true;

    rig.tick_at(0);

    assert_eq!(rig.svc.motor_state(), MotorState::Running);
    assert!(rig.hw.motor_relay_on());
    assert!(rig.hw.auto_led, "auto mode LED follows the selector");
    assert!(!rig.hw.full_led);
    assert!(!rig.hw.buzzer);
    assert_eq!(rig.sink.motor_reasons(), vec!["auto_start"]);
}

#[test]
fn relay_write_precedes_all_network_traffic() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;

    // First tick: motor start, queue flush, heartbeat and command poll all
    // happen in this one call.
    rig.tick_at(0);

    let ops = rig.ops();
    assert_eq!(ops[0], IoCall::Relay(true), "relay is written first");
    let first_send = ops
        .iter()
        .position(|c| matches!(c, IoCall::CloudSend(_)))
        .expect("flush and heartbeat must have sent something");
    assert!(
        ops[..first_send].iter().all(|c| matches!(c, IoCall::Relay(_))),
        "nothing but relay writes may precede the first send, got {:?}",
        ops
    );
}

// ── Safety stops ──────────────────────────────────────────────

#[test]
fn dry_float_switch_stops_between_sensor_cycles() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.tick_at(0);
    assert_eq!(rig.svc.motor_state(), MotorState::Running);

    // One second later the intake runs dry.  The next sensor cycle is still
    // a second away; the switch alone must stop the pump.
    rig.hw.water_present = false;
    rig.tick_at(1);

    assert_eq!(rig.svc.motor_state(), MotorState::CoolingDown);
    assert!(!rig.hw.motor_relay_on());
    assert_eq!(rig.sink.motor_reasons(), vec!["auto_start", "float_switch_cleared"]);

    // Cooldown expires, but a dry intake still blocks every restart.
    rig.tick_at(301);
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
    rig.tick_at(303);
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
    assert!(!rig.hw.motor_relay_on());
}

#[test]
fn auto_stop_when_the_tank_drains() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.tick_at(0);

    // Fast drain: 2500 mm through the fast EMA lands at 24%, under the
    // 25% stop threshold.
    rig.hw.distance_mm = Some(2500);
    rig.tick_at(2);

    assert_eq!(rig.svc.motor_state(), MotorState::CoolingDown);
    assert!(!rig.hw.motor_relay_on());
    assert_eq!(rig.sink.motor_reasons().last(), Some(&"auto_stop"));
}

#[test]
fn overflow_guard_stops_a_running_pump() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.tick_at(0);

    // Inflow faster than the pump: level climbs toward the brim.  The EMA
    // needs two cycles from 80% to cross the 90% guard.
    rig.hw.distance_mm = Some(200);
    rig.tick_at(2);
    assert_eq!(rig.svc.motor_state(), MotorState::Running, "88.4% is still below the guard");

    rig.tick_at(4);
    assert_eq!(rig.svc.motor_state(), MotorState::CoolingDown);
    assert_eq!(rig.sink.motor_reasons().last(), Some(&"overflow_guard"));
    assert!(rig.hw.full_led, "tank full LED at 90%+");
}

// ── Runtime fault escalation ──────────────────────────────────

#[test]
fn third_runtime_fault_latches_emergency_stop() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500); // stays mid-band so only the runtime rule fires
    rig.hw.water_present = true;

    // Two full trips: start, 30 min runtime stop, 5 min cooldown.
    rig.tick_at(0);
    rig.tick_at(1800);
    rig.tick_at(2100);
    rig.tick_at(2102);
    rig.tick_at(3902);
    rig.tick_at(4202);

    // Third trip escalates.
    rig.tick_at(4204);
    rig.tick_at(6004);

    assert_eq!(rig.svc.motor_state(), MotorState::EmergencyStopped);
    assert_eq!(rig.svc.motor_mode(), MotorMode::Manual);
    assert!(!rig.hw.motor_relay_on());
    assert!(rig.hw.buzzer, "emergency stop sounds the buzzer");
    assert!(!rig.hw.auto_led, "forced into manual");
    assert_eq!(rig.sink.alert_count("runtime_fault_limit"), 1);
    assert_eq!(
        rig.sink.motor_reasons(),
        vec![
            "auto_start",
            "runtime_limit",
            "cooldown_complete",
            "auto_start",
            "runtime_limit",
            "cooldown_complete",
            "auto_start",
            "runtime_fault_limit",
        ]
    );

    // Perfect conditions afterwards change nothing; the latch holds.
    rig.tick_at(6010);
    rig.tick_at(6020);
    assert_eq!(rig.svc.motor_state(), MotorState::EmergencyStopped);
    assert!(!rig.hw.motor_relay_on());
}

// ── Panel handling ────────────────────────────────────────────

#[test]
fn mode_flip_with_switch_on_is_not_a_start_request() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1250); // 50%: below auto-start, fine for manual
    rig.hw.water_present = true;
    rig.tick_at(0);
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);

    // Selector flips to Manual while the motor switch is already on.  The
    // switch position is re-baselined, not executed.
    rig.hw.auto_selected = false;
    rig.hw.manual_switch = true;
    rig.tick_at(1);
    assert_eq!(rig.svc.motor_mode(), MotorMode::Manual);
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
    rig.tick_at(2);
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);

    // Cycling the switch is an explicit request.
    rig.hw.manual_switch = false;
    rig.tick_at(3);
    rig.hw.manual_switch = true;
    rig.tick_at(4);
    assert_eq!(rig.svc.motor_state(), MotorState::Running);
    assert!(rig.hw.motor_relay_on());
    assert_eq!(rig.sink.motor_reasons(), vec!["manual_start"]);
}

#[test]
fn manual_switch_is_ignored_in_auto_mode() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1250);
    rig.hw.water_present = true;
    rig.tick_at(0);

    rig.hw.manual_switch = true;
    rig.tick_at(1);

    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
    assert!(rig.sink.motor_reasons().is_empty());
}

// ── Indicators ────────────────────────────────────────────────

#[test]
fn level_leds_track_the_reading() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(2400); // 4%, at the critical threshold
    rig.tick_at(0);
    assert!(rig.hw.low_led);
    assert!(!rig.hw.full_led);
    assert!(rig.hw.buzzer, "critically low water sounds the buzzer");

    let mut full = Rig::new();
    full.hw.distance_mm = Some(200); // 92%
    full.tick_at(0);
    assert!(full.hw.full_led);
    assert!(!full.hw.low_led);
    assert!(!full.hw.buzzer);
}
