//! Service-level tests for the cloud command path: poll, dedupe, execute,
//! ack.  Commands only ever reach the motor through the same safety gates
//! the panel uses.

use aquaguard::cloud::messages::AckStatus;
use aquaguard::motor::{MotorMode, MotorState};

use crate::mock_hw::{IoCall, Rig};

// ── Execution and acks ────────────────────────────────────────

#[test]
fn motor_start_command_runs_the_pump_in_manual_mode() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1250); // 50%: manual bypasses the threshold
    rig.hw.water_present = true;
    rig.hw.auto_selected = false;
    rig.cloud.push_command("c-1", "motor_start");

    rig.tick_at(0);

    assert_eq!(rig.svc.motor_state(), MotorState::Running);
    assert_eq!(
        rig.cloud.acks,
        vec![("c-1".to_owned(), AckStatus::Accepted, String::new())]
    );
    // The relay was written before the command arrived; the demand reaches
    // the hardware on the next tick.
    assert!(!rig.hw.motor_relay_on());
    rig.tick_at(1);
    assert!(rig.hw.motor_relay_on());
}

#[test]
fn motor_start_command_rejected_in_auto_mode() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1250);
    rig.hw.water_present = true;
    rig.cloud.push_command("c-2", "motor_start");

    rig.tick_at(0);

    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
    assert_eq!(
        rig.cloud.acks,
        vec![("c-2".to_owned(), AckStatus::Rejected, "not_in_manual_mode".to_owned())]
    );
}

#[test]
fn unknown_command_type_is_acked_and_ignored() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1250);
    rig.cloud.push_command("c-9", "defrost_freezer");

    rig.tick_at(0);

    assert_eq!(
        rig.cloud.acks,
        vec![("c-9".to_owned(), AckStatus::Unknown, "unknown_type".to_owned())]
    );
    assert!(rig.sink.motor_reasons().is_empty());
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
}

// ── Dedupe ────────────────────────────────────────────────────

#[test]
fn redelivered_command_is_acked_duplicate_not_rerun() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1250);
    rig.hw.water_present = true;
    rig.hw.auto_selected = false;
    rig.cloud.push_command("c-7", "motor_start");
    rig.tick_at(0);

    // The backend loses the ack and redelivers the same id on the next poll.
    rig.cloud.push_command("c-7", "motor_start");
    rig.tick_at(5);

    assert_eq!(rig.cloud.acks.len(), 2);
    assert_eq!(rig.cloud.acks[0].1, AckStatus::Accepted);
    assert_eq!(
        rig.cloud.acks[1],
        ("c-7".to_owned(), AckStatus::Duplicate, "already_handled".to_owned())
    );
    assert_eq!(rig.sink.motor_reasons(), vec!["manual_start"], "executed exactly once");
    assert_eq!(rig.svc.motor_state(), MotorState::Running);
}

// ── Emergency stop / reset ────────────────────────────────────

#[test]
fn emergency_stop_and_reset_round_trip() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.tick_at(0);
    assert_eq!(rig.svc.motor_state(), MotorState::Running);

    rig.cloud.push_command("c-10", "emergency_stop");
    rig.tick_at(5);
    assert_eq!(rig.svc.motor_state(), MotorState::EmergencyStopped);
    assert_eq!(rig.svc.motor_mode(), MotorMode::Manual);
    assert_eq!(rig.sink.alert_count("emergency_stop"), 1);

    rig.tick_at(6);
    assert!(!rig.hw.motor_relay_on());
    assert!(rig.hw.buzzer);

    // A second stop while latched is success with nothing to do.
    rig.cloud.push_command("c-11", "emergency_stop");
    rig.tick_at(10);
    assert_eq!(rig.cloud.acks.last().unwrap().2, "already_stopped");

    rig.cloud.push_command("c-12", "emergency_reset");
    rig.tick_at(15);
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
    assert_eq!(rig.svc.motor_mode(), MotorMode::Manual, "reset lands in manual");

    rig.tick_at(16);
    assert!(!rig.hw.buzzer);
    assert_eq!(
        rig.sink.motor_reasons(),
        vec!["auto_start", "emergency_stop", "emergency_reset"]
    );
}

// ── Restart ───────────────────────────────────────────────────

#[test]
fn restart_command_runs_the_shutdown_sequence() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.tick_at(0);
    assert_eq!(rig.svc.motor_state(), MotorState::Running);

    rig.cloud.push_command("c-20", "restart");
    let outcome = rig.tick_at(5);
    assert!(outcome.restart.is_none(), "grace period first");
    assert_eq!(rig.sink.restart_pending_reason(), Some("cloud_command"));

    // The armed restart takes the pump down on the next tick and holds it.
    let outcome = rig.tick_at(6);
    assert!(outcome.restart.is_none());
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
    assert!(!rig.hw.motor_relay_on());
    assert_eq!(rig.sink.motor_reasons(), vec!["auto_start", "maintenance_stop"]);
    assert_eq!(rig.cloud.alerts_containing("restart_pending"), 1);

    // Grace elapsed: the caller is told to reset.
    let outcome = rig.tick_at(10);
    assert_eq!(outcome.restart, Some("cloud_command"));
    assert!(!rig.hw.motor_relay_on());
}

// ── Poll cadence ──────────────────────────────────────────────

#[test]
fn command_poll_waits_out_its_interval() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1000);

    rig.tick_at(0);
    rig.tick_at(2);
    rig.tick_at(4);
    rig.tick_at(5);

    let polls = rig
        .ops()
        .iter()
        .filter(|c| matches!(c, IoCall::CommandPoll))
        .count();
    assert_eq!(polls, 2, "polls at t=0 and t=5 only");
}
