//! Service-level tests for connectivity supervision: store-and-forward
//! while offline, backoff pacing, the Stable dwell, and heartbeat policy.

use aquaguard::cloud::messages::MessageKind;
use aquaguard::config::SystemConfig;
use aquaguard::conn::LinkState;
use aquaguard::motor::MotorState;

use crate::mock_hw::Rig;

// ── Store and forward ─────────────────────────────────────────

#[test]
fn offline_telemetry_buffers_then_drains_in_order() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1000);
    rig.link.fail_next = 4;

    // Four failed attempts walk the backoff curve: retries at 2, 6, 14, 30.
    rig.tick_at(0);
    assert_eq!(rig.svc.link_state(), LinkState::Reconnecting);
    rig.tick_at(2);
    rig.tick_at(6);
    rig.tick_at(14);
    assert!(rig.cloud.sent.is_empty(), "nothing may be sent while offline");

    // Fifth attempt succeeds; the same tick flushes the backlog.
    rig.tick_at(30);
    assert_eq!(rig.svc.link_state(), LinkState::Connected);
    assert_eq!(rig.link.connects, 5);

    let kinds: Vec<MessageKind> = rig.cloud.sent.iter().map(|(k, _)| *k).collect();
    assert_eq!(
        kinds,
        vec![
            MessageKind::SystemAlert, // boot alert
            MessageKind::SensorData,  // t=0 telemetry
            MessageKind::SensorData,  // t=30 telemetry
            MessageKind::Heartbeat,
        ],
        "backlog drains oldest-first, then the live heartbeat"
    );
    assert_eq!(rig.svc.queue_len(), 0);
}

#[test]
fn local_control_runs_while_fully_offline() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.link.fail_next = u32::MAX;
    rig.cloud.push_command("c-1", "emergency_stop");

    rig.tick_at(0);
    rig.tick_at(2);
    rig.tick_at(6);

    assert_eq!(rig.svc.motor_state(), MotorState::Running);
    assert!(rig.hw.motor_relay_on());
    assert!(rig.cloud.sent.is_empty());
    assert!(rig.cloud.acks.is_empty(), "commands are not polled offline");
    // Boot alert, motor start record and first telemetry wait in the queue.
    assert_eq!(rig.svc.queue_len(), 3);
}

// ── Dwell and backoff reset ───────────────────────────────────

#[test]
fn stable_dwell_resets_the_backoff_curve() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1000);

    rig.tick_at(0);
    assert_eq!(rig.svc.link_state(), LinkState::Connected);
    rig.tick_at(60);
    assert_eq!(rig.svc.link_state(), LinkState::Stable);

    // Carrier drops; history was cleared by the dwell, so the retry comes
    // after the base delay (2s), not further up the curve.
    rig.link.drop_carrier();
    rig.tick_at(70);
    assert_eq!(rig.svc.link_state(), LinkState::Reconnecting);
    let sent_while_offline = rig.cloud.sent.len();

    rig.tick_at(71);
    assert_eq!(rig.link.connects, 1, "too early for the retry");
    assert_eq!(rig.cloud.sent.len(), sent_while_offline);

    rig.tick_at(72);
    assert_eq!(rig.svc.link_state(), LinkState::Connected);
    assert_eq!(rig.link.connects, 2);
}

// ── Heartbeats ────────────────────────────────────────────────

#[test]
fn heartbeats_keep_cadence_and_are_never_queued() {
    let config = SystemConfig {
        telemetry_interval_secs: 600, // keep telemetry out of the way
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config);
    rig.hw.distance_mm = Some(1000);

    rig.tick_at(0);
    assert_eq!(rig.cloud.sent_count(MessageKind::Heartbeat), 1);
    rig.tick_at(10);
    assert_eq!(rig.cloud.sent_count(MessageKind::Heartbeat), 1, "30s cadence");

    // A failed heartbeat is dropped, not retried out of band.
    rig.cloud.fail_sends = 1;
    rig.tick_at(30);
    assert_eq!(rig.cloud.sent_count(MessageKind::Heartbeat), 1);
    assert_eq!(rig.svc.queue_len(), 0, "heartbeats never enter the queue");
    rig.tick_at(31);
    assert_eq!(rig.cloud.sent_count(MessageKind::Heartbeat), 1);

    rig.tick_at(60);
    assert_eq!(rig.cloud.sent_count(MessageKind::Heartbeat), 2);
}

#[test]
fn repeated_heartbeat_misses_mark_the_backend_unresponsive() {
    let config = SystemConfig {
        telemetry_interval_secs: 600,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config);
    rig.hw.distance_mm = Some(1000);
    assert!(rig.svc.backend_responsive());

    // Every send fails for three heartbeat intervals.  The queue swallows
    // its own failures; only the heartbeat run of misses flips the flag.
    rig.cloud.fail_sends = 6;
    rig.tick_at(0);
    rig.tick_at(30);
    assert!(rig.svc.backend_responsive(), "two misses are not yet a verdict");
    rig.tick_at(60);
    assert!(!rig.svc.backend_responsive());

    // One delivered heartbeat clears the run.
    rig.tick_at(90);
    assert!(rig.svc.backend_responsive());
}
