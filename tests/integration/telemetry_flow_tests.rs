//! Service-level tests for the reporting plane: telemetry and heartbeat
//! payload content, sensor health alerts, and the critical-level latch.

use aquaguard::cloud::messages::MessageKind;

use crate::mock_hw::Rig;

fn first_body(rig: &Rig, kind: MessageKind) -> serde_json::Value {
    let (_, body) = rig
        .cloud
        .sent
        .iter()
        .find(|(k, _)| *k == kind)
        .expect("expected a delivered message of that kind");
    serde_json::from_slice(body).expect("bodies are valid JSON")
}

fn last_body(rig: &Rig, kind: MessageKind) -> serde_json::Value {
    let (_, body) = rig
        .cloud
        .sent
        .iter()
        .rev()
        .find(|(k, _)| *k == kind)
        .expect("expected a delivered message of that kind");
    serde_json::from_slice(body).expect("bodies are valid JSON")
}

// ── Payload content ───────────────────────────────────────────

#[test]
fn telemetry_body_carries_the_reading() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1000); // 60%, 7935 L
    rig.hw.water_present = true;
    rig.clock.sync_epoch(1_750_000_000);

    rig.tick_at(0);

    let v = first_body(&rig, MessageKind::SensorData);
    assert!((v["level_percentage"].as_f64().unwrap() - 60.0).abs() < 0.01);
    assert!((v["level_liters"].as_f64().unwrap() - 7935.0).abs() < 1.0);
    assert_eq!(v["sensor_health"], "good");
    assert_eq!(v["tank_type"], "sump_tank");
    assert_eq!(v["float_switch"], true);
    assert_eq!(v["motor_running"], false);
    assert_eq!(v["auto_mode"], true);
    assert!(v.get("signal_strength").is_none(), "no association at boot yet");
    assert_eq!(v["timestamp"], 1_750_000_000u64);
    assert_eq!(v["protocol_version"], 1);

    // The next cycle runs with the link up and reports its strength.
    rig.tick_at(30);
    let v = last_body(&rig, MessageKind::SensorData);
    assert_eq!(v["signal_strength"], -58);
}

#[test]
fn heartbeat_reports_device_vitals() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.clock.sync_epoch(1_750_000_000);

    rig.tick_at(0);

    let v = first_body(&rig, MessageKind::Heartbeat);
    assert_eq!(v["motor_state"], "running");
    assert_eq!(v["motor_mode"], "auto");
    assert_eq!(v["pump_starts"], 1);
    assert_eq!(v["link_state"], "connected");
    assert_eq!(v["rssi_dbm"], -58);
    assert_eq!(v["uptime_secs"], 0);
    assert_eq!(v["queue_depth"], 0, "flush runs before the heartbeat");
    assert_eq!(v["queue_dropped"], 0);
    assert_eq!(v["boot_count"], 1);
    assert_eq!(v["last_boot_reason"], "power_on");
    assert_eq!(v["timestamp"], 1_750_000_000u64);
    assert!(!v["firmware_version"].as_str().unwrap().is_empty());
}

#[test]
fn unsynced_clock_stamps_zero() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1000);

    rig.tick_at(0);

    assert_eq!(first_body(&rig, MessageKind::SensorData)["timestamp"], 0);
    assert_eq!(first_body(&rig, MessageKind::Heartbeat)["timestamp"], 0);
}

// ── Sensor health alerts ──────────────────────────────────────

#[test]
fn sensor_failure_and_recovery_alert_once_each() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.tick_at(0);

    // Transducer goes silent: one failure alert, and the running pump is
    // stopped because the level can no longer confirm safe operation.
    rig.hw.distance_mm = None;
    rig.tick_at(2);
    rig.tick_at(4);
    assert_eq!(rig.sink.alert_count("sensor_failed"), 1);
    assert!(rig.sink.motor_reasons().contains(&"sensor_failed"));

    rig.hw.distance_mm = Some(500);
    rig.tick_at(6);

    assert_eq!(rig.cloud.alerts_containing("sensor_failed"), 1);
    assert_eq!(rig.cloud.alerts_containing("sensor_recovered"), 1);
}

#[test]
fn critical_level_alert_latches_with_hysteresis() {
    let mut rig = Rig::new();

    // 4% → latch fires once; hovering at 4% stays quiet; climbing past 10%
    // clears the latch; dropping back to 5% alerts again.
    for (t, mm) in [(0, 2400), (2, 2400), (4, 2200), (6, 2200), (8, 2400), (10, 2400)] {
        rig.hw.distance_mm = Some(mm);
        rig.tick_at(t);
    }

    assert_eq!(rig.sink.alert_count("critical_level"), 2);
    assert_eq!(rig.cloud.alerts_containing("critical_level"), 2);
}
