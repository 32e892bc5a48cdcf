//! Service-level tests for the daily maintenance restart: wall-clock
//! gating, the boot-loop guard, and the graceful shutdown path.

use aquaguard::config::SystemConfig;
use aquaguard::motor::MotorState;

use crate::mock_hw::Rig;

#[test]
fn scheduled_restart_fires_once_inside_the_minute() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1000);
    rig.clock.set_wall_clock(Some((3, 0)));

    let outcome = rig.tick_at(10_000);
    assert!(outcome.restart.is_none(), "grace period runs first");
    assert_eq!(rig.sink.restart_pending_reason(), Some("scheduled_maintenance"));

    let outcome = rig.tick_at(10_002);
    assert!(outcome.restart.is_none());
    assert_eq!(rig.cloud.alerts_containing("restart_pending"), 1);

    let outcome = rig.tick_at(10_005);
    assert_eq!(outcome.restart, Some("scheduled_maintenance"));
}

#[test]
fn schedule_never_fires_without_a_synced_clock() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1000);

    // Hours of uptime, no NTP sync: the 03:00 window silently passes.
    for t in [10_000, 10_060, 10_120, 20_000] {
        let outcome = rig.tick_at(t);
        assert!(outcome.restart.is_none());
    }
    assert_eq!(rig.sink.restart_pending_reason(), None);
}

#[test]
fn restart_window_right_after_boot_is_skipped() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(1000);
    rig.clock.set_wall_clock(Some((3, 0)));

    // Booted back into its own maintenance minute: firing again would loop.
    rig.tick_at(12);
    rig.tick_at(80);
    assert_eq!(rig.sink.restart_pending_reason(), None);

    // The minute passes, and the next day's window arms normally.
    rig.clock.set_wall_clock(Some((3, 1)));
    rig.tick_at(200);
    rig.clock.set_wall_clock(Some((3, 0)));
    rig.tick_at(86_400);
    assert_eq!(rig.sink.restart_pending_reason(), Some("scheduled_maintenance"));
}

#[test]
fn disabled_schedule_never_arms() {
    let config = SystemConfig {
        maintenance_restart_enabled: false,
        ..SystemConfig::default()
    };
    let mut rig = Rig::with_config(config);
    rig.hw.distance_mm = Some(1000);
    rig.clock.set_wall_clock(Some((3, 0)));

    let outcome = rig.tick_at(10_000);
    assert!(outcome.restart.is_none());
    assert_eq!(rig.sink.restart_pending_reason(), None);
}

#[test]
fn armed_restart_takes_the_pump_down_through_the_grace_window() {
    let mut rig = Rig::new();
    rig.hw.distance_mm = Some(500);
    rig.hw.water_present = true;
    rig.tick_at(9_000);
    assert_eq!(rig.svc.motor_state(), MotorState::Running);

    rig.clock.set_wall_clock(Some((3, 0)));
    rig.tick_at(10_000);

    // Stopped on the next tick and held down by the stop's cooldown.
    rig.tick_at(10_001);
    assert_eq!(rig.svc.motor_state(), MotorState::Idle);
    assert!(!rig.hw.motor_relay_on());
    assert_eq!(rig.sink.motor_reasons(), vec!["auto_start", "maintenance_stop"]);

    let outcome = rig.tick_at(10_005);
    assert_eq!(outcome.restart, Some("scheduled_maintenance"));
    assert!(!rig.hw.motor_relay_on());
}
