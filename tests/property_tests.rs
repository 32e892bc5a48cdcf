//! Property tests for the core data paths: level filtering, backoff
//! arithmetic, the outbound queue, request signing and the motor
//! safety gates.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets.  On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use std::collections::VecDeque;

use proptest::prelude::*;

use aquaguard::app::ports::{CloudPort, SensorPort};
use aquaguard::cloud::auth::RequestSigner;
use aquaguard::cloud::messages::{AckStatus, CloudCommand, MessageKind};
use aquaguard::cloud::queue::{OutboundQueue, QUEUE_SLOTS};
use aquaguard::config::SystemConfig;
use aquaguard::conn::capped_backoff;
use aquaguard::error::CommsError;
use aquaguard::motor::{MotorController, MotorMode, MotorState};
use aquaguard::sensors::filter::{LevelFilter, LevelReading, SourceHealth};
use aquaguard::sensors::TankSnapshot;

// ── Level filter invariants ───────────────────────────────────

/// Feeds one prepared burst per sensor cycle.
struct BurstSensor {
    samples: VecDeque<Option<u16>>,
}

impl SensorPort for BurstSensor {
    fn read_distance(&mut self) -> Option<u16> {
        self.samples.pop_front().unwrap_or(None)
    }

    fn read_low_water_switch(&mut self) -> bool {
        true
    }
}

proptest! {
    /// Whatever the transducer produces, the reading stays inside physical
    /// bounds and a failed cycle never overwrites the last good numbers.
    #[test]
    fn filter_output_stays_bounded_and_holds_last_good(
        cycles in proptest::collection::vec(
            proptest::collection::vec(proptest::option::of(0u16..=6000), 5),
            1..=12,
        ),
    ) {
        let mut filter = LevelFilter::new(&SystemConfig::default());
        let mut last_good_percent: Option<f32> = None;

        for (i, burst) in cycles.iter().enumerate() {
            let mut hw = BurstSensor { samples: burst.iter().copied().collect() };
            let reading = filter.sample(&mut hw, i as u64 * 2);

            prop_assert!((0.0..=100.0).contains(&reading.percent));
            prop_assert!(reading.liters >= 0.0);

            match reading.health {
                SourceHealth::Good => last_good_percent = Some(reading.percent),
                SourceHealth::Degraded | SourceHealth::Failed => {
                    if let Some(held) = last_good_percent {
                        prop_assert!(
                            (reading.percent - held).abs() < f32::EPSILON,
                            "bad cycle must hold the last good percent"
                        );
                    }
                }
            }
        }
    }

    /// A single corrupt echo per burst (reflection spike, out-of-range
    /// glitch or timeout) never changes the cycle's outcome: the median
    /// eats it.
    #[test]
    fn one_bad_echo_per_burst_is_invisible(
        bursts in proptest::collection::vec(
            (250u16..4000, proptest::option::of(0u16..=6000), 0usize..5),
            1..=10,
        ),
    ) {
        let cfg = SystemConfig::default();
        let mut clean = LevelFilter::new(&cfg);
        let mut spiked = LevelFilter::new(&cfg);

        for (i, &(value, spike, position)) in bursts.iter().enumerate() {
            let now = i as u64 * 2;
            let clean_burst = vec![Some(value); 5];
            let mut spiked_burst = clean_burst.clone();
            spiked_burst[position] = spike;

            let a = clean.sample(
                &mut BurstSensor { samples: clean_burst.into_iter().collect() },
                now,
            );
            let b = spiked.sample(
                &mut BurstSensor { samples: spiked_burst.into_iter().collect() },
                now,
            );

            prop_assert_eq!(a.percent, b.percent);
            prop_assert_eq!(a.liters, b.liters);
            prop_assert_eq!(a.distance_mm, b.distance_mm);
            prop_assert_eq!(a.health, b.health);
        }
    }
}

// ── Backoff arithmetic ────────────────────────────────────────

proptest! {
    /// The retry delay never exceeds the cap, never shrinks as attempts
    /// grow, and huge attempt counts must not overflow.
    #[test]
    fn backoff_is_monotone_and_capped(
        base in 1u64..=600,
        cap in 1u64..=7200,
        attempts in 0u32..=80,
    ) {
        let delay = capped_backoff(base, cap, attempts);
        let next = capped_backoff(base, cap, attempts + 1);

        prop_assert!(delay <= cap);
        prop_assert!(delay <= next, "delay must not shrink with more attempts");
        prop_assert_eq!(capped_backoff(base, cap, 0), cap.min(base));
    }
}

// ── Outbound queue invariants ─────────────────────────────────

#[derive(Debug, Clone)]
enum QueueOp {
    Enqueue,
    Flush(Vec<bool>), // scripted per-send outcomes
    Advance(u64),
}

fn arb_queue_op() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        3 => Just(QueueOp::Enqueue),
        2 => proptest::collection::vec(any::<bool>(), 0..=20).prop_map(QueueOp::Flush),
        2 => (1u64..=400).prop_map(QueueOp::Advance),
    ]
}

struct ScriptedCloud {
    outcomes: VecDeque<bool>,
}

impl CloudPort for ScriptedCloud {
    fn send(&mut self, _kind: MessageKind, _body: &[u8]) -> Result<(), CommsError> {
        if self.outcomes.pop_front().unwrap_or(true) {
            Ok(())
        } else {
            Err(CommsError::RequestFailed)
        }
    }

    fn fetch_commands(&mut self) -> Result<Vec<CloudCommand>, CommsError> {
        Ok(Vec::new())
    }

    fn ack(&mut self, _id: &str, _status: AckStatus, _detail: &str) -> Result<(), CommsError> {
        Ok(())
    }
}

proptest! {
    /// Arbitrary enqueue/flush/advance interleavings never grow the queue
    /// past its 16 slots, and a flush never claims more sends than the
    /// queue held.
    #[test]
    fn queue_depth_is_bounded(
        ops in proptest::collection::vec(arb_queue_op(), 1..=60),
    ) {
        let mut queue = OutboundQueue::new(&SystemConfig::default());
        let mut now = 0u64;

        for op in ops {
            match op {
                QueueOp::Enqueue => {
                    queue.enqueue(MessageKind::SensorData, b"{}".to_vec(), now);
                }
                QueueOp::Flush(outcomes) => {
                    let before = queue.len();
                    let mut cloud = ScriptedCloud { outcomes: outcomes.into_iter().collect() };
                    let stats = queue.flush(&mut cloud, now);
                    prop_assert!(stats.sent as usize <= before);
                }
                QueueOp::Advance(secs) => now += secs,
            }
            prop_assert!(queue.len() <= QUEUE_SLOTS, "queue must never exceed its slots");
        }
    }

    /// With a cooperative backend and enough time, every message leaves the
    /// queue eventually.
    #[test]
    fn queue_drains_given_a_healthy_backend(
        messages in 1usize..=24,
    ) {
        let mut queue = OutboundQueue::new(&SystemConfig::default());
        for i in 0..messages {
            queue.enqueue(MessageKind::MotorStatus, b"{}".to_vec(), i as u64);
        }

        let mut cloud = ScriptedCloud { outcomes: VecDeque::new() };
        queue.flush(&mut cloud, messages as u64 + 1);
        prop_assert!(queue.is_empty());
    }
}

// ── Request signing ───────────────────────────────────────────

proptest! {
    /// Signatures are deterministic, 64 lowercase hex characters, and the
    /// timestamp echoes the epoch it was signed with.
    #[test]
    fn signatures_are_deterministic_lowercase_hex(
        body in proptest::collection::vec(any::<u8>(), 0..=256),
        epoch in 0u64..=4_102_444_800,
    ) {
        let signer = RequestSigner::new("AG-AABBCC", "key-1", "shared-secret");
        let one = signer.sign(&body, epoch);
        let two = signer.sign(&body, epoch);

        prop_assert_eq!(one.signature.as_str(), two.signature.as_str());
        prop_assert_eq!(one.signature.len(), 64);
        prop_assert!(
            one.signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
        prop_assert_eq!(one.timestamp.as_str(), format!("{epoch}").as_str());
    }
}

// ── Motor safety gates ────────────────────────────────────────

fn snapshot(percent: f32, wet: bool, failed: bool) -> TankSnapshot {
    TankSnapshot {
        level: LevelReading {
            percent,
            liters: percent * 100.0,
            health: if failed { SourceHealth::Failed } else { SourceHealth::Good },
            distance_mm: 0.0,
            sampled_at: 0,
        },
        low_water_switch: wet,
    }
}

#[derive(Debug, Clone, Copy)]
enum MotorOp {
    Tick { percent: f32, wet: bool, failed: bool },
    ManualStart { wet: bool },
    ManualStop,
    SelectMode { auto: bool },
    EmergencyStop,
    Advance(u64),
}

fn arb_motor_op() -> impl Strategy<Value = MotorOp> {
    prop_oneof![
        4 => (0.0f32..=100.0, any::<bool>(), any::<bool>())
            .prop_map(|(percent, wet, failed)| MotorOp::Tick { percent, wet, failed }),
        2 => any::<bool>().prop_map(|wet| MotorOp::ManualStart { wet }),
        1 => Just(MotorOp::ManualStop),
        1 => any::<bool>().prop_map(|auto| MotorOp::SelectMode { auto }),
        1 => Just(MotorOp::EmergencyStop),
        2 => (1u64..=400).prop_map(MotorOp::Advance),
    ]
}

fn apply(motor: &mut MotorController, op: MotorOp, now: &mut u64) {
    match op {
        MotorOp::Tick { percent, wet, failed } => {
            let _ = motor.tick(&snapshot(percent, wet, failed), *now);
        }
        MotorOp::ManualStart { wet } => {
            let _ = motor.request_manual_start(&snapshot(50.0, wet, false), *now);
        }
        MotorOp::ManualStop => {
            let _ = motor.request_manual_stop(&snapshot(50.0, true, false), *now);
        }
        MotorOp::SelectMode { auto } => {
            let _ = motor.set_mode(auto, *now);
        }
        MotorOp::EmergencyStop => {
            let _ = motor.emergency_stop("emergency_stop", &snapshot(50.0, true, false), *now);
        }
        MotorOp::Advance(secs) => *now += secs,
    }
}

proptest! {
    /// The low-water switch is a hard gate: a tick that sees a dry intake
    /// always leaves the relay dropped, a manual start against a dry
    /// intake is always refused, and the relay never disagrees with the
    /// controller state.
    #[test]
    fn dry_intake_always_drops_the_relay(
        ops in proptest::collection::vec(arb_motor_op(), 1..=50),
    ) {
        let mut motor = MotorController::new(&SystemConfig::default());
        let mut now = 0u64;

        for op in ops {
            match op {
                MotorOp::Tick { percent, wet, failed } => {
                    let _ = motor.tick(&snapshot(percent, wet, failed), now);
                    if !wet {
                        prop_assert!(!motor.relay_demand());
                    }
                }
                MotorOp::ManualStart { wet } => {
                    let result = motor.request_manual_start(&snapshot(50.0, wet, false), now);
                    if !wet {
                        prop_assert!(result.is_err());
                    }
                }
                other => apply(&mut motor, other, &mut now),
            }
            prop_assert_eq!(motor.relay_demand(), motor.state() == MotorState::Running);
        }
    }

    /// Once latched, the emergency stop survives every input except an
    /// explicit reset: relay down, Manual mode forced, state pinned.
    #[test]
    fn emergency_latch_survives_everything_but_a_reset(
        ops in proptest::collection::vec(arb_motor_op(), 0..=40),
    ) {
        let mut motor = MotorController::new(&SystemConfig::default());
        let mut now = 0u64;
        let _ = motor.emergency_stop("emergency_stop", &snapshot(50.0, true, false), now);

        for op in ops {
            apply(&mut motor, op, &mut now);
            prop_assert_eq!(motor.state(), MotorState::EmergencyStopped);
            prop_assert!(!motor.relay_demand());
            prop_assert_eq!(motor.mode(), MotorMode::Manual);
        }

        let reset = motor.emergency_reset(&snapshot(50.0, true, false), now);
        prop_assert!(reset.is_ok());
        prop_assert_eq!(motor.state(), MotorState::Idle);
        prop_assert!(!motor.relay_demand());
    }
}
