//! Front-panel switch driver.
//!
//! ## Hardware
//!
//! Two toggle switches wired to ground with internal pull-ups:
//!
//! | Switch        | Closed (LOW)      | Open (HIGH)      |
//! |---------------|-------------------|------------------|
//! | Mode          | Auto              | Manual           |
//! | Manual motor  | Run request       | Stop request     |
//!
//! Toggle switches bounce on the order of milliseconds; a reading only
//! becomes the accepted level once it has held steady for the debounce
//! window.  No ISR, the main loop polls at control-tick rate which is
//! plenty for a human-operated toggle.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the real GPIO levels via hw_init.
//! On host/test: reads from static atomics for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
#[cfg(target_os = "espidf")]
use crate::pins;

const DEBOUNCE_MS: u32 = 30;

#[cfg(not(target_os = "espidf"))]
static SIM_AUTO_MODE: AtomicBool = AtomicBool::new(true);
#[cfg(not(target_os = "espidf"))]
static SIM_MANUAL_MOTOR: AtomicBool = AtomicBool::new(false);

/// Inject panel switch positions (logical, not electrical levels).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_panel(auto_mode: bool, manual_motor_on: bool) {
    SIM_AUTO_MODE.store(auto_mode, Ordering::Relaxed);
    SIM_MANUAL_MOTOR.store(manual_motor_on, Ordering::Relaxed);
}

/// Debounce state machine for one polled contact.
#[derive(Debug, Clone, Copy)]
pub struct Debounced {
    stable: bool,
    candidate: bool,
    candidate_since_ms: u32,
}

impl Debounced {
    pub fn new(initial: bool) -> Self {
        Self {
            stable: initial,
            candidate: initial,
            candidate_since_ms: 0,
        }
    }

    /// Feed one raw sample; returns the debounced level.
    pub fn update(&mut self, raw: bool, now_ms: u32) -> bool {
        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since_ms = now_ms;
        } else if raw != self.stable
            && now_ms.wrapping_sub(self.candidate_since_ms) >= DEBOUNCE_MS
        {
            self.stable = raw;
        }
        self.stable
    }

    pub fn level(&self) -> bool {
        self.stable
    }
}

/// Both panel switches, polled together each control tick.
pub struct PanelSwitches {
    mode: Debounced,
    manual_motor: Debounced,
}

impl PanelSwitches {
    pub fn new() -> Self {
        // Seed from the live pins so boot state matches the panel.
        Self {
            mode: Debounced::new(Self::mode_raw()),
            manual_motor: Debounced::new(Self::manual_motor_raw()),
        }
    }

    /// Poll both pins once.  `now_ms` is monotonic milliseconds.
    pub fn poll(&mut self, now_ms: u32) {
        self.mode.update(Self::mode_raw(), now_ms);
        self.manual_motor.update(Self::manual_motor_raw(), now_ms);
    }

    /// Active-low: switch closed (LOW) selects Auto.
    pub fn auto_mode_selected(&self) -> bool {
        !self.mode.level()
    }

    /// Active-low: switch closed (LOW) requests the motor on.
    pub fn manual_motor_on(&self) -> bool {
        !self.manual_motor.level()
    }

    #[cfg(target_os = "espidf")]
    fn mode_raw() -> bool {
        hw_init::gpio_read(pins::MODE_SWITCH_GPIO)
    }

    #[cfg(not(target_os = "espidf"))]
    fn mode_raw() -> bool {
        // Electrical level of an active-low contact.
        !SIM_AUTO_MODE.load(Ordering::Relaxed)
    }

    #[cfg(target_os = "espidf")]
    fn manual_motor_raw() -> bool {
        hw_init::gpio_read(pins::MANUAL_MOTOR_SWITCH_GPIO)
    }

    #[cfg(not(target_os = "espidf"))]
    fn manual_motor_raw() -> bool {
        !SIM_MANUAL_MOTOR.load(Ordering::Relaxed)
    }
}
