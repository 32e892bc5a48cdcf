//! Motor relay driver.
//!
//! Single GPIO driving the pump contactor coil (active-high through the
//! relay board's transistor stage).  State is cached so the main loop can
//! restate the demanded level every tick without spamming writes or logs.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: writes the relay GPIO via hw_init.
//! On host/test: tracks state in-memory only.

use log::{info, warn};

use crate::drivers::hw_init;
use crate::pins;

pub struct MotorRelay {
    on: bool,
}

impl MotorRelay {
    /// The relay comes up released regardless of what the pin held before.
    pub fn new() -> Self {
        hw_init::gpio_write(pins::MOTOR_RELAY_GPIO, false);
        Self { on: false }
    }

    /// Drive the relay to `on`.  Idempotent; only edge changes touch the
    /// pin and the log.
    pub fn set(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        hw_init::gpio_write(pins::MOTOR_RELAY_GPIO, on);
        self.on = on;
        info!("motor relay {}", if on { "CLOSED" } else { "released" });
    }

    /// Unconditional release, used on shutdown and panic paths.
    pub fn force_off(&mut self) {
        hw_init::gpio_write(pins::MOTOR_RELAY_GPIO, false);
        if self.on {
            warn!("motor relay force-released");
        }
        self.on = false;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Drop for MotorRelay {
    fn drop(&mut self) {
        self.force_off();
    }
}
