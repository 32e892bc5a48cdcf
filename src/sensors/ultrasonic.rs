//! JSN-SR04T waterproof ultrasonic distance capability.
//!
//! The transducer points down at the water surface; one sample is the
//! round-trip time-of-flight converted to millimetres.  Trigger/echo
//! timing itself lives in `hw_init` — this module only exposes "give me
//! one sample or tell me it timed out".
//!
//! ## Dual-target design
//!
//! On ESP-IDF: pulses the trigger pin and times the echo via hw_init.
//! On host/test: reads from static atomics for injection.

use core::sync::atomic::{AtomicBool, AtomicU16};
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

static SIM_DISTANCE_MM: AtomicU16 = AtomicU16::new(1000);
static SIM_ECHO_TIMEOUT: AtomicBool = AtomicBool::new(false);

/// Inject the distance the next samples will report.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_distance_mm(mm: u16) {
    SIM_DISTANCE_MM.store(mm, Ordering::Relaxed);
}

/// Make subsequent samples time out (sensor unplugged / surface foam).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_echo_timeout(timeout: bool) {
    SIM_ECHO_TIMEOUT.store(timeout, Ordering::Relaxed);
}

pub struct UltrasonicSensor {
    _trig_gpio: i32,
    _echo_gpio: i32,
}

impl UltrasonicSensor {
    pub fn new(trig_gpio: i32, echo_gpio: i32) -> Self {
        Self {
            _trig_gpio: trig_gpio,
            _echo_gpio: echo_gpio,
        }
    }

    /// One raw distance sample.  `None` when the echo window expires
    /// without a return pulse.
    pub fn read_mm(&mut self) -> Option<u16> {
        self.read_hw()
    }

    #[cfg(target_os = "espidf")]
    fn read_hw(&mut self) -> Option<u16> {
        hw_init::ultrasonic_read_mm(self._trig_gpio, self._echo_gpio)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_hw(&mut self) -> Option<u16> {
        if SIM_ECHO_TIMEOUT.load(Ordering::Relaxed) {
            None
        } else {
            Some(SIM_DISTANCE_MM.load(Ordering::Relaxed))
        }
    }
}
