//! Low-water float switch at the pump intake.
//!
//! A mechanical float closes the contact to ground while enough water
//! surrounds the intake (internal pull-up, active LOW).  A broken wire
//! therefore reads as "no water", which fails safe.  This is the hard
//! safety gate for motor starts, so it is read fresh every control tick,
//! independent of the slower ultrasonic cycle.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the real GPIO level via hw_init.
//! On host/test: reads from a static atomic (defaults to water-present).

use core::sync::atomic::AtomicBool;
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

static SIM_FLOAT_SWITCH: AtomicBool = AtomicBool::new(true);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_float_switch(water_present: bool) {
    SIM_FLOAT_SWITCH.store(water_present, Ordering::Relaxed);
}

pub struct FloatSwitch {
    _gpio: i32,
    last: bool,
}

impl FloatSwitch {
    pub fn new(gpio: i32) -> Self {
        Self { _gpio: gpio, last: true }
    }

    /// Current switch level. `true` = water present.
    pub fn read(&mut self) -> bool {
        self.last = self.read_hw();
        self.last
    }

    /// Most recent read without touching the hardware again.
    pub fn water_present(&self) -> bool {
        self.last
    }

    #[cfg(target_os = "espidf")]
    fn read_hw(&self) -> bool {
        // Active low: closed contact (water) pulls the pin to ground.
        !hw_init::gpio_read(self._gpio)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_hw(&self) -> bool {
        SIM_FLOAT_SWITCH.load(Ordering::Relaxed)
    }
}
