//! Panel indicator driver: three status LEDs plus the alarm buzzer.
//!
//! All four are plain GPIO outputs.  Levels are cached so the main loop
//! can restate the whole indicator set every tick; only edges reach the
//! pins.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: writes GPIOs via hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

pub struct Indicators {
    auto_mode_led: bool,
    tank_full_led: bool,
    tank_low_led: bool,
    buzzer: bool,
}

impl Indicators {
    pub fn new() -> Self {
        let mut ind = Self {
            auto_mode_led: true,
            tank_full_led: true,
            tank_low_led: true,
            buzzer: true,
        };
        // Cached levels start inverted so these first writes all land.
        ind.set_auto_mode_led(false);
        ind.set_tank_full_led(false);
        ind.set_tank_low_led(false);
        ind.set_buzzer(false);
        ind
    }

    pub fn set_auto_mode_led(&mut self, on: bool) {
        if on != self.auto_mode_led {
            hw_init::gpio_write(pins::AUTO_MODE_LED_GPIO, on);
            self.auto_mode_led = on;
        }
    }

    pub fn set_tank_full_led(&mut self, on: bool) {
        if on != self.tank_full_led {
            hw_init::gpio_write(pins::TANK_FULL_LED_GPIO, on);
            self.tank_full_led = on;
        }
    }

    pub fn set_tank_low_led(&mut self, on: bool) {
        if on != self.tank_low_led {
            hw_init::gpio_write(pins::TANK_LOW_LED_GPIO, on);
            self.tank_low_led = on;
        }
    }

    pub fn set_buzzer(&mut self, on: bool) {
        if on != self.buzzer {
            hw_init::gpio_write(pins::BUZZER_GPIO, on);
            self.buzzer = on;
        }
    }

    pub fn buzzer_on(&self) -> bool {
        self.buzzer
    }
}
