//! Hardware adapter — bridges real peripherals to domain port traits.
//!
//! Owns the level sensors and all panel hardware, exposing them through
//! [`SensorPort`], [`RelayPort`], [`PanelPort`] and [`IndicatorPort`].
//! This is the only module in the system that touches actual hardware.
//! On non-espidf targets, the underlying drivers use cfg-gated
//! simulation stubs.

use crate::app::ports::{IndicatorPort, PanelPort, RelayPort, SensorPort};
use crate::drivers::indicators::Indicators;
use crate::drivers::panel::PanelSwitches;
use crate::drivers::relay::MotorRelay;
use crate::pins;
use crate::sensors::float_switch::FloatSwitch;
use crate::sensors::ultrasonic::UltrasonicSensor;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    ultrasonic: UltrasonicSensor,
    float_switch: FloatSwitch,
    relay: MotorRelay,
    panel: PanelSwitches,
    indicators: Indicators,
    #[cfg(not(target_os = "espidf"))]
    boot: std::time::Instant,
}

impl HardwareAdapter {
    pub fn new() -> Self {
        Self {
            ultrasonic: UltrasonicSensor::new(
                pins::ULTRASONIC_TRIG_GPIO,
                pins::ULTRASONIC_ECHO_GPIO,
            ),
            float_switch: FloatSwitch::new(pins::FLOAT_SWITCH_GPIO),
            relay: MotorRelay::new(),
            panel: PanelSwitches::new(),
            indicators: Indicators::new(),
            #[cfg(not(target_os = "espidf"))]
            boot: std::time::Instant::now(),
        }
    }

    /// Release every output.  Called on controlled shutdown paths.
    pub fn all_off(&mut self) {
        self.relay.force_off();
        self.indicators.set_auto_mode_led(false);
        self.indicators.set_tank_full_led(false);
        self.indicators.set_tank_low_led(false);
        self.indicators.set_buzzer(false);
    }

    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u32 {
        ((unsafe { esp_idf_svc::sys::esp_timer_get_time() }) / 1000) as u32
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u32 {
        self.boot.elapsed().as_millis() as u32
    }
}

// ── SensorPort ────────────────────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn read_distance(&mut self) -> Option<u16> {
        self.ultrasonic.read_mm()
    }

    fn read_low_water_switch(&mut self) -> bool {
        self.float_switch.read()
    }
}

// ── RelayPort ─────────────────────────────────────────────────

impl RelayPort for HardwareAdapter {
    fn set_motor_relay(&mut self, on: bool) {
        self.relay.set(on);
    }

    fn motor_relay_on(&self) -> bool {
        self.relay.is_on()
    }
}

// ── PanelPort ─────────────────────────────────────────────────

impl PanelPort for HardwareAdapter {
    fn auto_mode_selected(&mut self) -> bool {
        let now_ms = self.now_ms();
        self.panel.poll(now_ms);
        self.panel.auto_mode_selected()
    }

    fn manual_motor_on(&mut self) -> bool {
        // poll() already ran this tick via auto_mode_selected(); a second
        // poll in the same millisecond is harmless.
        self.panel.manual_motor_on()
    }
}

// ── IndicatorPort ─────────────────────────────────────────────

impl IndicatorPort for HardwareAdapter {
    fn set_auto_mode_led(&mut self, on: bool) {
        self.indicators.set_auto_mode_led(on);
    }

    fn set_tank_full_led(&mut self, on: bool) {
        self.indicators.set_tank_full_led(on);
    }

    fn set_tank_low_led(&mut self, on: bool) {
        self.indicators.set_tank_low_led(on);
    }

    fn set_buzzer(&mut self, on: bool) {
        self.indicators.set_buzzer(on);
    }
}
