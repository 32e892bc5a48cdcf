//! One-shot hardware peripheral initialization and raw pin access.
//!
//! Configures GPIO directions using raw ESP-IDF sys calls.  Called once
//! from `main()` before anything else runs; the motor relay pin is driven
//! LOW before any other peripheral is touched so a reboot mid-pump-run
//! cannot leave the relay floating closed.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
        }
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before the control loop; single-threaded.
    unsafe {
        init_relay_first()?;
        init_gpio_outputs()?;
        init_gpio_inputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO outputs ──────────────────────────────────────────────

/// The relay pin is configured and driven LOW before everything else.
#[cfg(target_os = "espidf")]
unsafe fn init_relay_first() -> Result<(), HwInitError> {
    unsafe {
        config_output(pins::MOTOR_RELAY_GPIO)?;
        gpio_set_level(pins::MOTOR_RELAY_GPIO, 0);
    }
    info!("hw_init: motor relay forced LOW");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let output_pins = [
        pins::ULTRASONIC_TRIG_GPIO,
        pins::BUZZER_GPIO,
        pins::AUTO_MODE_LED_GPIO,
        pins::TANK_FULL_LED_GPIO,
        pins::TANK_LOW_LED_GPIO,
    ];
    for &pin in &output_pins {
        unsafe {
            config_output(pin)?;
            gpio_set_level(pin, 0);
        }
    }
    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
unsafe fn config_output(pin: i32) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    Ok(())
}

// ── GPIO inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    // Switches are wired to ground; internal pull-ups make open = HIGH.
    let pulled_up = [
        pins::FLOAT_SWITCH_GPIO,
        pins::MODE_SWITCH_GPIO,
        pins::MANUAL_MOTOR_SWITCH_GPIO,
    ];
    for &pin in &pulled_up {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    // Echo is driven by the sensor module; no pull.
    let echo_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::ULTRASONIC_ECHO_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&echo_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // main-loop only.
    unsafe {
        gpio_set_level(pin, i32::from(high) as u32);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── HC-SR04 pulse measurement ─────────────────────────────────

/// Round-trip echo ceiling.  ~30ms covers a 5m range; anything longer is
/// a lost echo, not a reading.
#[cfg(target_os = "espidf")]
const ECHO_TIMEOUT_US: i64 = 30_000;

/// Fire one trigger pulse and time the echo.  Returns the distance in
/// millimetres, or `None` when the echo never came back.
///
/// Blocks the calling task for at most two timeout windows; at the sensor
/// cadence this is invisible to the control loop.
#[cfg(target_os = "espidf")]
pub fn ultrasonic_read_mm(trig: i32, echo: i32) -> Option<u16> {
    // SAFETY: plain GPIO register reads/writes plus the RTC microsecond
    // counter; all safe from main-task context on configured pins.
    unsafe {
        gpio_set_level(trig, 0);
        esp_rom_delay_us(2);
        gpio_set_level(trig, 1);
        esp_rom_delay_us(10);
        gpio_set_level(trig, 0);

        let wait_start = esp_timer_get_time();
        while gpio_get_level(echo) == 0 {
            if esp_timer_get_time() - wait_start > ECHO_TIMEOUT_US {
                return None;
            }
        }
        let pulse_start = esp_timer_get_time();
        while gpio_get_level(echo) != 0 {
            if esp_timer_get_time() - pulse_start > ECHO_TIMEOUT_US {
                return None;
            }
        }
        let pulse_us = esp_timer_get_time() - pulse_start;

        // Speed of sound 343 m/s, halved for the round trip: 0.1715 mm/µs.
        Some((pulse_us as f32 * 0.1715) as u16)
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ultrasonic_read_mm(_trig: i32, _echo: i32) -> Option<u16> {
    None
}
