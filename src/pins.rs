//! GPIO / peripheral pin assignments for the AquaGuard controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! Assignments match the sump-tank controller wiring (ESP32 DevKit).

// ---------------------------------------------------------------------------
// Ultrasonic level sensor (JSN-SR04T waterproof)
// ---------------------------------------------------------------------------

/// Trigger pulse output to the ultrasonic transducer driver.
pub const ULTRASONIC_TRIG_GPIO: i32 = 5;
/// Echo return input (time-of-flight measurement).
pub const ULTRASONIC_ECHO_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Low-water float switch
// ---------------------------------------------------------------------------

/// Float switch at the pump intake, closed to ground while the float is
/// lifted (internal pull-up, active LOW = water present).  Hard safety
/// gate for motor start; read every control tick.
pub const FLOAT_SWITCH_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Motor relay
// ---------------------------------------------------------------------------

/// Pump contactor relay coil (active HIGH).  Must be driven LOW before any
/// other peripheral initialisation so the pump cannot start on power-up.
pub const MOTOR_RELAY_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Panel controls (toggle switches to ground, internal pull-ups, active LOW)
// ---------------------------------------------------------------------------

/// Auto/manual mode selector. Closed (LOW) = Auto.
pub const MODE_SWITCH_GPIO: i32 = 26;
/// Manual motor run switch, honoured only in manual mode. Closed (LOW) = run.
pub const MANUAL_MOTOR_SWITCH_GPIO: i32 = 25;

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// Piezo buzzer — critical level / emergency-stop alarm.
pub const BUZZER_GPIO: i32 = 14;
/// Lit while the controller is in Auto mode.
pub const AUTO_MODE_LED_GPIO: i32 = 16;
/// Lit while the level is at or above the high (overflow-guard) threshold.
pub const TANK_FULL_LED_GPIO: i32 = 17;
/// Lit while the level is at or below the critical threshold.
pub const TANK_LOW_LED_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// UART debug
// ---------------------------------------------------------------------------

pub const UART_TX_GPIO: i32 = 1;
pub const UART_RX_GPIO: i32 = 3;
