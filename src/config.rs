//! System configuration parameters
//!
//! All tunable parameters for the AquaGuard controller.
//! Values can be overridden via NVS (non-volatile storage); defaults match
//! the reference sump-tank installation.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Which reservoir this device is mounted on.
///
/// The motor relay is only fitted on the sump controller; a top-tank unit
/// runs the same firmware with the motor path permanently idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TankKind {
    SumpTank,
    TopTank,
}

impl TankKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SumpTank => "sump_tank",
            Self::TopTank => "top_tank",
        }
    }
}

impl fmt::Display for TankKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tank cross-section used for litre conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TankShape {
    Rectangular,
    Cylindrical,
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Device identity ---
    /// Stable device id. Empty = derive from the station MAC at boot.
    pub device_id: heapless::String<24>,
    /// Reservoir this unit monitors.
    pub tank_kind: TankKind,

    // --- Tank geometry ---
    pub tank_shape: TankShape,
    /// Inside height of the tank (cm); 100% level = water at this height.
    pub tank_height_cm: f32,
    /// Length × breadth for rectangular tanks (cm).
    pub tank_length_cm: f32,
    pub tank_breadth_cm: f32,
    /// Diameter for cylindrical tanks (cm); ignored for rectangular.
    pub tank_diameter_cm: f32,
    /// Distance from the sensor face down to the 100% water line (cm).
    pub sensor_offset_cm: f32,

    // --- Level filter ---
    /// Raw distance samples taken per sensor cycle.
    pub samples_per_cycle: u8,
    /// Minimum valid samples for a trusted (Good) cycle.
    pub min_valid_samples: u8,
    /// Plausible distance window (mm); samples outside are discarded.
    pub min_distance_mm: u16,
    pub max_distance_mm: u16,
    /// EMA smoothing factor for steady conditions.
    pub ema_alpha: f32,
    /// EMA factor when the median jumps (fast fill/drain tracking).
    pub ema_alpha_fast: f32,
    /// Median step (mm) beyond which the fast factor applies.
    pub jump_threshold_mm: f32,
    /// Seconds between sensor cycles.
    pub sensor_cycle_secs: u16,

    // --- Motor safety ---
    /// Auto mode starts the pump at/above this level (%).
    pub auto_start_percent: f32,
    /// Auto mode stops the pump at/below this level (%).
    pub auto_stop_percent: f32,
    /// Overflow guard: never run at/above this level (%).
    pub high_level_percent: f32,
    /// Critical low level (%): alarm + tank-low indicator.
    pub critical_level_percent: f32,
    /// Hard runtime limit for one continuous run (seconds).
    pub max_runtime_secs: u32,
    /// Mandatory rest period after a stop before auto restarts (seconds).
    pub cooldown_secs: u32,
    /// Runtime-limit trips before latching the emergency stop.
    pub max_runtime_faults: u8,

    // --- WiFi ---
    pub wifi_ssid: heapless::String<32>,
    pub wifi_password: heapless::String<64>,
    /// Reconnect backoff: first retry delay (seconds).
    pub link_backoff_base_secs: u16,
    /// Reconnect backoff ceiling (seconds).
    pub link_backoff_cap_secs: u16,
    /// Connected time without a drop before the session counts as Stable.
    pub stable_dwell_secs: u16,
    /// Upper bound on a single blocking connect attempt (seconds).
    pub connect_timeout_secs: u16,

    // --- Cloud backend ---
    pub backend_host: String,
    pub backend_port: u16,
    pub backend_use_tls: bool,
    /// Per-device API key, issued when the device is registered.
    pub api_key: String,
    /// Per-device HMAC secret for request signing (hex string).
    pub hmac_secret: String,
    /// Seconds between queued telemetry reports.
    pub telemetry_interval_secs: u16,
    /// Seconds between direct heartbeats while online.
    pub heartbeat_interval_secs: u16,
    /// Seconds between command polls while online.
    pub command_poll_secs: u16,
    /// Redelivery backoff for queued messages (seconds).
    pub queue_backoff_base_secs: u16,
    pub queue_backoff_cap_secs: u16,
    /// Delivery attempts before a queued message is dropped.
    pub queue_max_attempts: u8,

    // --- Maintenance ---
    pub maintenance_restart_enabled: bool,
    /// Daily controlled-restart wall-clock time.
    pub maintenance_restart_hour: u8,
    pub maintenance_restart_minute: u8,
    /// Delay between the restart decision and the actual reset (seconds).
    pub maintenance_grace_secs: u16,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Device identity
            device_id: heapless::String::new(),
            tank_kind: TankKind::SumpTank,

            // Tank geometry (reference sump: 230 × 230 × 250 cm)
            tank_shape: TankShape::Rectangular,
            tank_height_cm: 250.0,
            tank_length_cm: 230.0,
            tank_breadth_cm: 230.0,
            tank_diameter_cm: 0.0,
            sensor_offset_cm: 0.0,

            // Level filter
            samples_per_cycle: 5,
            min_valid_samples: 3,
            min_distance_mm: 200,  // transducer blanking zone
            max_distance_mm: 4500, // sensor max range
            ema_alpha: 0.3,
            ema_alpha_fast: 0.7,
            jump_threshold_mm: 50.0,
            sensor_cycle_secs: 2,

            // Motor safety
            auto_start_percent: 75.0,
            auto_stop_percent: 25.0,
            high_level_percent: 90.0,
            critical_level_percent: 5.0,
            max_runtime_secs: 30 * 60,
            cooldown_secs: 5 * 60,
            max_runtime_faults: 3,

            // WiFi
            wifi_ssid: heapless::String::new(),
            wifi_password: heapless::String::new(),
            link_backoff_base_secs: 2,
            link_backoff_cap_secs: 60,
            stable_dwell_secs: 60,
            connect_timeout_secs: 10,

            // Cloud backend
            backend_host: String::new(),
            backend_port: 443,
            backend_use_tls: true,
            api_key: String::new(),
            hmac_secret: String::new(),
            telemetry_interval_secs: 30,
            heartbeat_interval_secs: 30,
            command_poll_secs: 5,
            queue_backoff_base_secs: 5,
            queue_backoff_cap_secs: 300,
            queue_max_attempts: 8,

            // Maintenance
            maintenance_restart_enabled: true,
            maintenance_restart_hour: 3,
            maintenance_restart_minute: 0,
            maintenance_grace_secs: 5,
        }
    }
}

impl SystemConfig {
    /// Structural validation.  Run after every NVS load and before every
    /// save; a failing config is replaced by defaults rather than trusted.
    pub fn validate(&self) -> core::result::Result<(), &'static str> {
        // NaN compares false against every bound below, so the free-range
        // floats must be pinned down first.
        for v in [
            self.tank_height_cm,
            self.tank_length_cm,
            self.tank_breadth_cm,
            self.tank_diameter_cm,
            self.sensor_offset_cm,
            self.jump_threshold_mm,
        ] {
            if !v.is_finite() {
                return Err("geometry and filter values must be finite");
            }
        }

        if self.tank_height_cm <= 0.0 {
            return Err("tank height must be positive");
        }
        match self.tank_shape {
            TankShape::Rectangular => {
                if self.tank_length_cm <= 0.0 || self.tank_breadth_cm <= 0.0 {
                    return Err("rectangular tank needs length and breadth");
                }
            }
            TankShape::Cylindrical => {
                if self.tank_diameter_cm <= 0.0 {
                    return Err("cylindrical tank needs a diameter");
                }
            }
        }
        if self.sensor_offset_cm < 0.0 {
            return Err("sensor offset cannot be negative");
        }

        if self.samples_per_cycle == 0 || self.samples_per_cycle > 8 {
            return Err("samples per cycle must be 1..=8");
        }
        if self.min_valid_samples == 0 || self.min_valid_samples > self.samples_per_cycle {
            return Err("min valid samples must be 1..=samples per cycle");
        }
        if self.min_distance_mm >= self.max_distance_mm {
            return Err("distance window is empty");
        }
        if !(0.0..=1.0).contains(&self.ema_alpha) || !(0.0..=1.0).contains(&self.ema_alpha_fast) {
            return Err("EMA factors must be within 0..=1");
        }
        if self.ema_alpha_fast < self.ema_alpha {
            return Err("fast EMA factor must be >= the steady factor");
        }
        if self.sensor_cycle_secs == 0 {
            return Err("sensor cycle must be positive");
        }

        for p in [
            self.auto_start_percent,
            self.auto_stop_percent,
            self.high_level_percent,
            self.critical_level_percent,
        ] {
            if !(0.0..=100.0).contains(&p) {
                return Err("level thresholds must be percentages");
            }
        }
        if self.auto_stop_percent >= self.auto_start_percent {
            return Err("auto stop level must be below auto start level");
        }
        if self.auto_start_percent >= self.high_level_percent {
            return Err("auto start level must be below the high guard");
        }
        if self.critical_level_percent >= self.auto_stop_percent {
            return Err("critical level must be below the auto stop level");
        }
        if self.max_runtime_secs == 0 || self.cooldown_secs == 0 {
            return Err("runtime limit and cooldown must be positive");
        }
        if self.max_runtime_faults == 0 {
            return Err("runtime fault limit must be at least 1");
        }

        if self.link_backoff_base_secs == 0
            || self.link_backoff_cap_secs < self.link_backoff_base_secs
        {
            return Err("link backoff base/cap malformed");
        }
        if self.stable_dwell_secs == 0 {
            return Err("stable dwell must be positive");
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect timeout must be positive");
        }

        if self.backend_port == 0 {
            return Err("backend port must be positive");
        }
        if self.telemetry_interval_secs == 0
            || self.heartbeat_interval_secs == 0
            || self.command_poll_secs == 0
        {
            return Err("cloud cadences must be positive");
        }
        if self.queue_backoff_base_secs == 0
            || self.queue_backoff_cap_secs < self.queue_backoff_base_secs
        {
            return Err("queue backoff base/cap malformed");
        }
        if self.queue_max_attempts == 0 {
            return Err("queue max attempts must be at least 1");
        }

        if self.maintenance_restart_hour > 23 || self.maintenance_restart_minute > 59 {
            return Err("maintenance restart time out of range");
        }

        Ok(())
    }

    /// Water surface area in cm², from the configured cross-section.
    pub fn surface_area_cm2(&self) -> f32 {
        match self.tank_shape {
            TankShape::Rectangular => self.tank_length_cm * self.tank_breadth_cm,
            TankShape::Cylindrical => {
                let r = self.tank_diameter_cm / 2.0;
                core::f32::consts::PI * r * r
            }
        }
    }

    /// Tank capacity in litres when full.
    pub fn full_volume_liters(&self) -> f32 {
        self.surface_area_cm2() * self.tank_height_cm / 1000.0
    }
}
