//! Sensor subsystem — raw capabilities and the level filter.
//!
//! [`ultrasonic`] and [`float_switch`] are the thin hardware capabilities
//! (one distance sample, one switch level).  [`filter`] turns raw distance
//! samples into the trusted [`filter::LevelReading`] the rest of the system
//! consumes.  The aggregate [`TankSnapshot`] is rebuilt every control tick
//! and handed to the motor controller by value — components never share
//! mutable sensor state.

pub mod filter;
pub mod float_switch;
pub mod ultrasonic;

use filter::LevelReading;

/// Everything the motor controller needs for one safety evaluation.
///
/// `level` refreshes at the sensor-cycle cadence (≈2 s); `low_water_switch`
/// is re-read every tick so the hard gate always sees the live switch.
#[derive(Debug, Clone, Copy)]
pub struct TankSnapshot {
    pub level: LevelReading,
    /// `true` = water present at the pump intake.
    pub low_water_switch: bool,
}

impl TankSnapshot {
    /// Snapshot used before the first sensor cycle completes: no level
    /// knowledge, switch as read.  Keeps the controller conservative
    /// (0% + Failed health can never satisfy a start gate).
    pub fn empty(low_water_switch: bool) -> Self {
        Self {
            level: LevelReading::unavailable(),
            low_water_switch,
        }
    }
}
