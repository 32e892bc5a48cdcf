//! Hardware drivers — dumb actuators and raw pin access.
//!
//! Policy lives in the application core; nothing in this layer decides
//! when the motor may run.

pub mod hw_init;
pub mod indicators;
pub mod panel;
pub mod relay;
pub mod watchdog;
