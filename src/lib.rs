//! AquaGuard firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; host builds get the
//! simulation backends instead.

#![deny(unused_must_use)]

pub mod app;
pub mod cloud;
pub mod config;
pub mod conn;
pub mod diagnostics;
pub mod error;
pub mod maintenance;
pub mod motor;

mod pins;

// The adapter ring compiles on both targets; the peripheral-facing
// implementations are guarded by cfg attributes inside.
pub mod adapters;
pub mod drivers;
pub mod sensors;
