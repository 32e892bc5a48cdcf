//! Application core — pure domain logic, zero I/O.
//!
//! Everything that decides (filtering, motor safety, connectivity policy,
//! queueing, command handling, maintenance) lives behind the port traits in
//! [`ports`], so the whole core runs and is tested on the host without any
//! ESP-IDF headers.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
