//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one slice of the device
//! loop against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware or network required.

mod command_flow_tests;
mod link_flow_tests;
mod maintenance_flow_tests;
mod mock_hw;
mod motor_flow_tests;
mod telemetry_flow_tests;
