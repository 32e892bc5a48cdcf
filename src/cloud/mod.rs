//! Cloud plane: message shapes, request signing, the store-and-forward
//! queue and the command intake.
//!
//! Everything here is transport-agnostic — actual HTTP lives behind
//! [`CloudPort`](crate::app::ports::CloudPort) so the whole plane runs
//! unmodified against the simulated backend in host tests.

pub mod auth;
pub mod intake;
pub mod messages;
pub mod queue;
