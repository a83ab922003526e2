//! Feedback control primitives for envirocontrol.
//!
//! This crate holds the stateful part of the climate controller: the
//! binary-output feedback law that turns an (actual, target) pair into an
//! on/off decision, and the temperature → water-vapour capacity table the
//! steam decision is based on.
//!
//! # Architecture
//!
//! - Controllers are owned by a single consumer and mutated only by their own
//!   evaluation call
//! - Reconfiguration replaces the controller state wholesale
//! - Outputs are bang-bang: the downstream actuator is a two-state relay

pub mod controller;
pub mod error;
pub mod lookup;

pub use controller::{ControlMode, ControlOutput, FeedbackController};
pub use error::{ControlError, ControlResult};
pub use lookup::CapacityTable;
