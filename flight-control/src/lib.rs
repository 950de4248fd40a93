//! Flight control core for an X-configuration quadrotor.
//!
//! Converts attitude and position measurements plus pilot intent into four
//! motor speeds. The pieces, leaf first:
//!
//! - [`mixer`]: stabilization law and X-quad motor mixing
//! - [`controller`]: altitude target and per-axis disturbances
//! - [`modes`]: flight mode state machine driving the controller each tick
//! - [`vehicle`]: traits the airframe (real or simulated) implements
//! - [`auxiliary`]: synthesized housekeeping readings for telemetry
//! - [`mock`]: point-mass quadrotor for running without hardware
//!
//! Nothing here is async or touches the network.

pub mod auxiliary;
pub mod config;
pub mod controller;
pub mod error;
pub mod mixer;
pub mod mock;
pub mod modes;
pub mod state;
pub mod types;
pub mod vehicle;

// Re-export commonly used types for external use
pub use crate::auxiliary::AuxiliarySensors;
pub use crate::config::ControlConfig;
pub use crate::controller::{ControllerState, Disturbances};
pub use crate::error::FlightError;
pub use crate::mixer::compute_motor_commands;
pub use crate::modes::FlightModeManager;
pub use crate::state::FlightMode;
pub use crate::types::{AngularVelocity, MotorSpeeds, Orientation, PilotCommand, Position};
pub use crate::vehicle::{MotorActuators, RawFrame, VehicleSensors};
