//! Ground link for the flight controller.
//!
//! Connects the synchronous control core to remote ground stations:
//!
//! - [`command_bridge`]: pilot commands and requests from network tasks to the loop
//! - [`publisher`]: latest sensor-data message fanned out to observers
//! - [`camera_pipeline`]: raw frames to base64 JPEG
//! - [`control_loop`]: the fixed-rate driver tying it all together
//! - [`server`]: the `/ws` WebSocket endpoint
//!
//! The control loop runs on its own OS thread and never awaits; everything
//! network-facing runs on tokio.

pub mod camera_pipeline;
pub mod command_bridge;
pub mod config;
pub mod control_loop;
pub mod error;
pub mod publisher;
pub mod server;
pub mod telemetry;

pub use crate::command_bridge::{command_bridge, BridgeEvent, CommandBridge, CommandReceiver};
pub use crate::config::{GainArgs, ServerArgs};
pub use crate::control_loop::{ControlLoop, LoopSettings, TickReport};
pub use crate::error::LinkError;
pub use crate::publisher::TelemetryPublisher;
pub use crate::server::{create_router, AppState};
