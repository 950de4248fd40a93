//! Hand-off of remote input from network tasks to the control loop.
//!
//! Pilot commands are continuous values: only the newest matters, so they go
//! through a single slot that each new command overwrites. Mode, camera and
//! gimbal requests are discrete state changes: every one is delivered, in
//! arrival order, through an unbounded channel. Neither side ever blocks.

use std::sync::{mpsc, Arc, Mutex, PoisonError};

use flight_control::{FlightMode, PilotCommand};
use flight_protocol::{CameraId, ClientMessage};
use tracing::{debug, warn};

use crate::error::LinkError;

/// Discrete request delivered to the control loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeEvent {
    ModeChange(FlightMode),
    CameraSwitch(CameraId),
    Gimbal { pitch: f64, yaw: f64 },
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngressOutcome {
    /// Pilot command stored; `displaced` is true if an unconsumed one was dropped
    CommandStored { displaced: bool },
    /// Event queued for the control loop
    EventQueued,
    /// Message kind not understood; dropped silently
    Ignored,
}

type CommandSlot = Arc<Mutex<Option<PilotCommand>>>;

/// Network-facing half. Cheap to clone, one per connection.
#[derive(Debug, Clone)]
pub struct CommandBridge {
    slot: CommandSlot,
    events: mpsc::Sender<BridgeEvent>,
}

/// Control-loop half.
#[derive(Debug)]
pub struct CommandReceiver {
    slot: CommandSlot,
    events: mpsc::Receiver<BridgeEvent>,
}

/// Create a connected bridge pair.
pub fn command_bridge() -> (CommandBridge, CommandReceiver) {
    let slot: CommandSlot = Arc::new(Mutex::new(None));
    let (tx, rx) = mpsc::channel();
    (
        CommandBridge {
            slot: slot.clone(),
            events: tx,
        },
        CommandReceiver { slot, events: rx },
    )
}

impl CommandBridge {
    /// Store a pilot command, replacing any command not yet consumed.
    ///
    /// Returns true if an older command was displaced.
    pub fn submit_command(&self, command: PilotCommand) -> bool {
        let previous = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(command);
        previous.is_some()
    }

    /// Queue a discrete event for the control loop.
    pub fn send_event(&self, event: BridgeEvent) -> Result<(), LinkError> {
        self.events.send(event).map_err(|_| LinkError::LoopStopped)
    }

    /// Parse one text frame from a client and route it.
    ///
    /// Malformed input is logged and returned as [`LinkError::Malformed`];
    /// requests naming an unknown mode or camera come back as rejections
    /// so the caller can answer the client that sent them. Nothing here
    /// affects other messages.
    pub fn ingest(&self, text: &str) -> Result<IngressOutcome, LinkError> {
        let message = serde_json::from_str::<ClientMessage>(text).map_err(|e| {
            warn!("Dropping malformed client message: {e}");
            LinkError::Malformed(e)
        })?;

        match message {
            ClientMessage::MotorCommand(cmd) => {
                let displaced = self.submit_command(PilotCommand::new(
                    cmd.vertical,
                    cmd.roll,
                    cmd.pitch,
                    cmd.yaw,
                ));
                Ok(IngressOutcome::CommandStored { displaced })
            }
            ClientMessage::FlightMode(request) => {
                let mode = request.mode.parse::<FlightMode>().map_err(|e| {
                    warn!("Rejected flight mode request: {e}");
                    LinkError::Rejected {
                        command: "flight_mode".to_string(),
                        reason: e.to_string(),
                    }
                })?;
                self.send_event(BridgeEvent::ModeChange(mode))?;
                Ok(IngressOutcome::EventQueued)
            }
            ClientMessage::CameraSwitch(request) => {
                let camera = request.camera.parse::<CameraId>().map_err(|e| {
                    warn!("Rejected camera switch: {e}");
                    LinkError::InvalidCamera(e.0)
                })?;
                self.send_event(BridgeEvent::CameraSwitch(camera))?;
                Ok(IngressOutcome::EventQueued)
            }
            ClientMessage::CameraGimbal(request) => {
                let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(-1.0, 1.0) };
                self.send_event(BridgeEvent::Gimbal {
                    pitch: clamp(request.pitch),
                    yaw: clamp(request.yaw),
                })?;
                Ok(IngressOutcome::EventQueued)
            }
            ClientMessage::Unknown => {
                debug!("Ignoring unknown client message kind");
                Ok(IngressOutcome::Ignored)
            }
        }
    }
}

impl CommandReceiver {
    /// Take the pending pilot command, leaving the slot empty.
    pub fn try_take_command(&self) -> Option<PilotCommand> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Drop any pending pilot command without applying it.
    pub fn discard_command(&self) {
        self.try_take_command();
    }

    /// Every event queued since the last drain, oldest first.
    pub fn drain_events(&self) -> Vec<BridgeEvent> {
        self.events.try_iter().collect()
    }
}
