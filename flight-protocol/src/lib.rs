//! Wire types exchanged between the flight server and remote clients.
//!
//! Every message is a JSON object whose `type` field names the kind, with the
//! remaining fields inline, e.g. `{"type": "flight_mode", "mode": "hover"}`.
//! This crate has no runtime dependencies beyond serde so a browser or CLI
//! client can share it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Client-to-server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Pilot stick positions, each nominally in [-1, 1]
    MotorCommand(MotorCommand),
    /// Request a flight mode by name
    FlightMode(FlightModeRequest),
    /// Select the active camera by name
    CameraSwitch(CameraSwitchRequest),
    /// Point the camera gimbal
    CameraGimbal(CameraGimbalRequest),
    /// Any kind this server does not understand
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Wire name of this message kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::MotorCommand(_) => "motor_command",
            ClientMessage::FlightMode(_) => "flight_mode",
            ClientMessage::CameraSwitch(_) => "camera_switch",
            ClientMessage::CameraGimbal(_) => "camera_gimbal",
            ClientMessage::Unknown => "unknown",
        }
    }
}

/// Stick positions. Missing axes read as centred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorCommand {
    pub vertical: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightModeRequest {
    pub mode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSwitchRequest {
    pub camera: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraGimbalRequest {
    pub pitch: f64,
    pub yaw: f64,
}

/// Server-to-client message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Periodic camera frame plus telemetry snapshot, sent to every observer
    SensorData(SensorData),
    /// Rejection of a request, sent only to the client that made it
    CommandError(CommandError),
}

/// Error from a client request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandError {
    /// Which message kind failed (`flight_mode`, `camera_switch`, ...)
    pub command: String,
    /// Human-readable error message
    pub message: String,
}

/// One published frame: camera image plus telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorData {
    /// Simulated time in seconds
    pub timestamp: f64,
    pub camera: CameraBlock,
    pub telemetry: TelemetryBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraBlock {
    pub width: u32,
    pub height: u32,
    /// Base64-encoded JPEG
    pub data: String,
    pub active: CameraId,
    /// `"WIDTHxHEIGHT"`
    pub resolution: String,
    /// Observed encode rate
    pub fps: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryBlock {
    pub altitude: f64,
    pub target: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub gps: Gps,
    pub battery: f64,
    pub signal_strength: u8,
    pub temperatures: Temperatures,
    pub wind_speed: f64,
    pub flight_mode: String,
}

/// Local position reported under GNSS-style names.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperatures {
    pub body: f64,
    pub motors: MotorTemperatures,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorTemperatures {
    pub fl: f64,
    pub fr: f64,
    pub rl: f64,
    pub rr: f64,
}

/// Camera selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraId {
    /// Forward-looking view
    #[default]
    Primary,
    /// Downward view
    Secondary,
}

impl CameraId {
    pub fn label(&self) -> &'static str {
        match self {
            CameraId::Primary => "primary",
            CameraId::Secondary => "secondary",
        }
    }
}

impl fmt::Display for CameraId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Name that matched no known camera.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCamera(pub String);

impl fmt::Display for UnknownCamera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown camera {:?} (expected primary or secondary)", self.0)
    }
}

impl std::error::Error for UnknownCamera {}

impl FromStr for CameraId {
    type Err = UnknownCamera;

    /// Accepts the canonical names and the legacy `front` / `bottom`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" | "front" => Ok(CameraId::Primary),
            "secondary" | "bottom" => Ok(CameraId::Secondary),
            _ => Err(UnknownCamera(s.to_string())),
        }
    }
}
