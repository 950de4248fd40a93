use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FlightError;

/// Vehicle operating modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightMode {
    /// On the ground, motors stopped, pilot input ignored
    Idle,
    /// Pilot sticks drive altitude target and attitude disturbances
    Manual,
    /// Climb to the takeoff altitude, then hand over to Manual
    Takeoff,
    /// Staged descent until touchdown, then Idle
    Land,
    /// Hold the altitude sampled on entry
    Hover,
    /// Fly back over the recorded home position, then Land
    ReturnToHome,
    /// Kill disturbances and force a Land descent
    EmergencyStop,
}

impl FlightMode {
    pub const ALL: [FlightMode; 7] = [
        FlightMode::Idle,
        FlightMode::Manual,
        FlightMode::Takeoff,
        FlightMode::Land,
        FlightMode::Hover,
        FlightMode::ReturnToHome,
        FlightMode::EmergencyStop,
    ];

    /// Wire label for this mode.
    pub fn label(&self) -> &'static str {
        match self {
            FlightMode::Idle => "idle",
            FlightMode::Manual => "manual",
            FlightMode::Takeoff => "takeoff",
            FlightMode::Land => "land",
            FlightMode::Hover => "hover",
            FlightMode::ReturnToHome => "return_to_home",
            FlightMode::EmergencyStop => "emergency_stop",
        }
    }

    /// Modes in which the state machine, not the pilot, drives intent.
    pub fn is_auto(&self) -> bool {
        !matches!(self, FlightMode::Idle | FlightMode::Manual)
    }
}

impl fmt::Display for FlightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FlightMode {
    type Err = FlightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "idle" => Ok(FlightMode::Idle),
            "manual" => Ok(FlightMode::Manual),
            "takeoff" => Ok(FlightMode::Takeoff),
            "land" => Ok(FlightMode::Land),
            "hover" => Ok(FlightMode::Hover),
            "return_to_home" | "rth" => Ok(FlightMode::ReturnToHome),
            "emergency_stop" | "emergency" => Ok(FlightMode::EmergencyStop),
            _ => Err(FlightError::InvalidMode(s.to_string())),
        }
    }
}
