//! Altitude target and per-axis disturbance state consumed by the mixer.

use serde::{Deserialize, Serialize};

use crate::types::PilotCommand;

/// Lower bound for pilot-adjusted target altitude (meters)
pub const MIN_TARGET_ALTITUDE: f64 = 0.5;
/// Upper bound for pilot-adjusted target altitude (meters)
pub const MAX_TARGET_ALTITUDE: f64 = 15.0;
/// Target change per tick while the vertical stick is deflected (meters)
pub const TARGET_ALTITUDE_STEP: f64 = 0.02;
/// Vertical stick deflection below which the target is left alone
pub const VERTICAL_DEADBAND: f64 = 0.1;

/// Stick-to-disturbance gains. Negative so that a positive stick
/// deflection tilts the vehicle in the commanded direction.
pub const ROLL_COMMAND_GAIN: f64 = -0.8;
pub const PITCH_COMMAND_GAIN: f64 = -1.2;
pub const YAW_COMMAND_GAIN: f64 = -1.3;

/// Transient roll/pitch/yaw biases added to the stabilization law.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Disturbances {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Disturbances {
    pub fn is_zero(&self) -> bool {
        self.roll == 0.0 && self.pitch == 0.0 && self.yaw == 0.0
    }
}

/// Mutable controller state, owned by the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub target_altitude: f64,
    pub disturbances: Disturbances,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            target_altitude: 1.0,
            disturbances: Disturbances::default(),
        }
    }
}

impl ControllerState {
    /// Set the target directly. Used by the auto modes, which own their
    /// own bounds.
    pub fn set_target_altitude(&mut self, altitude: f64) {
        self.target_altitude = altitude;
    }

    /// Nudge the target by one step in the direction of the vertical stick,
    /// then clamp to the pilot range.
    pub fn adjust_target_altitude(&mut self, vertical: f64) {
        if vertical > VERTICAL_DEADBAND {
            self.target_altitude += TARGET_ALTITUDE_STEP;
        } else if vertical < -VERTICAL_DEADBAND {
            self.target_altitude -= TARGET_ALTITUDE_STEP;
        }
        self.target_altitude = self
            .target_altitude
            .clamp(MIN_TARGET_ALTITUDE, MAX_TARGET_ALTITUDE);
    }

    /// Replace the disturbances with scaled stick deflections.
    pub fn set_disturbances_from_sticks(&mut self, roll: f64, pitch: f64, yaw: f64) {
        self.disturbances = Disturbances {
            roll: roll * ROLL_COMMAND_GAIN,
            pitch: pitch * PITCH_COMMAND_GAIN,
            yaw: yaw * YAW_COMMAND_GAIN,
        };
    }

    /// Apply one pilot command: altitude nudge plus attitude disturbances.
    pub fn apply_pilot_command(&mut self, command: &PilotCommand) {
        self.adjust_target_altitude(command.vertical);
        self.set_disturbances_from_sticks(command.roll, command.pitch, command.yaw);
    }

    /// Scale every disturbance by `factor`, pulling it toward zero.
    pub fn decay_disturbances(&mut self, factor: f64) {
        self.disturbances.roll *= factor;
        self.disturbances.pitch *= factor;
        self.disturbances.yaw *= factor;
    }

    pub fn clear_disturbances(&mut self) {
        self.disturbances = Disturbances::default();
    }
}
