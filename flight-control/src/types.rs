//! Per-tick measurement snapshots and command records.
//!
//! Angles are radians, positions meters, z is altitude above ground.

use serde::{Deserialize, Serialize};

/// Vehicle attitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// Body rates about the roll and pitch axes in rad/s.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AngularVelocity {
    pub roll_velocity: f64,
    pub pitch_velocity: f64,
}

/// Position in the world frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// A position fix is usable once every axis is finite.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Distance in the x/y plane, ignoring altitude.
    pub fn horizontal_distance(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Distance of the x/y projection from the world origin.
    pub fn horizontal_range(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// Four motor velocity commands in X-quad order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotorSpeeds {
    /// Front left
    pub fl: f64,
    /// Front right
    pub fr: f64,
    /// Rear left
    pub rl: f64,
    /// Rear right
    pub rr: f64,
}

impl MotorSpeeds {
    pub fn new(fl: f64, fr: f64, rl: f64, rr: f64) -> Self {
        Self { fl, fr, rl, rr }
    }

    /// All motors stopped.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.fl, self.fr, self.rl, self.rr]
    }

    /// Mean of the absolute motor speeds, used to derive load-dependent readings.
    pub fn average_abs(&self) -> f64 {
        self.as_array().iter().map(|s| s.abs()).sum::<f64>() / 4.0
    }
}

/// Pilot stick input, each axis in [-1.0, 1.0].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PilotCommand {
    pub vertical: f64,
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl PilotCommand {
    /// Build a command, clamping every axis to the stick range.
    ///
    /// NaN inputs are treated as centered sticks.
    pub fn new(vertical: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self {
            vertical: clamp_axis(vertical),
            roll: clamp_axis(roll),
            pitch: clamp_axis(pitch),
            yaw: clamp_axis(yaw),
        }
    }
}

fn clamp_axis(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}
