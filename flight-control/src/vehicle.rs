//! Seams between the control core and the airframe.
//!
//! A simulator, a hardware driver, or a test double implements both traits;
//! the control loop only ever talks to the vehicle through them.

use crate::types::{AngularVelocity, MotorSpeeds, Orientation, Position};

/// Raw camera frame as delivered by the vehicle: tightly packed BGRA rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RawFrame {
    /// Byte length a BGRA frame of these dimensions must have.
    pub fn expected_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }

    pub fn is_well_formed(&self) -> bool {
        self.data.len() == Self::expected_len(self.width, self.height)
    }
}

/// Read side of the vehicle, sampled once per control tick.
pub trait VehicleSensors {
    fn orientation(&self) -> Orientation;

    fn angular_velocity(&self) -> AngularVelocity;

    /// Position fix; components may be NaN before the first fix.
    fn position(&self) -> Position;

    /// Latest frame from the active camera, if one is available.
    fn camera_frame(&self) -> Option<RawFrame>;
}

/// Write side of the vehicle.
pub trait MotorActuators {
    /// Apply motor velocities, returning what was actually applied.
    fn apply_motor_speeds(&mut self, speeds: MotorSpeeds) -> MotorSpeeds;

    /// Point the camera gimbal. Vehicles without a gimbal ignore this.
    fn set_camera_gimbal(&mut self, _pitch: f64, _yaw: f64) {}
}
