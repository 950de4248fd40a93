//! Point-mass quadrotor used in place of hardware.
//!
//! Implements both vehicle traits so the control loop, the server binary and
//! the integration tests can fly without an airframe attached. Each call to
//! [`MotorActuators::apply_motor_speeds`] advances the model by one fixed
//! step using semi-implicit Euler.

use crate::types::{AngularVelocity, MotorSpeeds, Orientation, Position};
use crate::vehicle::{MotorActuators, RawFrame, VehicleSensors};

/// Gravitational acceleration in m/s^2
pub const GRAVITY: f64 = 9.81;

/// Motor speed at which thrust balances gravity.
///
/// Matches the mixer's base thrust at zero altitude error (68.5 + 3 * 0.6^3)
/// so the default tuning holds the vehicle level at its target.
pub const HOVER_MOTOR_SPEED: f64 = 69.148;

/// Default integration step, equal to the default control period
pub const DEFAULT_STEP_SECONDS: f64 = 0.008;

const ROLL_TORQUE: f64 = 0.05;
const PITCH_TORQUE: f64 = 0.1;
const YAW_TORQUE: f64 = 0.05;
const ANGULAR_DAMPING: f64 = 4.0;
const VERTICAL_DRAG: f64 = 1.5;
const HORIZONTAL_DRAG: f64 = 0.8;

const SKY_BGRA: [u8; 4] = [235, 206, 135, 255];
const GROUND_BGRA: [u8; 4] = [34, 110, 60, 255];

#[derive(Debug, Clone)]
pub struct SimulatedQuadrotor {
    step_seconds: f64,
    position: Position,
    velocity: [f64; 3],
    orientation: Orientation,
    rates: [f64; 3],
    steps: u64,
    frame_width: u32,
    frame_height: u32,
    gimbal: (f64, f64),
}

impl Default for SimulatedQuadrotor {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_SECONDS)
    }
}

impl SimulatedQuadrotor {
    /// Vehicle at rest on the ground at the origin.
    pub fn new(step_seconds: f64) -> Self {
        Self {
            step_seconds,
            position: Position::default(),
            velocity: [0.0; 3],
            orientation: Orientation::default(),
            rates: [0.0; 3],
            steps: 0,
            frame_width: 400,
            frame_height: 240,
            gimbal: (0.0, 0.0),
        }
    }

    /// Place the vehicle, at rest, at `position`.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Position {
            z: position.z.max(0.0),
            ..position
        };
        self
    }

    pub fn with_camera_size(mut self, width: u32, height: u32) -> Self {
        self.frame_width = width;
        self.frame_height = height;
        self
    }

    /// Number of integration steps taken so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Ground-truth position, available even before the first fix.
    pub fn true_position(&self) -> Position {
        self.position
    }

    pub fn vertical_velocity(&self) -> f64 {
        self.velocity[2]
    }

    pub fn gimbal(&self) -> (f64, f64) {
        self.gimbal
    }

    pub fn on_ground(&self) -> bool {
        self.position.z <= 0.0
    }

    fn step(&mut self, m: &MotorSpeeds) {
        let dt = self.step_seconds;

        let roll_accel = -ROLL_TORQUE * ((m.fr + m.rr) - (m.fl + m.rl)) - ANGULAR_DAMPING * self.rates[0];
        let pitch_accel = -PITCH_TORQUE * ((m.fl + m.fr) - (m.rl + m.rr)) - ANGULAR_DAMPING * self.rates[1];
        let yaw_accel = YAW_TORQUE * ((m.fr + m.rl) - (m.fl + m.rr)) - ANGULAR_DAMPING * self.rates[2];

        self.rates[0] += roll_accel * dt;
        self.rates[1] += pitch_accel * dt;
        self.rates[2] += yaw_accel * dt;
        self.orientation.roll += self.rates[0] * dt;
        self.orientation.pitch += self.rates[1] * dt;
        self.orientation.yaw = wrap_angle(self.orientation.yaw + self.rates[2] * dt);

        let thrust_ratio = m.average_abs() / HOVER_MOTOR_SPEED;
        let tilt = self.orientation.roll.cos() * self.orientation.pitch.cos();
        let az = GRAVITY * (thrust_ratio * thrust_ratio * tilt - 1.0) - VERTICAL_DRAG * self.velocity[2];
        let ax = GRAVITY * self.orientation.pitch.sin() - HORIZONTAL_DRAG * self.velocity[0];
        let ay = GRAVITY * self.orientation.roll.sin() - HORIZONTAL_DRAG * self.velocity[1];

        self.velocity[0] += ax * dt;
        self.velocity[1] += ay * dt;
        self.velocity[2] += az * dt;
        self.position.x += self.velocity[0] * dt;
        self.position.y += self.velocity[1] * dt;
        self.position.z += self.velocity[2] * dt;

        if self.position.z <= 0.0 {
            self.position.z = 0.0;
            self.velocity = [0.0; 3];
        }

        self.steps += 1;
    }

    /// Synthetic forward view: sky over ground, horizon tilted by roll and
    /// shifted by pitch plus gimbal pitch.
    fn render_horizon(&self) -> RawFrame {
        let (width, height) = (self.frame_width, self.frame_height);
        let slope = self.orientation.roll.tan();
        let centre_row = height as f64 * (0.5 + self.orientation.pitch + self.gimbal.0 * 0.5);
        let half_width = width as f64 / 2.0;

        let mut data = Vec::with_capacity(RawFrame::expected_len(width, height));
        for row in 0..height {
            for col in 0..width {
                let horizon = centre_row + (col as f64 - half_width) * slope;
                let pixel = if (row as f64) < horizon {
                    SKY_BGRA
                } else {
                    GROUND_BGRA
                };
                data.extend_from_slice(&pixel);
            }
        }

        RawFrame {
            width,
            height,
            data,
        }
    }
}

fn wrap_angle(angle: f64) -> f64 {
    use std::f64::consts::PI;
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

impl VehicleSensors for SimulatedQuadrotor {
    fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn angular_velocity(&self) -> AngularVelocity {
        AngularVelocity {
            roll_velocity: self.rates[0],
            pitch_velocity: self.rates[1],
        }
    }

    fn position(&self) -> Position {
        if self.steps == 0 {
            Position::new(f64::NAN, f64::NAN, f64::NAN)
        } else {
            self.position
        }
    }

    fn camera_frame(&self) -> Option<RawFrame> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return None;
        }
        Some(self.render_horizon())
    }
}

impl MotorActuators for SimulatedQuadrotor {
    fn apply_motor_speeds(&mut self, speeds: MotorSpeeds) -> MotorSpeeds {
        self.step(&speeds);
        speeds
    }

    fn set_camera_gimbal(&mut self, pitch: f64, yaw: f64) {
        self.gimbal = (pitch.clamp(-1.0, 1.0), yaw.clamp(-1.0, 1.0));
    }
}
