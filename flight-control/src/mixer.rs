//! Stabilization law and X-quad motor mixing.
//!
//! Roll and pitch are held level by a proportional term on the measured
//! angle plus the body rate (acting as derivative damping). Altitude uses
//! a cubic response on the clamped altitude error: gentle near the target,
//! firm far from it, bounded by `vertical_p`.
//!
//! ```text
//!      front
//!   FL       FR
//!      \   /
//!       [ ]
//!      /   \
//!   RL       RR
//!      rear
//! ```
//!
//! Outputs are not clamped; actuator limits belong to the hardware side.

use crate::config::ControlConfig;
use crate::controller::ControllerState;
use crate::types::{AngularVelocity, MotorSpeeds, Orientation};

/// Control efforts before mixing, exposed for telemetry and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlEfforts {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    pub vertical: f64,
}

/// Compute the per-axis control efforts.
pub fn compute_efforts(
    orientation: &Orientation,
    angular_velocity: &AngularVelocity,
    altitude: f64,
    state: &ControllerState,
    config: &ControlConfig,
) -> ControlEfforts {
    let disturbances = &state.disturbances;

    let roll = config.roll_p * orientation.roll.clamp(-1.0, 1.0)
        + angular_velocity.roll_velocity
        + disturbances.roll;
    let pitch = config.pitch_p * orientation.pitch.clamp(-1.0, 1.0)
        + angular_velocity.pitch_velocity
        + disturbances.pitch;
    let yaw = disturbances.yaw;

    let altitude_error =
        (state.target_altitude - altitude + config.vertical_offset).clamp(-1.0, 1.0);
    let vertical = config.vertical_p * altitude_error.powi(3);

    ControlEfforts {
        roll,
        pitch,
        yaw,
        vertical,
    }
}

/// Distribute control efforts onto the four rotors.
pub fn mix(efforts: &ControlEfforts, config: &ControlConfig) -> MotorSpeeds {
    let base = config.vertical_thrust + efforts.vertical;
    let ControlEfforts {
        roll, pitch, yaw, ..
    } = *efforts;

    MotorSpeeds {
        fl: base - roll + pitch - yaw,
        fr: base + roll + pitch + yaw,
        rl: base - roll - pitch + yaw,
        rr: base + roll - pitch - yaw,
    }
}

/// Full stabilization step: measurements and controller state in, four
/// motor commands out. Pure and deterministic.
pub fn compute_motor_commands(
    orientation: &Orientation,
    angular_velocity: &AngularVelocity,
    altitude: f64,
    state: &ControllerState,
    config: &ControlConfig,
) -> MotorSpeeds {
    let efforts = compute_efforts(orientation, angular_velocity, altitude, state, config);
    mix(&efforts, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Disturbances;
    use approx::assert_relative_eq;

    fn level() -> (Orientation, AngularVelocity) {
        (Orientation::default(), AngularVelocity::default())
    }

    #[test]
    fn test_level_hover_at_target() {
        let (orientation, rates) = level();
        let config = ControlConfig::default();
        let state = ControllerState {
            target_altitude: 1.6,
            disturbances: Disturbances::default(),
        };

        let speeds = compute_motor_commands(&orientation, &rates, 1.0, &state, &config);

        // error = clamp(1.6 - 1.0 + 0.6) = 1.0, vertical = 3.0
        for speed in speeds.as_array() {
            assert_relative_eq!(speed, 71.5);
        }
    }

    #[test]
    fn test_vertical_effort_is_cubic_and_bounded() {
        let (orientation, rates) = level();
        let config = ControlConfig::default();
        let state = ControllerState {
            target_altitude: 1.0,
            disturbances: Disturbances::default(),
        };

        // error = 1.0 - 1.1 + 0.6 = 0.5
        let efforts = compute_efforts(&orientation, &rates, 1.1, &state, &config);
        assert_relative_eq!(efforts.vertical, 3.0 * 0.125, epsilon = 1e-12);

        // far below target, error saturates at 1
        let efforts = compute_efforts(&orientation, &rates, -50.0, &state, &config);
        assert_relative_eq!(efforts.vertical, 3.0);

        // far above target, error saturates at -1
        let efforts = compute_efforts(&orientation, &rates, 50.0, &state, &config);
        assert_relative_eq!(efforts.vertical, -3.0);
    }

    #[test]
    fn test_roll_tilt_speeds_up_right_side() {
        let orientation = Orientation {
            roll: 0.1,
            pitch: 0.0,
            yaw: 0.0,
        };
        let rates = AngularVelocity::default();
        let config = ControlConfig::default();
        let state = ControllerState {
            target_altitude: 0.4,
            ..Default::default()
        };

        // altitude error is zero so only roll contributes
        let speeds = compute_motor_commands(&orientation, &rates, 1.0, &state, &config);
        assert_relative_eq!(speeds.fr, 73.5, epsilon = 1e-9);
        assert_relative_eq!(speeds.rr, 73.5, epsilon = 1e-9);
        assert_relative_eq!(speeds.fl, 63.5, epsilon = 1e-9);
        assert_relative_eq!(speeds.rl, 63.5, epsilon = 1e-9);
    }

    #[test]
    fn test_attitude_angle_clamped_before_gain() {
        let config = ControlConfig::default();
        let state = ControllerState::default();
        let rates = AngularVelocity::default();

        let steep = Orientation {
            roll: 3.0,
            pitch: -2.0,
            yaw: 0.0,
        };
        let efforts = compute_efforts(&steep, &rates, 1.0, &state, &config);
        assert_relative_eq!(efforts.roll, 50.0);
        assert_relative_eq!(efforts.pitch, -20.0);
    }

    #[test]
    fn test_yaw_disturbance_mixes_diagonally() {
        let (orientation, rates) = level();
        let config = ControlConfig::default();
        let state = ControllerState {
            target_altitude: 0.4,
            disturbances: Disturbances {
                roll: 0.0,
                pitch: 0.0,
                yaw: 1.0,
            },
        };

        let speeds = compute_motor_commands(&orientation, &rates, 1.0, &state, &config);
        assert_relative_eq!(speeds.fl, 67.5);
        assert_relative_eq!(speeds.rr, 67.5);
        assert_relative_eq!(speeds.fr, 69.5);
        assert_relative_eq!(speeds.rl, 69.5);
    }

    #[test]
    fn test_repeatable() {
        let orientation = Orientation {
            roll: 0.03,
            pitch: -0.02,
            yaw: 1.2,
        };
        let rates = AngularVelocity {
            roll_velocity: 0.4,
            pitch_velocity: -0.1,
        };
        let config = ControlConfig::default();
        let state = ControllerState {
            target_altitude: 3.2,
            disturbances: Disturbances {
                roll: 0.3,
                pitch: -0.7,
                yaw: 0.2,
            },
        };

        let first = compute_motor_commands(&orientation, &rates, 2.7, &state, &config);
        for _ in 0..100 {
            let again = compute_motor_commands(&orientation, &rates, 2.7, &state, &config);
            assert_eq!(first, again);
        }
    }
}
