//! Assembly of the outbound sensor-data message.

use flight_control::{AuxiliarySensors, FlightMode, Orientation, Position};
use flight_protocol::{Gps, MotorTemperatures, SensorData, TelemetryBlock, Temperatures};

use crate::camera_pipeline::{round_to, EncodedFrame};

/// Everything the control loop knows about one tick, by reference.
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySnapshot<'a> {
    pub timestamp: f64,
    pub orientation: &'a Orientation,
    pub position: &'a Position,
    pub target_altitude: f64,
    pub mode: FlightMode,
    pub auxiliary: &'a AuxiliarySensors,
}

impl TelemetrySnapshot<'_> {
    pub fn telemetry_block(&self) -> TelemetryBlock {
        let aux = self.auxiliary;
        let motors = &aux.motor_temperatures;
        TelemetryBlock {
            altitude: round_to(self.position.z, 2),
            target: round_to(self.target_altitude, 2),
            roll: round_to(self.orientation.roll, 2),
            pitch: round_to(self.orientation.pitch, 2),
            yaw: round_to(self.orientation.yaw, 2),
            gps: Gps {
                lat: round_to(self.position.x, 6),
                lon: round_to(self.position.y, 6),
                alt: round_to(self.position.z, 2),
            },
            battery: round_to(aux.battery, 1),
            signal_strength: aux.signal_strength,
            temperatures: Temperatures {
                body: round_to(aux.body_temperature, 1),
                motors: MotorTemperatures {
                    fl: round_to(motors.fl, 1),
                    fr: round_to(motors.fr, 1),
                    rl: round_to(motors.rl, 1),
                    rr: round_to(motors.rr, 1),
                },
            },
            wind_speed: round_to(aux.wind_speed, 1),
            flight_mode: self.mode.label().to_string(),
        }
    }

    /// Full message pairing this snapshot with an encoded frame.
    pub fn sensor_data(&self, frame: &EncodedFrame) -> SensorData {
        SensorData {
            timestamp: self.timestamp,
            camera: frame.camera_block(),
            telemetry: self.telemetry_block(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rounding_and_labels() {
        let orientation = Orientation {
            roll: 0.123_456,
            pitch: -0.019,
            yaw: 3.141_59,
        };
        let position = Position::new(12.345_678_9, -0.000_000_4, 1.996);
        let auxiliary = AuxiliarySensors {
            battery: 87.654,
            wind_speed: 6.06,
            ..Default::default()
        };
        let snapshot = TelemetrySnapshot {
            timestamp: 4.2,
            orientation: &orientation,
            position: &position,
            target_altitude: 2.0,
            mode: FlightMode::ReturnToHome,
            auxiliary: &auxiliary,
        };

        let block = snapshot.telemetry_block();
        assert_relative_eq!(block.altitude, 2.0);
        assert_relative_eq!(block.roll, 0.12);
        assert_relative_eq!(block.pitch, -0.02);
        assert_relative_eq!(block.yaw, 3.14);
        assert_relative_eq!(block.gps.lat, 12.345_679);
        assert_eq!(block.gps.lon, 0.0);
        assert_relative_eq!(block.battery, 87.7);
        assert_relative_eq!(block.wind_speed, 6.1);
        assert_eq!(block.signal_strength, 100);
        assert_eq!(block.flight_mode, "return_to_home");
    }
}
