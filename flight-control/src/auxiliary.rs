//! Simulated housekeeping readings: battery, link quality, temperatures, wind.
//!
//! These are not measured by the airframe; they are synthesized from the
//! applied motor load so the ground station has something plausible to show.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{MotorSpeeds, Position};

const AMBIENT_TEMPERATURE: f64 = 25.0;

/// Per-motor temperatures in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorTemperatures {
    pub fl: f64,
    pub fr: f64,
    pub rl: f64,
    pub rr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuxiliarySensors {
    /// Remaining charge in percent, never negative
    pub battery: f64,
    /// Link quality 0..=100
    pub signal_strength: u8,
    pub body_temperature: f64,
    pub motor_temperatures: MotorTemperatures,
    /// Wind speed in m/s
    pub wind_speed: f64,
}

impl Default for AuxiliarySensors {
    fn default() -> Self {
        Self {
            battery: 100.0,
            signal_strength: 100,
            body_temperature: AMBIENT_TEMPERATURE,
            motor_temperatures: MotorTemperatures {
                fl: AMBIENT_TEMPERATURE,
                fr: AMBIENT_TEMPERATURE,
                rl: AMBIENT_TEMPERATURE,
                rr: AMBIENT_TEMPERATURE,
            },
            wind_speed: 0.0,
        }
    }
}

impl AuxiliarySensors {
    /// Advance the readings by one tick of `dt_seconds` under the given load.
    pub fn update<R: Rng>(
        &mut self,
        applied: &MotorSpeeds,
        position: &Position,
        dt_seconds: f64,
        rng: &mut R,
    ) {
        let load = applied.average_abs();

        let drain_rate = 0.01 + load / 100.0 * 0.02;
        self.battery = (self.battery - drain_rate * dt_seconds).max(0.0);

        // f64::max discards NaN, so a missing fix reads as the 20% floor
        let base_signal = (100.0 - 2.0 * position.horizontal_range()).max(20.0);
        let signal = base_signal + rng.gen_range(-5.0_f64..=5.0);
        self.signal_strength = signal.clamp(0.0, 100.0) as u8;

        let motor_heat = load / 100.0 * 40.0;
        self.body_temperature =
            AMBIENT_TEMPERATURE + motor_heat * 0.5 + rng.gen_range(-1.0_f64..=1.0);
        let mut motor = || AMBIENT_TEMPERATURE + motor_heat + rng.gen_range(-2.0_f64..=2.0);
        self.motor_temperatures = MotorTemperatures {
            fl: motor(),
            fr: motor(),
            rl: motor(),
            rr: motor(),
        };

        self.wind_speed = (5.0 + rng.gen_range(-3.0_f64..=8.0)).max(0.0);
    }
}
