use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::FlightError;

/// Tuning constants for the stabilization law.
///
/// Fixed at startup and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Base motor speed that roughly balances gravity
    pub vertical_thrust: f64,
    /// Offset added to the altitude error before clamping
    pub vertical_offset: f64,
    /// Proportional gain on the cubed altitude error
    pub vertical_p: f64,
    /// Proportional gain on roll angle
    pub roll_p: f64,
    /// Proportional gain on pitch angle
    pub pitch_p: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            vertical_thrust: 68.5,
            vertical_offset: 0.6,
            vertical_p: 3.0,
            roll_p: 50.0,
            pitch_p: 20.0,
        }
    }
}

impl ControlConfig {
    /// Reject gains the mixer cannot use.
    pub fn validate(&self) -> Result<(), FlightError> {
        let gains = [
            ("vertical_thrust", self.vertical_thrust),
            ("vertical_offset", self.vertical_offset),
            ("vertical_p", self.vertical_p),
            ("roll_p", self.roll_p),
            ("pitch_p", self.pitch_p),
        ];
        for (name, value) in gains {
            if !value.is_finite() {
                return Err(FlightError::InvalidConfig(format!(
                    "{name} must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Load and validate gains from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, FlightError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_gains_are_valid() {
        assert!(ControlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_nan_gain_rejected() {
        let config = ControlConfig {
            roll_p: f64::NAN,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("roll_p"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"vertical_thrust":70.0,"vertical_offset":0.5,"vertical_p":2.0,"roll_p":40.0,"pitch_p":25.0}}"#
        )
        .unwrap();

        let config = ControlConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.vertical_thrust, 70.0);
        assert_eq!(config.pitch_p, 25.0);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"vertical_thrust\": \"fast\"}}").unwrap();

        let result = ControlConfig::load_from_file(file.path());
        assert!(matches!(result, Err(FlightError::ConfigParse(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ControlConfig::load_from_file(Path::new("/nonexistent/gains.json"));
        assert!(matches!(result, Err(FlightError::ConfigIo(_))));
    }
}
