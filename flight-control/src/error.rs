use thiserror::Error;

/// Errors produced by the flight-control core.
#[derive(Error, Debug)]
pub enum FlightError {
    /// Mode name is not one of the known flight modes.
    #[error("unknown flight mode: {0:?}")]
    InvalidMode(String),

    /// Tuning constants failed validation.
    #[error("invalid control configuration: {0}")]
    InvalidConfig(String),

    /// Gains file could not be read.
    #[error("failed to read gains file: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Gains file is not valid JSON for `ControlConfig`.
    #[error("failed to parse gains file: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
