//! Command-line configuration for the flight server.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use flight_control::{ControlConfig, FlightError};

use crate::control_loop::LoopSettings;

/// Control gains. Defaults are the stock tuning.
#[derive(Args, Debug, Clone)]
pub struct GainArgs {
    #[arg(
        long,
        default_value = "68.5",
        help = "Base motor speed",
        long_help = "Motor speed commanded to all four rotors before any correction. Together \
            with --vertical-offset and --vertical-p it sets the hover equilibrium."
    )]
    pub vertical_thrust: f64,

    #[arg(
        long,
        default_value = "0.6",
        allow_negative_numbers = true,
        help = "Bias added to the altitude error",
        long_help = "Constant added to (target - altitude) before the cubic altitude law, so the \
            vehicle holds its target with a non-zero vertical correction."
    )]
    pub vertical_offset: f64,

    #[arg(long, default_value = "3.0", help = "Altitude proportional gain")]
    pub vertical_p: f64,

    #[arg(long, default_value = "50.0", help = "Roll proportional gain")]
    pub roll_p: f64,

    #[arg(long, default_value = "20.0", help = "Pitch proportional gain")]
    pub pitch_p: f64,

    #[arg(
        long,
        help = "JSON file with control gains",
        long_help = "Path to a JSON object with vertical_thrust, vertical_offset, vertical_p, \
            roll_p and pitch_p. When given it replaces every gain set on the command line."
    )]
    pub gains_file: Option<PathBuf>,
}

impl GainArgs {
    /// Resolve the gains, preferring the gains file when one is given.
    pub fn to_config(&self) -> Result<ControlConfig, FlightError> {
        if let Some(path) = &self.gains_file {
            return ControlConfig::load_from_file(path);
        }
        let config = ControlConfig {
            vertical_thrust: self.vertical_thrust,
            vertical_offset: self.vertical_offset,
            vertical_p: self.vertical_p,
            roll_p: self.roll_p,
            pitch_p: self.pitch_p,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Network, timing and encoding settings.
#[derive(Args, Debug, Clone)]
pub struct ServerArgs {
    #[arg(
        short = 'b',
        long,
        default_value = "127.0.0.1",
        help = "WebSocket server bind address",
        long_help = "IP address to bind the server to. Use '0.0.0.0' to accept remote \
            ground stations, or '127.0.0.1' for localhost-only access."
    )]
    pub bind_address: String,

    #[arg(
        short = 'p',
        long,
        default_value = "8765",
        help = "WebSocket server port",
        long_help = "TCP port for the server. Clients connect to ws://<bind_address>:<port>/ws."
    )]
    pub port: u16,

    #[arg(
        long,
        default_value = "2",
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Control ticks per published frame"
    )]
    pub frame_interval: u32,

    #[arg(
        long,
        default_value = "85",
        value_parser = clap::value_parser!(u8).range(1..=100),
        help = "JPEG quality (1-100)"
    )]
    pub jpeg_quality: u8,

    #[arg(
        long,
        default_value = "8",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Control loop period in milliseconds"
    )]
    pub tick_ms: u64,

    #[arg(
        long,
        default_value = "16",
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Broadcast period in milliseconds",
        long_help = "How often the current sensor-data message is pushed to connected \
            clients. Independent of the control period."
    )]
    pub broadcast_ms: u64,

    #[arg(long, default_value = "400", help = "Simulated camera width in pixels")]
    pub camera_width: u32,

    #[arg(long, default_value = "240", help = "Simulated camera height in pixels")]
    pub camera_height: u32,

    #[arg(
        long,
        help = "Seed for simulated sensor noise",
        long_help = "Fixes the random jitter on battery, link, temperature and wind readings \
            so runs are reproducible. Seeded from the OS when omitted."
    )]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub gains: GainArgs,
}

impl ServerArgs {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn broadcast_period(&self) -> Duration {
        Duration::from_millis(self.broadcast_ms)
    }

    pub fn loop_settings(&self) -> Result<LoopSettings, FlightError> {
        Ok(LoopSettings {
            control: self.gains.to_config()?,
            tick_period: self.tick_period(),
            frame_interval: self.frame_interval,
            jpeg_quality: self.jpeg_quality,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        server: ServerArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::try_parse_from(["flight_server"]).unwrap();
        let server = cli.server;
        assert_eq!(server.bind_address, "127.0.0.1");
        assert_eq!(server.port, 8765);
        assert_eq!(server.frame_interval, 2);
        assert_eq!(server.tick_period(), Duration::from_millis(8));
        assert_eq!(server.broadcast_period(), Duration::from_millis(16));

        let settings = server.loop_settings().unwrap();
        assert_eq!(settings.control, ControlConfig::default());
        assert_eq!(settings.jpeg_quality, 85);
    }

    #[test]
    fn test_range_checks() {
        assert!(TestCli::try_parse_from(["flight_server", "--frame-interval", "0"]).is_err());
        assert!(TestCli::try_parse_from(["flight_server", "--jpeg-quality", "101"]).is_err());
        assert!(TestCli::try_parse_from(["flight_server", "--tick-ms", "0"]).is_err());
    }

    #[test]
    fn test_gain_overrides() {
        let cli = TestCli::try_parse_from([
            "flight_server",
            "--roll-p",
            "42",
            "--vertical-offset",
            "-0.2",
        ])
        .unwrap();
        let config = cli.server.gains.to_config().unwrap();
        assert_eq!(config.roll_p, 42.0);
        assert_eq!(config.vertical_offset, -0.2);
        assert_eq!(config.pitch_p, 20.0);
    }

    #[test]
    fn test_non_finite_gain_rejected() {
        let cli = TestCli::try_parse_from(["flight_server", "--pitch-p", "inf"]).unwrap();
        assert!(cli.server.gains.to_config().is_err());
    }
}
