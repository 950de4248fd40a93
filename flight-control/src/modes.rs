//! Flight mode state machine.
//!
//! Owns the active [`FlightMode`] and, once per tick, drives the altitude
//! target and disturbances of a [`ControllerState`] according to that mode.
//!
//! ```text
//!            request             |alt - 2.0| < 0.1
//!   Idle ───────────► Takeoff ─────────────────────► Manual
//!    ▲                                                  │ request
//!    │ alt < 0.12                                       ▼
//!   Land ◄──── ReturnToHome (within 0.5 m of home)    Hover
//!    ▲
//!    └──── EmergencyStop (relabelled on the next tick)
//! ```
//!
//! Any mode can be requested from any other; the automatic edges above are
//! the only transitions the machine takes on its own.

use tracing::{debug, info, warn};

use crate::controller::ControllerState;
use crate::error::FlightError;
use crate::state::FlightMode;
use crate::types::Position;

/// Altitude targeted during takeoff and return-to-home (meters)
pub const TAKEOFF_ALTITUDE: f64 = 2.0;
/// Takeoff completes once within this distance of the takeoff altitude
pub const TAKEOFF_TOLERANCE: f64 = 0.1;
/// Land hands over to Idle below this altitude
pub const TOUCHDOWN_ALTITUDE: f64 = 0.12;
/// Staged landing targets never go below this altitude
pub const LAND_TARGET_FLOOR: f64 = 0.1;
/// Per-tick disturbance decay while hovering
pub const HOVER_DECAY: f64 = 0.85;
/// Horizontal gain from home offset to roll/pitch disturbance
pub const HOME_GAIN: f64 = 0.2;
/// Bound on the home-seeking disturbance
pub const HOME_DISTURBANCE_LIMIT: f64 = 0.5;
/// Return-to-home switches to Land within this horizontal distance (meters)
pub const HOME_ARRIVAL_RADIUS: f64 = 0.5;

/// Staged landing target for the current altitude.
///
/// Drops quickly while high and decelerates near the ground.
pub fn landing_target(altitude: f64) -> f64 {
    let step = if altitude > 1.5 {
        1.0
    } else if altitude > 0.8 {
        0.4
    } else if altitude > 0.3 {
        0.1
    } else {
        0.02
    };
    (altitude - step).max(LAND_TARGET_FLOOR)
}

/// Flight mode state machine
#[derive(Debug, Clone)]
pub struct FlightModeManager {
    /// Active mode
    mode: FlightMode,
    /// Altitude latched on Hover entry
    hover_target: Option<f64>,
    /// First valid position fix, never overwritten
    home: Option<Position>,
    /// Set while a Land descent was forced by EmergencyStop
    emergency_descent: bool,
}

impl Default for FlightModeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FlightModeManager {
    /// Start on the ground in Idle with no home recorded.
    pub fn new() -> Self {
        Self {
            mode: FlightMode::Idle,
            hover_target: None,
            home: None,
            emergency_descent: false,
        }
    }

    pub fn mode(&self) -> FlightMode {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == FlightMode::Idle
    }

    pub fn is_manual(&self) -> bool {
        self.mode == FlightMode::Manual
    }

    pub fn home(&self) -> Option<Position> {
        self.home
    }

    pub fn hover_target(&self) -> Option<f64> {
        self.hover_target
    }

    /// True while descending because of an emergency stop.
    pub fn is_emergency_descent(&self) -> bool {
        self.emergency_descent
    }

    /// Request a mode by name.
    ///
    /// Unknown names are rejected and leave the machine untouched.
    pub fn request_mode(&mut self, name: &str) -> Result<FlightMode, FlightError> {
        let mode = name.parse::<FlightMode>().inspect_err(|e| {
            warn!("Rejected flight mode request: {e}");
        })?;
        self.set_mode(mode);
        Ok(mode)
    }

    /// Switch to `mode`.
    ///
    /// Returns false when the request was a no-op (an emergency stop while
    /// an emergency descent is already under way).
    pub fn set_mode(&mut self, mode: FlightMode) -> bool {
        if mode == FlightMode::EmergencyStop
            && (self.emergency_descent || self.mode == FlightMode::EmergencyStop)
        {
            debug!("Emergency stop already in progress, ignoring repeat request");
            return false;
        }

        if mode != FlightMode::Hover {
            self.hover_target = None;
        }
        if mode != FlightMode::EmergencyStop {
            self.emergency_descent = false;
        }

        if mode != self.mode {
            info!("Flight mode {} -> {} (requested)", self.mode, mode);
        }
        self.mode = mode;
        true
    }

    fn transition(&mut self, next: FlightMode, reason: &str) {
        info!("Flight mode {} -> {} ({reason})", self.mode, next);
        if next != FlightMode::Hover {
            self.hover_target = None;
        }
        self.mode = next;
    }

    /// Record the home position on the first valid fix.
    fn capture_home(&mut self, position: &Position) {
        if self.home.is_none() && position.is_valid() {
            info!(
                "Home position recorded at ({:.2}, {:.2}, {:.2})",
                position.x, position.y, position.z
            );
            self.home = Some(*position);
        }
    }

    /// Run one tick of mode logic against the latest position sample.
    ///
    /// A sample without a finite altitude leaves the mode and the controller
    /// state untouched; the Hover latch waits for the first finite altitude.
    pub fn update(&mut self, position: &Position, state: &mut ControllerState) {
        self.capture_home(position);
        let altitude = position.z;
        if !altitude.is_finite() {
            debug!("No altitude fix, holding {} mode logic", self.mode);
            return;
        }

        match self.mode {
            FlightMode::Idle | FlightMode::Manual => {}

            FlightMode::Takeoff => {
                state.set_target_altitude(TAKEOFF_ALTITUDE);
                if (altitude - TAKEOFF_ALTITUDE).abs() < TAKEOFF_TOLERANCE {
                    self.transition(FlightMode::Manual, "takeoff altitude reached");
                }
            }

            FlightMode::EmergencyStop => {
                state.clear_disturbances();
                self.emergency_descent = true;
                self.transition(FlightMode::Land, "emergency stop");
                self.update_land(altitude, state);
            }

            FlightMode::Land => self.update_land(altitude, state),

            FlightMode::Hover => {
                let target = *self.hover_target.get_or_insert(altitude);
                state.set_target_altitude(target);
                state.decay_disturbances(HOVER_DECAY);
            }

            FlightMode::ReturnToHome => self.update_return_to_home(position, state),
        }
    }

    fn update_land(&mut self, altitude: f64, state: &mut ControllerState) {
        state.clear_disturbances();
        state.set_target_altitude(landing_target(altitude));

        if altitude < TOUCHDOWN_ALTITUDE {
            self.emergency_descent = false;
            self.transition(FlightMode::Idle, "touchdown");
        }
    }

    fn update_return_to_home(&mut self, position: &Position, state: &mut ControllerState) {
        let Some(home) = self.home else {
            warn!("Return to home requested with no home recorded, landing in place");
            self.transition(FlightMode::Land, "no home position");
            return;
        };

        if !(position.x.is_finite() && position.y.is_finite()) {
            // hold at return altitude until the horizontal fix comes back
            state.clear_disturbances();
            state.set_target_altitude(TAKEOFF_ALTITUDE);
            return;
        }

        if position.horizontal_distance(&home) < HOME_ARRIVAL_RADIUS {
            self.transition(FlightMode::Land, "arrived over home");
            return;
        }

        state.set_target_altitude(TAKEOFF_ALTITUDE);
        state.disturbances.pitch = ((position.x - home.x) * HOME_GAIN)
            .clamp(-HOME_DISTURBANCE_LIMIT, HOME_DISTURBANCE_LIMIT);
        state.disturbances.roll = ((position.y - home.y) * HOME_GAIN)
            .clamp(-HOME_DISTURBANCE_LIMIT, HOME_DISTURBANCE_LIMIT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Disturbances;
    use approx::assert_relative_eq;

    fn at(z: f64) -> Position {
        Position::new(0.0, 0.0, z)
    }

    fn disturbed() -> ControllerState {
        ControllerState {
            target_altitude: 3.0,
            disturbances: Disturbances {
                roll: 0.4,
                pitch: -0.3,
                yaw: 0.2,
            },
        }
    }

    #[test]
    fn test_starts_idle_and_idle_leaves_state_alone() {
        let mut modes = FlightModeManager::new();
        let mut state = disturbed();
        modes.update(&at(0.05), &mut state);

        assert!(modes.is_idle());
        assert_eq!(state, disturbed());
    }

    #[test]
    fn test_landing_target_stages() {
        assert_relative_eq!(landing_target(3.0), 2.0);
        assert_relative_eq!(landing_target(1.0), 0.6);
        assert_relative_eq!(landing_target(0.5), 0.4);
        assert_relative_eq!(landing_target(0.2), 0.18);
        assert_relative_eq!(landing_target(0.11), 0.1);
        assert_relative_eq!(landing_target(0.05), 0.1);
    }

    #[test]
    fn test_takeoff_hands_over_to_manual() {
        let mut modes = FlightModeManager::new();
        let mut state = ControllerState::default();
        modes.set_mode(FlightMode::Takeoff);

        modes.update(&at(0.5), &mut state);
        assert_eq!(modes.mode(), FlightMode::Takeoff);
        assert_relative_eq!(state.target_altitude, TAKEOFF_ALTITUDE);

        modes.update(&at(1.95), &mut state);
        assert_eq!(modes.mode(), FlightMode::Manual);
    }

    #[test]
    fn test_invalid_request_leaves_mode_unchanged() {
        let mut modes = FlightModeManager::new();
        modes.set_mode(FlightMode::Manual);

        assert!(modes.request_mode("loop_the_loop").is_err());
        assert_eq!(modes.mode(), FlightMode::Manual);

        assert_eq!(modes.request_mode("hover").unwrap(), FlightMode::Hover);
        assert_eq!(modes.mode(), FlightMode::Hover);
    }

    #[test]
    fn test_hover_latches_and_relatches() {
        let mut modes = FlightModeManager::new();
        let mut state = disturbed();

        modes.set_mode(FlightMode::Hover);
        modes.update(&at(3.3), &mut state);
        assert_relative_eq!(state.target_altitude, 3.3);
        assert_relative_eq!(state.disturbances.roll, 0.4 * HOVER_DECAY);

        // altitude drifts, target stays latched
        modes.update(&at(3.8), &mut state);
        assert_relative_eq!(state.target_altitude, 3.3);

        // re-requesting hover while hovering keeps the latch
        modes.set_mode(FlightMode::Hover);
        modes.update(&at(4.0), &mut state);
        assert_relative_eq!(state.target_altitude, 3.3);

        // leaving and re-entering samples the new altitude
        modes.set_mode(FlightMode::Manual);
        assert_eq!(modes.hover_target(), None);
        modes.set_mode(FlightMode::Hover);
        modes.update(&at(5.1), &mut state);
        assert_relative_eq!(state.target_altitude, 5.1);
    }

    #[test]
    fn test_emergency_stop_zeroes_and_lands() {
        for start in FlightMode::ALL {
            let mut modes = FlightModeManager::new();
            modes.set_mode(start);
            let mut state = disturbed();

            modes.set_mode(FlightMode::EmergencyStop);
            modes.update(&at(4.0), &mut state);

            assert!(state.disturbances.is_zero(), "from {start}");
            assert_eq!(modes.mode(), FlightMode::Land, "from {start}");
            assert!(modes.is_emergency_descent());
            assert_relative_eq!(state.target_altitude, 3.0);
        }
    }

    #[test]
    fn test_repeated_emergency_stop_is_noop() {
        let mut modes = FlightModeManager::new();
        let mut state = disturbed();
        modes.set_mode(FlightMode::Manual);

        assert!(modes.set_mode(FlightMode::EmergencyStop));
        assert!(!modes.set_mode(FlightMode::EmergencyStop));
        modes.update(&at(4.0), &mut state);
        assert!(!modes.set_mode(FlightMode::EmergencyStop));
        assert_eq!(modes.mode(), FlightMode::Land);

        modes.update(&at(2.5), &mut state);
        assert!(state.disturbances.is_zero());
        assert_eq!(modes.mode(), FlightMode::Land);
    }

    #[test]
    fn test_emergency_rearms_after_touchdown() {
        let mut modes = FlightModeManager::new();
        let mut state = ControllerState::default();
        modes.set_mode(FlightMode::EmergencyStop);
        modes.update(&at(0.5), &mut state);
        modes.update(&at(0.05), &mut state);
        assert!(modes.is_idle());
        assert!(!modes.is_emergency_descent());

        assert!(modes.set_mode(FlightMode::EmergencyStop));
    }

    #[test]
    fn test_land_to_idle_exactly_once() {
        let mut modes = FlightModeManager::new();
        let mut state = ControllerState::default();
        modes.set_mode(FlightMode::Land);

        let mut altitude = 2.4;
        let mut transitions = 0;
        let mut previous_mode = modes.mode();
        for _ in 0..200 {
            modes.update(&at(altitude), &mut state);
            if previous_mode == FlightMode::Land && modes.mode() == FlightMode::Idle {
                transitions += 1;
            }
            assert!(modes.mode() != FlightMode::Land || state.target_altitude < altitude);
            previous_mode = modes.mode();
            // vehicle tracks half-way toward the target each tick
            if modes.mode() == FlightMode::Land {
                altitude += (state.target_altitude - altitude) * 0.5;
            }
        }
        assert_eq!(transitions, 1);
        assert!(modes.is_idle());
    }

    #[test]
    fn test_return_to_home_steers_toward_home() {
        let mut modes = FlightModeManager::new();
        let mut state = ControllerState::default();

        modes.update(&Position::new(0.0, 0.0, 0.0), &mut state);
        assert_eq!(modes.home(), Some(Position::new(0.0, 0.0, 0.0)));

        modes.set_mode(FlightMode::ReturnToHome);
        modes.update(&Position::new(1.0, 0.0, 1.5), &mut state);
        assert_eq!(modes.mode(), FlightMode::ReturnToHome);
        assert_relative_eq!(state.disturbances.pitch, 0.2);
        assert_relative_eq!(state.disturbances.roll, 0.0);
        assert_relative_eq!(state.target_altitude, TAKEOFF_ALTITUDE);

        modes.update(&Position::new(-8.0, 5.0, 2.0), &mut state);
        assert_relative_eq!(state.disturbances.pitch, -0.5);
        assert_relative_eq!(state.disturbances.roll, 0.5);

        modes.update(&Position::new(0.4, 0.0, 2.0), &mut state);
        assert_eq!(modes.mode(), FlightMode::Land);
    }

    #[test]
    fn test_return_to_home_without_home_lands() {
        let mut modes = FlightModeManager::new();
        let mut state = ControllerState::default();
        modes.set_mode(FlightMode::ReturnToHome);

        modes.update(&Position::new(f64::NAN, f64::NAN, 2.0), &mut state);
        assert_eq!(modes.home(), None);
        assert_eq!(modes.mode(), FlightMode::Land);
    }

    #[test]
    fn test_return_to_home_holds_without_horizontal_fix() {
        let mut modes = FlightModeManager::new();
        let mut state = disturbed();
        modes.update(&Position::new(0.0, 0.0, 0.0), &mut state);
        modes.set_mode(FlightMode::ReturnToHome);

        modes.update(&Position::new(f64::NAN, 3.0, 2.5), &mut state);
        assert_eq!(modes.mode(), FlightMode::ReturnToHome);
        assert!(state.disturbances.is_zero());
        assert_relative_eq!(state.target_altitude, TAKEOFF_ALTITUDE);

        modes.update(&Position::new(2.0, 0.0, 2.0), &mut state);
        assert_eq!(modes.mode(), FlightMode::ReturnToHome);
        assert_relative_eq!(state.disturbances.pitch, 0.4);
    }

    #[test]
    fn test_hover_latches_first_finite_altitude() {
        let mut modes = FlightModeManager::new();
        let mut state = ControllerState::default();
        modes.set_mode(FlightMode::Hover);

        modes.update(&Position::new(f64::NAN, f64::NAN, f64::NAN), &mut state);
        assert_eq!(modes.hover_target(), None);
        assert_eq!(modes.mode(), FlightMode::Hover);
        assert!(state.target_altitude.is_finite());

        modes.update(&at(1.7), &mut state);
        assert_eq!(modes.hover_target(), Some(1.7));
        assert_relative_eq!(state.target_altitude, 1.7);
    }

    #[test]
    fn test_missing_altitude_leaves_takeoff_and_land_alone() {
        let nowhere = Position::new(f64::NAN, f64::NAN, f64::NAN);
        for mode in [FlightMode::Takeoff, FlightMode::Land, FlightMode::EmergencyStop] {
            let mut modes = FlightModeManager::new();
            let mut state = disturbed();
            modes.set_mode(mode);

            modes.update(&nowhere, &mut state);
            assert_eq!(modes.mode(), mode, "in {mode}");
            assert_eq!(state, disturbed(), "in {mode}");
        }
    }

    #[test]
    fn test_home_is_first_write_wins() {
        let mut modes = FlightModeManager::new();
        let mut state = ControllerState::default();

        modes.update(&Position::new(f64::NAN, 0.0, 0.0), &mut state);
        assert_eq!(modes.home(), None);

        modes.update(&Position::new(1.0, 2.0, 0.1), &mut state);
        modes.update(&Position::new(9.0, 9.0, 9.0), &mut state);
        assert_eq!(modes.home(), Some(Position::new(1.0, 2.0, 0.1)));
    }
}
