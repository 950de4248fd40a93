//! Fixed-rate control loop.
//!
//! One [`ControlLoop::tick`] reads the vehicle, applies queued requests, runs
//! the flight mode machine and the mixer, drives the motors and, every few
//! ticks, hands a fresh sensor-data message to the publisher. A tick never
//! blocks on the network and never fails: anything that goes wrong while
//! producing telemetry is logged and the motors are still driven.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use flight_control::mixer::compute_motor_commands;
use flight_control::{
    AuxiliarySensors, ControlConfig, ControllerState, FlightMode, FlightModeManager,
    MotorActuators, MotorSpeeds, Orientation, Position, VehicleSensors,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::camera_pipeline::CameraPipeline;
use crate::command_bridge::{BridgeEvent, CommandReceiver};
use crate::error::LinkError;
use crate::publisher::TelemetryPublisher;
use crate::telemetry::TelemetrySnapshot;

/// Disturbance decay per tick in Manual when no pilot command arrived
pub const MANUAL_DECAY: f64 = 0.95;
/// Disturbance decay per tick in the automatic modes
pub const AUTO_DECAY: f64 = 0.9;

const OVERRUN_LOG_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub control: ControlConfig,
    /// Control period
    pub tick_period: Duration,
    /// Publish a frame every this many ticks
    pub frame_interval: u32,
    pub jpeg_quality: u8,
    /// Seed for simulated sensor jitter; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            control: ControlConfig::default(),
            tick_period: Duration::from_millis(8),
            frame_interval: 2,
            jpeg_quality: 85,
            seed: None,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Mode after the tick
    pub mode: FlightMode,
    /// Motor speeds as applied by the vehicle
    pub motors: MotorSpeeds,
    pub command_applied: bool,
    pub events_handled: usize,
    pub published: bool,
}

pub struct ControlLoop<V> {
    vehicle: V,
    config: ControlConfig,
    state: ControllerState,
    modes: FlightModeManager,
    commands: CommandReceiver,
    pipeline: CameraPipeline,
    publisher: Arc<TelemetryPublisher>,
    auxiliary: AuxiliarySensors,
    rng: StdRng,
    tick_period: Duration,
    frame_interval: u64,
    ticks: u64,
}

impl<V: VehicleSensors + MotorActuators> ControlLoop<V> {
    pub fn new(
        vehicle: V,
        commands: CommandReceiver,
        publisher: Arc<TelemetryPublisher>,
        settings: LoopSettings,
    ) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            vehicle,
            config: settings.control,
            state: ControllerState::default(),
            modes: FlightModeManager::new(),
            commands,
            pipeline: CameraPipeline::new(settings.jpeg_quality),
            publisher,
            auxiliary: AuxiliarySensors::default(),
            rng,
            tick_period: settings.tick_period,
            frame_interval: u64::from(settings.frame_interval.max(1)),
            ticks: 0,
        }
    }

    pub fn mode(&self) -> FlightMode {
        self.modes.mode()
    }

    pub fn modes(&self) -> &FlightModeManager {
        &self.modes
    }

    pub fn controller_state(&self) -> &ControllerState {
        &self.state
    }

    pub fn vehicle(&self) -> &V {
        &self.vehicle
    }

    pub fn auxiliary(&self) -> &AuxiliarySensors {
        &self.auxiliary
    }

    pub fn camera(&self) -> &CameraPipeline {
        &self.pipeline
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated time elapsed, in seconds.
    pub fn elapsed_seconds(&self) -> f64 {
        self.ticks as f64 * self.tick_period.as_secs_f64()
    }

    fn handle_event(&mut self, event: BridgeEvent) {
        match event {
            BridgeEvent::ModeChange(mode) => {
                self.modes.set_mode(mode);
            }
            BridgeEvent::CameraSwitch(camera) => self.pipeline.set_active_camera(camera),
            BridgeEvent::Gimbal { pitch, yaw } => self.vehicle.set_camera_gimbal(pitch, yaw),
        }
    }

    /// Run one control cycle.
    pub fn tick(&mut self) -> TickReport {
        let orientation = self.vehicle.orientation();
        let rates = self.vehicle.angular_velocity();
        let position = self.vehicle.position();

        let events = self.commands.drain_events();
        let events_handled = events.len();
        for event in events {
            self.handle_event(event);
        }

        self.modes.update(&position, &mut self.state);

        let mut command_applied = false;
        let speeds = if self.modes.is_idle() {
            self.commands.discard_command();
            if position.z.is_finite() {
                self.state.set_target_altitude(position.z);
            }
            MotorSpeeds::zero()
        } else if !position.z.is_finite() {
            // nothing to regulate altitude against without an altitude fix
            MotorSpeeds::zero()
        } else {
            if self.modes.is_manual() {
                match self.commands.try_take_command() {
                    Some(command) => {
                        self.state.apply_pilot_command(&command);
                        command_applied = true;
                    }
                    None => self.state.decay_disturbances(MANUAL_DECAY),
                }
            } else {
                self.state.decay_disturbances(AUTO_DECAY);
            }
            compute_motor_commands(&orientation, &rates, position.z, &self.state, &self.config)
        };

        let applied = self.vehicle.apply_motor_speeds(speeds);
        self.auxiliary.update(
            &applied,
            &position,
            self.tick_period.as_secs_f64(),
            &mut self.rng,
        );
        self.ticks += 1;

        let published = if self.ticks % self.frame_interval == 0 {
            match self.publish_frame(&orientation, &position) {
                Ok(published) => published,
                Err(e) => {
                    warn!("Telemetry publish failed: {e}");
                    false
                }
            }
        } else {
            false
        };

        TickReport {
            mode: self.modes.mode(),
            motors: applied,
            command_applied,
            events_handled,
            published,
        }
    }

    /// Encode the current camera frame and publish it with telemetry.
    ///
    /// Returns false when the vehicle had no frame this tick.
    fn publish_frame(
        &mut self,
        orientation: &Orientation,
        position: &Position,
    ) -> Result<bool, LinkError> {
        let Some(frame) = self.vehicle.camera_frame() else {
            return Ok(false);
        };
        let encoded = self.pipeline.encode(&frame)?;

        let snapshot = TelemetrySnapshot {
            timestamp: self.elapsed_seconds(),
            orientation,
            position,
            target_altitude: self.state.target_altitude,
            mode: self.modes.mode(),
            auxiliary: &self.auxiliary,
        };
        self.publisher.publish(snapshot.sensor_data(&encoded))?;
        Ok(true)
    }

    /// Tick at the configured period until `shutdown` is raised.
    ///
    /// Deadlines are absolute; a late tick re-anchors the schedule rather
    /// than running extra ticks to catch up.
    pub fn run(&mut self, shutdown: &AtomicBool) {
        info!(
            "Control loop running at {:.1} Hz, frame every {} ticks",
            1.0 / self.tick_period.as_secs_f64(),
            self.frame_interval
        );

        let mut deadline = Instant::now() + self.tick_period;
        let mut overruns: u64 = 0;
        let mut last_overrun_log: Option<Instant> = None;

        while !shutdown.load(Ordering::Relaxed) {
            self.tick();

            let now = Instant::now();
            if now < deadline {
                std::thread::sleep(deadline - now);
                deadline += self.tick_period;
            } else {
                overruns += 1;
                if last_overrun_log.map_or(true, |t| now.duration_since(t) >= OVERRUN_LOG_INTERVAL) {
                    debug!(
                        "Control tick overran by {:?} ({overruns} overruns so far)",
                        now - deadline
                    );
                    last_overrun_log = Some(now);
                }
                deadline = now + self.tick_period;
            }
        }

        info!("Control loop stopped after {} ticks", self.ticks);
    }
}

impl<V: VehicleSensors + MotorActuators + Send + 'static> ControlLoop<V> {
    /// Move the loop onto its own thread. The thread hands the loop back
    /// when it stops.
    pub fn spawn(mut self, shutdown: Arc<AtomicBool>) -> std::io::Result<JoinHandle<Self>> {
        std::thread::Builder::new()
            .name("control-loop".to_string())
            .spawn(move || {
                self.run(&shutdown);
                self
            })
    }
}
