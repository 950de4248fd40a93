//! Flight server: simulated quadrotor, control loop and WebSocket link.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use flight_control::mock::SimulatedQuadrotor;
use ground_link::server::{init_tracing, serve, socket_addr};
use ground_link::{command_bridge, AppState, ControlLoop, LinkError, ServerArgs, TelemetryPublisher};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Quadrotor flight control server with WebSocket ground link")]
struct Args {
    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let settings = args
        .server
        .loop_settings()
        .context("Invalid control gains")?;
    info!("Control gains: {:?}", settings.control);

    let vehicle = SimulatedQuadrotor::new(args.server.tick_period().as_secs_f64())
        .with_camera_size(args.server.camera_width, args.server.camera_height);

    let (bridge, receiver) = command_bridge();
    let publisher = Arc::new(TelemetryPublisher::new());
    let shutdown = Arc::new(AtomicBool::new(false));

    info!("Starting control loop...");
    let control = ControlLoop::new(vehicle, receiver, publisher.clone(), settings);
    let control_thread = control
        .spawn(shutdown.clone())
        .context("Failed to start control loop thread")?;

    info!("Starting broadcast loop...");
    let broadcast = tokio::spawn(
        publisher
            .clone()
            .run_broadcast_loop(args.server.broadcast_period()),
    );

    let addr = socket_addr(&args.server.bind_address, args.server.port)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    let state = AppState { bridge, publisher };
    let stop = shutdown.clone();
    let result = serve(listener, state, async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown requested");
        stop.store(true, Ordering::Relaxed);
    })
    .await;

    shutdown.store(true, Ordering::Relaxed);
    broadcast.abort();

    let control = tokio::task::spawn_blocking(move || control_thread.join())
        .await?
        .map_err(|_| LinkError::LoopStopped)?;
    info!(
        "Flight ended in {} after {:.1} s",
        control.mode(),
        control.elapsed_seconds()
    );

    result
}
