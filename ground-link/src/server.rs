//! WebSocket endpoint for ground stations.
//!
//! Each connection on `/ws` is both an observer of the sensor-data broadcast
//! and a source of pilot commands and requests. Rejections go back only to
//! the client that sent the request.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use flight_protocol::{CommandError, ServerMessage};
use futures::{Sink, SinkExt, StreamExt};
use tracing::{debug, info};

use crate::command_bridge::CommandBridge;
use crate::error::LinkError;
use crate::publisher::TelemetryPublisher;

/// State shared by every connection.
#[derive(Clone)]
pub struct AppState {
    pub bridge: CommandBridge,
    pub publisher: Arc<TelemetryPublisher>,
}

/// Reply owed to a client for a request that could not be honoured.
pub fn command_error_for(err: &LinkError) -> Option<CommandError> {
    match err {
        LinkError::Rejected { command, reason } => Some(CommandError {
            command: command.clone(),
            message: reason.clone(),
        }),
        LinkError::InvalidCamera(_) => Some(CommandError {
            command: "camera_switch".to_string(),
            message: err.to_string(),
        }),
        LinkError::LoopStopped => Some(CommandError {
            command: "request".to_string(),
            message: err.to_string(),
        }),
        _ => None,
    }
}

/// Send the reply owed for `err`, if any, to one client.
///
/// Errors only when the client's sink is gone.
async fn send_command_error<S>(sender: &mut S, err: &LinkError) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    let Some(reply) = command_error_for(err) else {
        return Ok(());
    };
    match serde_json::to_string(&ServerMessage::CommandError(reply)) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            debug!("Could not serialize command error: {e}");
            Ok(())
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_endpoint(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| ws_client_handler(socket, state))
}

async fn ws_client_handler(ws: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = ws.split();
    let (observer_id, mut frames) = state.publisher.connect();

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Some(text) => {
                        if sender.send(Message::Text(text.to_string())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Err(err) = state.bridge.ingest(&text) else {
                            continue;
                        };
                        if send_command_error(&mut sender, &err).await.is_err() {
                            debug!("Observer {observer_id} went away before its command error reply");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!("WebSocket receive error from observer {observer_id}: {e}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    state.publisher.disconnect(observer_id);
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_endpoint))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve the router on an already-bound listener until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!("Starting server on http://{}", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);
    info!("Health endpoint: http://{}/health", addr);

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))
}

/// Parse `bind_address:port` into a socket address.
pub fn socket_addr(bind_address: &str, port: u16) -> anyhow::Result<SocketAddr> {
    format!("{bind_address}:{port}")
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address: {e}"))
}

/// Console logging filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
