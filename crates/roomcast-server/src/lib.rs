//! Roomcast production server.
//!
//! Production "glue" that wraps the sans-IO core (`roomcast-core`) with real
//! I/O: an axum WebSocket endpoint, a tokio runtime, and OS randomness for
//! connection IDs. The [`ServerDriver`] stays pure (events in, actions out);
//! [`Server`] executes the actions.
//!
//! # Concurrency
//!
//! All membership state lives behind one async mutex. An inbound event is
//! processed and its actions delivered inside that exclusive section, which
//! serializes events per room, so every member of a room observes the same
//! relative broadcast order. Delivery is a push into each recipient's
//! unbounded channel — the lock is never held across network I/O; a writer
//! task per connection owns the socket sink and drains the channel. Lock
//! order is always driver, then outbound map; never the reverse.
//!
//! # Components
//!
//! - [`ServerDriver`]: event-based orchestrator (pure logic, no I/O)
//! - [`Server`]: runtime that accepts WebSocket connections and executes
//!   driver actions
//! - [`ClientEvent`]: the JSON wire protocol

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod driver;
mod error;
mod protocol;

use std::{collections::HashMap, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
    routing::get,
};
pub use driver::{DriverConfig, ServerAction, ServerDriver, ServerEvent};
pub use error::{DriverError, ServerError};
use futures_util::{SinkExt, StreamExt};
pub use protocol::ClientEvent;
use roomcast_core::ConnectionId;
use tokio::sync::{Mutex, RwLock, mpsc};

/// Shared state for all connections.
struct SharedState {
    /// The event-based server driver; all membership mutation is serialized
    /// through this lock.
    driver: Mutex<ServerDriver>,
    /// Connection ID → outbound channel. Every message to a client goes
    /// through its single channel, preserving per-connection ordering.
    outbound: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<Message>>>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:5000")
    pub bind_address: String,
    /// Driver configuration (connection limit)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:5000".to_string(), driver: DriverConfig::default() }
    }
}

/// Production roomcast server.
///
/// Wraps [`ServerDriver`] with an axum WebSocket transport.
pub struct Server {
    /// Bound TCP listener
    listener: tokio::net::TcpListener,
    /// State shared by all connection tasks
    state: Arc<SharedState>,
}

impl Server {
    /// Create and bind a new server.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let listener = tokio::net::TcpListener::bind(&config.bind_address).await.map_err(|e| {
            ServerError::Config(format!("failed to bind '{}': {e}", config.bind_address))
        })?;

        let state = Arc::new(SharedState {
            driver: Mutex::new(ServerDriver::new(config.driver)),
            outbound: RwLock::new(HashMap::new()),
        });

        Ok(Self { listener, state })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server, accepting connections and processing events.
    ///
    /// Runs until the process is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("server listening on {}", self.local_addr()?);

        let app = Router::new().route("/ws", get(ws_handler)).with_state(self.state);
        axum::serve(self.listener, app).await?;

        Ok(())
    }
}

/// Upgrade an HTTP request to a WebSocket connection.
async fn ws_handler(State(state): State<Arc<SharedState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Connection ID from the OS RNG. Random rather than sequential so IDs are
/// not guessable across connections.
#[allow(clippy::expect_used)]
fn random_connection_id() -> ConnectionId {
    let mut buf = [0u8; 8];
    getrandom::fill(&mut buf).expect("invariant: OS RNG failure is unrecoverable");
    u64::from_le_bytes(buf)
}

/// Handle a single WebSocket connection for its whole lifetime.
async fn handle_connection(socket: WebSocket, state: Arc<SharedState>) {
    let connection_id = random_connection_id();
    tracing::debug!(connection_id, "new websocket connection");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    state.outbound.write().await.insert(connection_id, tx);

    // Writer task owns the sink; fan-out pushes never block on the wire.
    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    process(&state, ServerEvent::ConnectionAccepted { connection_id }).await;

    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => {
                    process(&state, ServerEvent::EventReceived { connection_id, event }).await;
                },
                Err(err) => {
                    tracing::warn!(connection_id, %err, "undecodable client event");
                    send_to(&state, connection_id, format!("error: {err}")).await;
                },
            },
            Message::Close(_) => break,
            // Binary and ping/pong frames carry no protocol events.
            _ => {},
        }
    }

    process(&state, ServerEvent::ConnectionClosed {
        connection_id,
        reason: "connection closed".to_string(),
    })
    .await;

    state.outbound.write().await.remove(&connection_id);
    send_task.abort();
}

/// Feed one event to the driver and execute the resulting actions.
///
/// The driver lock is held across both steps so membership mutation and
/// action delivery form one exclusive section; the deliveries themselves are
/// channel pushes, never network I/O.
async fn process(state: &SharedState, event: ServerEvent) {
    let mut driver = state.driver.lock().await;
    match driver.process_event(event) {
        Ok(actions) => execute_actions(actions, state).await,
        Err(err) => tracing::error!(%err, "driver rejected event"),
    }
}

/// Execute driver actions.
async fn execute_actions(actions: Vec<ServerAction>, state: &SharedState) {
    for action in actions {
        match action {
            ServerAction::SendToConnection { connection_id, text } => {
                send_to(state, connection_id, text).await;
            },

            ServerAction::Broadcast { room, recipients, text } => {
                tracing::debug!(room, recipients = recipients.len(), "broadcast");
                let outbound = state.outbound.read().await;
                for connection_id in recipients {
                    match outbound.get(&connection_id) {
                        Some(tx) => {
                            if tx.send(Message::Text(text.clone().into())).is_err() {
                                tracing::warn!(connection_id, "recipient channel closed, skipping");
                            }
                        },
                        None => {
                            tracing::warn!(connection_id, "recipient has no outbound channel");
                        },
                    }
                }
            },

            ServerAction::CloseConnection { connection_id, reason } => {
                tracing::info!(connection_id, reason, "closing connection");
                let mut outbound = state.outbound.write().await;
                if let Some(tx) = outbound.remove(&connection_id) {
                    let _ = tx.send(Message::Close(None));
                }
            },
        }
    }
}

/// Deliver one text line to one connection, best-effort.
async fn send_to(state: &SharedState, connection_id: ConnectionId, text: String) {
    let outbound = state.outbound.read().await;
    if let Some(tx) = outbound.get(&connection_id) {
        if tx.send(Message::Text(text.into())).is_err() {
            tracing::warn!(connection_id, "connection channel closed");
        }
    }
}
