//! Server driver.
//!
//! Ties the transport layer to the core: inbound [`ServerEvent`]s (accepted,
//! event received, closed) go in, executable [`ServerAction`]s come out. The
//! driver owns the [`RoomBroadcaster`] and is the only code that calls it;
//! the core itself has no knowledge of the transport's event names.
//!
//! Error policy: client-fault errors (empty room name, message with no
//! room) are answered to the offending connection and reject only that
//! operation; registry desynchronization errors are returned as
//! [`DriverError`] for the runtime to log, never silently dropped.

use roomcast_core::{Broadcast, BroadcastError, ConnectionId, RoomBroadcaster};

use crate::{error::DriverError, protocol::ClientEvent};

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Maximum concurrent connections. Connections beyond the limit are
    /// refused at accept time.
    pub max_connections: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Events the driver processes, produced by the transport runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A new connection was accepted by the transport.
    ConnectionAccepted {
        /// Connection ID assigned by the transport.
        connection_id: ConnectionId,
    },

    /// A decoded client event arrived on a connection.
    EventReceived {
        /// Connection that sent the event.
        connection_id: ConnectionId,
        /// The decoded event.
        event: ClientEvent,
    },

    /// A connection was closed (by peer or error). Triggers the implicit
    /// leave sequence.
    ConnectionClosed {
        /// Connection that was closed.
        connection_id: ConnectionId,
        /// Reason for closure.
        reason: String,
    },
}

/// Actions the driver produces, executed by the transport runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Deliver a text line to one connection.
    SendToConnection {
        /// Target connection.
        connection_id: ConnectionId,
        /// Text to deliver.
        text: String,
    },

    /// Deliver a text line to every listed recipient. Per-recipient and
    /// best-effort: one failed delivery must not affect the others.
    Broadcast {
        /// Room the broadcast is addressed to.
        room: String,
        /// Members of the room at the instant the broadcast was produced.
        recipients: Vec<ConnectionId>,
        /// Text to deliver.
        text: String,
    },

    /// Drop a connection.
    CloseConnection {
        /// Connection to close.
        connection_id: ConnectionId,
        /// Reason for closure.
        reason: String,
    },
}

/// Action-based server driver.
///
/// One instance per process owns all membership state; every mutation
/// funnels through [`ServerDriver::process_event`].
#[derive(Debug, Default)]
pub struct ServerDriver {
    /// Membership and broadcast engine
    broadcaster: RoomBroadcaster,
    /// Driver configuration
    config: DriverConfig,
}

impl ServerDriver {
    /// Create a new server driver.
    pub fn new(config: DriverConfig) -> Self {
        Self { broadcaster: RoomBroadcaster::new(), config }
    }

    /// Process a server event and return the actions to execute.
    ///
    /// This is the only entry point for mutating membership state.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, DriverError> {
        let connection_id = match &event {
            ServerEvent::ConnectionAccepted { connection_id }
            | ServerEvent::EventReceived { connection_id, .. }
            | ServerEvent::ConnectionClosed { connection_id, .. } => *connection_id,
        };

        let result = match event {
            ServerEvent::ConnectionAccepted { connection_id } => {
                return self.handle_connection_accepted(connection_id);
            },
            ServerEvent::EventReceived { connection_id, event } => {
                self.handle_event_received(connection_id, event)
            },
            ServerEvent::ConnectionClosed { connection_id, reason } => {
                return self.handle_connection_closed(connection_id, &reason);
            },
        };

        match result {
            Ok(actions) => Ok(actions),
            Err(BroadcastError::Registry(err)) => Err(DriverError::Registry(err)),
            Err(err) => {
                tracing::warn!(connection_id, %err, "rejected client event");
                Ok(vec![ServerAction::SendToConnection {
                    connection_id,
                    text: format!("error: {err}"),
                }])
            },
        }
    }

    /// Handle a new connection being accepted.
    fn handle_connection_accepted(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if self.broadcaster.registry().connection_count() >= self.config.max_connections {
            tracing::warn!(connection_id, "connection limit reached, refusing");
            return Ok(vec![ServerAction::CloseConnection {
                connection_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        match self.broadcaster.register(connection_id) {
            Ok(()) => {
                tracing::debug!(connection_id, "connection accepted");
                Ok(Vec::new())
            },
            Err(BroadcastError::Registry(err)) => Err(DriverError::Registry(err)),
            // register only touches the registry
            Err(err) => {
                tracing::error!(connection_id, %err, "unexpected register failure");
                Ok(Vec::new())
            },
        }
    }

    /// Dispatch a decoded client event to the matching core operation.
    fn handle_event_received(
        &mut self,
        connection_id: ConnectionId,
        event: ClientEvent,
    ) -> Result<Vec<ServerAction>, BroadcastError> {
        match event {
            ClientEvent::Join { username, room } => {
                let broadcasts = self.broadcaster.join(connection_id, &room, &username)?;
                Ok(broadcasts.into_iter().map(broadcast_action).collect())
            },
            ClientEvent::Message { message } => {
                let broadcast = self.broadcaster.message(connection_id, &message)?;
                Ok(vec![broadcast_action(broadcast)])
            },
            ClientEvent::Leave => {
                let broadcast = self.broadcaster.leave(connection_id)?;
                Ok(broadcast.into_iter().map(broadcast_action).collect())
            },
        }
    }

    /// Handle a connection being closed: the implicit leave, then the
    /// connection record is destroyed.
    fn handle_connection_closed(
        &mut self,
        connection_id: ConnectionId,
        reason: &str,
    ) -> Result<Vec<ServerAction>, DriverError> {
        if !self.broadcaster.registry().has_connection(connection_id) {
            // A connection refused at the limit closes without ever
            // registering.
            tracing::debug!(connection_id, "close for unregistered connection");
            return Ok(Vec::new());
        }

        match self.broadcaster.disconnect(connection_id) {
            Ok(broadcast) => {
                tracing::info!(connection_id, reason, "connection closed");
                Ok(broadcast.into_iter().map(broadcast_action).collect())
            },
            Err(BroadcastError::Registry(err)) => Err(DriverError::Registry(err)),
            // disconnect only leaves and unregisters
            Err(err) => {
                tracing::error!(connection_id, %err, "unexpected disconnect failure");
                Ok(Vec::new())
            },
        }
    }

    /// Membership and broadcast state, for inspection.
    pub fn broadcaster(&self) -> &RoomBroadcaster {
        &self.broadcaster
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.broadcaster.registry().connection_count()
    }
}

/// Lift a core broadcast into an executable action.
fn broadcast_action(broadcast: Broadcast) -> ServerAction {
    let Broadcast { room, recipients, text } = broadcast;
    ServerAction::Broadcast { room, recipients, text }
}
