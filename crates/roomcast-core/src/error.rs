//! Error types for the roomcast core.
//!
//! Strongly-typed errors per component: registry errors (connection
//! bookkeeping) and broadcaster errors (protocol operations). Registry errors
//! signal a transport/registry desynchronization and must be surfaced to the
//! caller; broadcaster errors reject only the offending operation.

use thiserror::Error;

use crate::registry::ConnectionId;

/// Errors from [`crate::ConnectionRegistry`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Connection ID is already registered.
    ///
    /// Should not occur given transport guarantees (the transport assigns
    /// fresh IDs); indicates a bug in the edge layer.
    #[error("connection already registered: {0}")]
    DuplicateConnection(ConnectionId),

    /// Operation referenced a connection ID that is not registered.
    ///
    /// Signals that the transport and the registry disagree about which
    /// connections are alive. Never silently dropped.
    #[error("unknown connection: {0}")]
    UnknownConnection(ConnectionId),
}

/// Errors from [`crate::RoomBroadcaster`] protocol operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// Underlying registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Join was given an empty room name. Rejected before any mutation.
    #[error("invalid room name: room names must be non-empty")]
    InvalidRoomName,

    /// Message sent by a connection with no current room.
    #[error("connection {0} is not in a room")]
    NotInRoom(ConnectionId),
}
