//! Connection registry for live sessions and their current room.
//!
//! The registry is the authoritative store of live connections. For each it
//! keeps the optional display name supplied on join and the connection's
//! current room — the inverse index of the broadcaster's room → members map,
//! used for O(1) cleanup on leave and disconnect.
//!
//! The registry has no side effects beyond its own state; it never
//! broadcasts.

use std::collections::HashMap;

use crate::error::RegistryError;

/// Stable identity for one live connection, assigned by the transport layer
/// at connect time.
pub type ConnectionId = u64;

/// Per-connection record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Display name supplied by the client on join. Overwritable, no
    /// uniqueness constraint.
    pub display_name: Option<String>,
    /// Current room. Unset until a join succeeds; a connection is in at
    /// most one room at any instant.
    pub room: Option<String>,
}

/// Registry of live connections and each one's current room.
///
/// Sole writer of the connection → room inverse index. Room member sets are
/// owned by the broadcaster; the two always agree (see crate docs).
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// Connection ID → connection record
    connections: HashMap<ConnectionId, ConnectionInfo>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection with no room and no display name.
    ///
    /// Fails with [`RegistryError::DuplicateConnection`] if the ID is
    /// already registered. Should not occur given transport guarantees.
    pub fn register(&mut self, connection_id: ConnectionId) -> Result<(), RegistryError> {
        if self.connections.contains_key(&connection_id) {
            return Err(RegistryError::DuplicateConnection(connection_id));
        }
        self.connections.insert(connection_id, ConnectionInfo::default());
        Ok(())
    }

    /// Remove a connection record and return its last room.
    ///
    /// The hook invoked on transport disconnect; the returned room lets the
    /// caller clean up room membership.
    pub fn unregister(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Option<String>, RegistryError> {
        let info = self
            .connections
            .remove(&connection_id)
            .ok_or(RegistryError::UnknownConnection(connection_id))?;
        Ok(info.room)
    }

    /// Update a connection's current room.
    pub fn set_room(
        &mut self,
        connection_id: ConnectionId,
        room: Option<String>,
    ) -> Result<(), RegistryError> {
        let info = self
            .connections
            .get_mut(&connection_id)
            .ok_or(RegistryError::UnknownConnection(connection_id))?;
        info.room = room;
        Ok(())
    }

    /// A connection's current room. `None` if it has not joined one.
    pub fn room(&self, connection_id: ConnectionId) -> Result<Option<&str>, RegistryError> {
        let info = self
            .connections
            .get(&connection_id)
            .ok_or(RegistryError::UnknownConnection(connection_id))?;
        Ok(info.room.as_deref())
    }

    /// Store the display name used in broadcast text.
    pub fn set_display_name(
        &mut self,
        connection_id: ConnectionId,
        name: String,
    ) -> Result<(), RegistryError> {
        let info = self
            .connections
            .get_mut(&connection_id)
            .ok_or(RegistryError::UnknownConnection(connection_id))?;
        info.display_name = Some(name);
        Ok(())
    }

    /// A connection's display name. `None` if it has never joined.
    pub fn display_name(
        &self,
        connection_id: ConnectionId,
    ) -> Result<Option<&str>, RegistryError> {
        let info = self
            .connections
            .get(&connection_id)
            .ok_or(RegistryError::UnknownConnection(connection_id))?;
        Ok(info.display_name.as_deref())
    }

    /// Check if a connection is registered.
    pub fn has_connection(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Total number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// All registered connection IDs.
    pub fn connection_ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.connections.keys().copied()
    }
}
