//! Room membership and broadcast fan-out.
//!
//! [`RoomBroadcaster`] implements the three protocol operations — join,
//! message, leave — plus the disconnect hook. Each operation mutates
//! membership and/or produces [`Broadcast`] values for the caller to
//! deliver; the broadcaster itself never touches a socket.
//!
//! Rooms are created implicitly on the first join referencing their name and
//! garbage-collected the moment their member set empties. A connection is in
//! at most one room: joining a different room runs the full leave sequence
//! for the old room first.

use std::collections::{HashMap, HashSet};

use crate::{
    error::BroadcastError,
    registry::{ConnectionId, ConnectionRegistry},
};

/// One outbound delivery produced by a protocol operation.
///
/// The recipient set is snapshotted at the instant the operation mutated
/// membership, so a leave never addresses the leaver and a join always
/// addresses the joiner. Recipients are sorted by connection ID for
/// deterministic fan-out order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    /// Room the broadcast is addressed to.
    pub room: String,
    /// Members of the room at the instant of sending.
    pub recipients: Vec<ConnectionId>,
    /// Text payload delivered to every recipient.
    pub text: String,
}

/// Room membership and broadcast engine.
///
/// Owns the room name → member-set map and the [`ConnectionRegistry`]
/// holding the inverse index. All mutation funnels through the operations
/// below; the two maps agree at every return point: a connection's current
/// room is set iff it appears in exactly that room's member set.
#[derive(Debug, Default)]
pub struct RoomBroadcaster {
    /// Live connections and their current room
    registry: ConnectionRegistry,
    /// Room name → set of member connection IDs
    rooms: HashMap<String, HashSet<ConnectionId>>,
}

impl RoomBroadcaster {
    /// Create a new broadcaster with no connections and no rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying connection registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Register a newly connected session with no room and no display name.
    pub fn register(&mut self, connection_id: ConnectionId) -> Result<(), BroadcastError> {
        self.registry.register(connection_id)?;
        Ok(())
    }

    /// Join a room, announcing the arrival to every member including the
    /// joiner.
    ///
    /// If the connection is already in a *different* room, the leave
    /// sequence for that room runs first (with its own notice to the old
    /// room's remaining members). Re-joining the current room performs no
    /// leave; the membership insert is a no-op but the announcement fires
    /// again.
    ///
    /// Returns the produced broadcasts in delivery order.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        room: &str,
        display_name: &str,
    ) -> Result<Vec<Broadcast>, BroadcastError> {
        if room.is_empty() {
            return Err(BroadcastError::InvalidRoomName);
        }

        let current = self.registry.room(connection_id)?.map(str::to_owned);

        let mut broadcasts = Vec::new();
        if let Some(current) = current {
            if current != room {
                broadcasts.extend(self.leave(connection_id)?);
            }
        }

        self.registry
            .set_display_name(connection_id, display_name.to_owned())?;
        self.rooms
            .entry(room.to_owned())
            .or_default()
            .insert(connection_id);
        self.registry.set_room(connection_id, Some(room.to_owned()))?;

        broadcasts.push(self.broadcast_to(room, format!("{display_name} has joined the room {room}.")));
        Ok(broadcasts)
    }

    /// Broadcast a text message to every member of the sender's current
    /// room, including the sender. No membership mutation.
    pub fn message(
        &self,
        connection_id: ConnectionId,
        text: &str,
    ) -> Result<Broadcast, BroadcastError> {
        let room = self
            .registry
            .room(connection_id)?
            .ok_or(BroadcastError::NotInRoom(connection_id))?
            .to_owned();
        let name = self.display_name_of(connection_id)?;

        Ok(self.broadcast_to(&room, format!("{name}: {text}")))
    }

    /// Leave the current room, announcing the departure to the remaining
    /// members.
    ///
    /// The leaver is removed from the member set before the broadcast is
    /// built, so it never receives its own leave notice. If the member set
    /// empties, the room entry is dropped. Leaving while in no room is a
    /// safe no-op: `Ok(None)`, no broadcast.
    pub fn leave(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Option<Broadcast>, BroadcastError> {
        let Some(room) = self.registry.room(connection_id)?.map(str::to_owned) else {
            return Ok(None);
        };
        let name = self.display_name_of(connection_id)?;

        if let Some(members) = self.rooms.get_mut(&room) {
            members.remove(&connection_id);
            if members.is_empty() {
                self.rooms.remove(&room);
            }
        }
        self.registry.set_room(connection_id, None)?;

        Ok(Some(self.broadcast_to(&room, format!("{name} has left the room {room}."))))
    }

    /// Transport disconnect hook: the leave sequence for the last-known
    /// room, then the connection record is destroyed.
    pub fn disconnect(
        &mut self,
        connection_id: ConnectionId,
    ) -> Result<Option<Broadcast>, BroadcastError> {
        let broadcast = self.leave(connection_id)?;
        self.registry.unregister(connection_id)?;
        Ok(broadcast)
    }

    /// Check if a room currently exists (has at least one member).
    pub fn has_room(&self, room: &str) -> bool {
        self.rooms.contains_key(room)
    }

    /// Names of all rooms that currently exist.
    pub fn rooms(&self) -> impl Iterator<Item = &str> {
        self.rooms.keys().map(String::as_str)
    }

    /// Number of rooms that currently exist.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Current members of a room. Empty for a room that does not exist.
    pub fn members(&self, room: &str) -> impl Iterator<Item = ConnectionId> {
        self.rooms.get(room).into_iter().flatten().copied()
    }

    /// Number of members in a room.
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    /// Snapshot the room's member set into a broadcast.
    fn broadcast_to(&self, room: &str, text: String) -> Broadcast {
        let mut recipients: Vec<ConnectionId> = self.members(room).collect();
        recipients.sort_unstable();
        Broadcast { room: room.to_owned(), recipients, text }
    }

    /// Display name for broadcast text. A connection inside a room always
    /// joined with a name; the empty fallback only applies to connections
    /// that never joined.
    fn display_name_of(&self, connection_id: ConnectionId) -> Result<String, BroadcastError> {
        Ok(self
            .registry
            .display_name(connection_id)?
            .unwrap_or_default()
            .to_owned())
    }
}
