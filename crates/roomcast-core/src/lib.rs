//! Roomcast core: the room membership and broadcast engine.
//!
//! Clients attach a persistent connection, join a named room, exchange text
//! messages visible to all current members, and leave — explicitly or by
//! disconnecting. This crate is the engine behind that: it tracks which
//! connections belong to which rooms and produces the broadcasts each
//! protocol operation implies.
//!
//! # Architecture
//!
//! The crate is sans-IO. Operations are plain synchronous calls that mutate
//! in-memory state and return [`Broadcast`] values; an external transport
//! layer (see the `roomcast-server` crate) delivers them. The core knows
//! nothing about sockets, async runtimes, or the transport's event names.
//!
//! # Components
//!
//! - [`ConnectionRegistry`]: authoritative store of live connections, each
//!   one's display name and current room (at most one at a time).
//! - [`RoomBroadcaster`]: the room name → member-set map and the protocol
//!   operations — join, message, leave, and the disconnect hook.
//!
//! # Invariant
//!
//! The registry's connection → room field and the broadcaster's room →
//! member sets always agree: a connection's current room is set iff it
//! appears in exactly that room's member set, and in no other room's set.
//! Rooms exist only while non-empty.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod broadcaster;
mod error;
mod registry;

pub use broadcaster::{Broadcast, RoomBroadcaster};
pub use error::{BroadcastError, RegistryError};
pub use registry::{ConnectionId, ConnectionInfo, ConnectionRegistry};
