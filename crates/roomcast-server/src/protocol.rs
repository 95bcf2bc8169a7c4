//! Wire protocol for the WebSocket edge.
//!
//! Clients send JSON text frames tagged by an `event` field; the server
//! answers with plain text lines (chat messages and room notices carry no
//! structure beyond their text). Unknown fields in inbound events are
//! ignored, so clients that redundantly echo their username or room on every
//! event stay compatible.

use serde::Deserialize;

/// One decoded inbound client event.
///
/// The three protocol operations, as the client names them on the wire:
///
/// ```json
/// {"event": "join", "username": "alice", "room": "lobby"}
/// {"event": "message", "message": "hi"}
/// {"event": "leave"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ClientEvent {
    /// Join a named room under a display name.
    Join {
        /// Display name used in broadcast text.
        username: String,
        /// Room to join.
        room: String,
    },
    /// Broadcast a text message to the sender's current room.
    Message {
        /// Message text. May be empty; content validation is out of scope.
        message: String,
    },
    /// Leave the current room.
    Leave,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_join() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"join","username":"alice","room":"lobby"}"#).unwrap();
        assert_eq!(
            event,
            ClientEvent::Join { username: "alice".to_string(), room: "lobby".to_string() }
        );
    }

    #[test]
    fn decodes_message() {
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"message","message":"hi"}"#).unwrap();
        assert_eq!(event, ClientEvent::Message { message: "hi".to_string() });
    }

    #[test]
    fn decodes_leave() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"leave"}"#).unwrap();
        assert_eq!(event, ClientEvent::Leave);
    }

    #[test]
    fn ignores_redundant_fields() {
        // Clients that echo username/room on every event still decode.
        let event: ClientEvent = serde_json::from_str(
            r#"{"event":"message","username":"alice","room":"lobby","message":"hi"}"#,
        )
        .unwrap();
        assert_eq!(event, ClientEvent::Message { message: "hi".to_string() });
    }

    #[test]
    fn rejects_unknown_event() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"shout","message":"hi"}"#).is_err());
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"event":"join","username":"alice"}"#).is_err());
    }
}
