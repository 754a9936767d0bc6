//! Network protocol envelopes shared between client and server.
//!
//! These types are serialized as JSON text and discriminated by `type`.
//! Both client and server must agree on these definitions.

use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::ids::{ClientId, GameId};
use crate::intent::ClientIntentMessage;
use crate::snapshot::WorldSnapshot;
use crate::updates::UpdateBatch;

/// Client → server message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// A player intent.
    Intent(ClientIntentMessage),
    /// Subscribe to a game; answered with a snapshot.
    Join {
        /// Joining client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Game to join.
        #[serde(rename = "gameID")]
        game_id: GameId,
    },
    /// Ask for a fresh snapshot after a gap or a reconnect.
    SnapshotRequest {
        /// Requesting client.
        #[serde(rename = "clientID")]
        client_id: ClientId,
        /// Game to resync.
        #[serde(rename = "gameID")]
        game_id: GameId,
    },
}

impl ClientMessage {
    /// Parses and validates one inbound text frame.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Malformed`] for bad JSON or a shape mismatch, otherwise
    /// the first validation failure.
    pub fn parse(text: &str) -> SchemaResult<Self> {
        let message: Self = serde_json::from_str(text)?;
        message.validate()?;
        Ok(message)
    }

    /// Validates an already-decoded message.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn validate(&self) -> SchemaResult<()> {
        match self {
            Self::Intent(msg) => msg.validate(),
            Self::Join { client_id, game_id } | Self::SnapshotRequest { client_id, game_id } => {
                if client_id.as_str().is_empty() {
                    return Err(SchemaError::invalid("clientID", "must not be empty"));
                }
                if game_id.as_str().is_empty() {
                    return Err(SchemaError::invalid("gameID", "must not be empty"));
                }
                Ok(())
            }
        }
    }

    /// Sender of the message.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        match self {
            Self::Intent(msg) => &msg.client_id,
            Self::Join { client_id, .. } | Self::SnapshotRequest { client_id, .. } => client_id,
        }
    }

    /// Game the message is addressed to.
    #[must_use]
    pub const fn game_id(&self) -> &GameId {
        match self {
            Self::Intent(msg) => &msg.game_id,
            Self::Join { game_id, .. } | Self::SnapshotRequest { game_id, .. } => game_id,
        }
    }
}

/// Server → client message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Full state; replaces whatever the replica held.
    Snapshot {
        /// Game the snapshot belongs to.
        #[serde(rename = "gameID")]
        game_id: GameId,
        /// The state.
        snapshot: WorldSnapshot,
    },
    /// One tick of updates.
    Turn {
        /// Game the batch belongs to.
        #[serde(rename = "gameID")]
        game_id: GameId,
        /// The batch.
        batch: UpdateBatch,
    },
    /// A message from this client was rejected.
    Error {
        /// Why.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Intent, SpawnIntent};
    use crate::types::PlayerType;

    #[test]
    fn test_intent_envelope_shape() {
        let msg = ClientMessage::Intent(ClientIntentMessage::new(
            "g1".into(),
            Intent::Spawn(SpawnIntent {
                client_id: "c1".into(),
                player_id: "P1".into(),
                name: "Ada".into(),
                player_type: PlayerType::Human,
                x: 10,
                y: 10,
            }),
        ));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "intent");
        assert_eq!(json["clientID"], "c1");
        assert_eq!(json["gameID"], "g1");
        assert_eq!(json["intent"]["type"], "spawn");
        assert_eq!(json["intent"]["playerID"], "P1");

        let text = json.to_string();
        assert_eq!(ClientMessage::parse(&text).unwrap(), msg);
    }

    #[test]
    fn test_join_parses() {
        let msg = ClientMessage::parse(r#"{"type":"join","clientID":"c1","gameID":"g1"}"#).unwrap();
        assert_eq!(msg.client_id().as_str(), "c1");
        assert_eq!(msg.game_id().as_str(), "g1");
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(ClientMessage::parse("not json"), Err(SchemaError::Malformed(_))));
        assert!(matches!(
            ClientMessage::parse(r#"{"type":"join","clientID":"c1"}"#),
            Err(SchemaError::Malformed(_))
        ));
    }

    #[test]
    fn test_server_error_shape() {
        let json = serde_json::to_string(&ServerMessage::Error { message: "nope".into() }).unwrap();
        assert_eq!(json, r#"{"type":"error","message":"nope"}"#);
    }
}
