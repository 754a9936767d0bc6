//! # Intents
//!
//! Player-originated requests to change world state, exactly as they travel
//! client → server inside a [`ClientIntentMessage`].
//!
//! ## Explicit nulls
//!
//! Fields such as `troops` or `sourceX` on an attack are *required but
//! nullable*: the key must be present, `null` is a meaningful value
//! ("let the server decide"). They use [`nullable`] so that serde reports a
//! missing key instead of silently defaulting it to `None`, and they
//! serialize back as an explicit `null`.
//!
//! ```text
//! {"type":"attack","clientID":"c1","attackerID":"P1","targetID":"P2",
//!  "troops":null,"sourceX":null,"sourceY":null,"targetX":null,"targetY":null}
//! ```

use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{MAX_ID_LEN, MAX_NAME_LEN};
use crate::error::{SchemaError, SchemaResult};
use crate::ids::{ClientId, GameId, PlayerId};
use crate::math::Cell;
use crate::types::{PlayerType, UnitType};

/// Deserializes a field that must be present but may be `null`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// Intent discriminator, for logging and dispatch tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentKind {
    /// Claim a starting position.
    Spawn,
    /// Ground attack.
    Attack,
    /// Naval landing.
    Boat,
    /// Ask another player for an alliance.
    AllianceRequest,
    /// Answer an alliance request.
    AllianceRequestReply,
    /// End an alliance.
    BreakAlliance,
    /// Construct a structure.
    BuildUnit,
}

/// A player-originated request, discriminated by `type`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Intent {
    /// Claim a starting position (spawn phase only).
    Spawn(SpawnIntent),
    /// Ground attack against a neighbour.
    Attack(AttackIntent),
    /// Ship troops to a coastal tile.
    Boat(BoatIntent),
    /// Ask for an alliance.
    AllianceRequest(AllianceRequestIntent),
    /// Accept or reject a pending alliance request.
    AllianceRequestReply(AllianceReplyIntent),
    /// End an existing alliance.
    BreakAlliance(BreakAllianceIntent),
    /// Build a structure.
    BuildUnit(BuildUnitIntent),
}

/// `spawn{playerID, name, playerType, x, y}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnIntent {
    /// Sending client.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Player being created.
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Controller kind.
    #[serde(rename = "playerType")]
    pub player_type: PlayerType,
    /// Spawn column.
    pub x: i32,
    /// Spawn row.
    pub y: i32,
}

/// `attack{attackerID, targetID, troops, sourceX, sourceY, targetX, targetY}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackIntent {
    /// Sending client.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Attacking player.
    #[serde(rename = "attackerID")]
    pub attacker_id: PlayerId,
    /// Defender; `null` attacks unclaimed land.
    #[serde(rename = "targetID", deserialize_with = "nullable")]
    pub target_id: Option<PlayerId>,
    /// Committed troops; `null` lets the server pick its default share.
    #[serde(deserialize_with = "nullable")]
    pub troops: Option<u32>,
    /// Optional launch column.
    #[serde(rename = "sourceX", deserialize_with = "nullable")]
    pub source_x: Option<i32>,
    /// Optional launch row.
    #[serde(rename = "sourceY", deserialize_with = "nullable")]
    pub source_y: Option<i32>,
    /// Optional aim column.
    #[serde(rename = "targetX", deserialize_with = "nullable")]
    pub target_x: Option<i32>,
    /// Optional aim row.
    #[serde(rename = "targetY", deserialize_with = "nullable")]
    pub target_y: Option<i32>,
}

/// `boat{attackerID, targetID, troops, x, y}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatIntent {
    /// Sending client.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Player launching the boat.
    #[serde(rename = "attackerID")]
    pub attacker_id: PlayerId,
    /// Owner of the landing tile; `null` for unclaimed land.
    #[serde(rename = "targetID", deserialize_with = "nullable")]
    pub target_id: Option<PlayerId>,
    /// Troops carried.
    pub troops: u32,
    /// Landing column.
    pub x: i32,
    /// Landing row.
    pub y: i32,
}

/// `allianceRequest{requestor, recipient}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceRequestIntent {
    /// Sending client.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Asking player.
    pub requestor: PlayerId,
    /// Asked player.
    pub recipient: PlayerId,
}

/// `allianceRequestReply{requestor, recipient, accept}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllianceReplyIntent {
    /// Sending client (the recipient's).
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Player who asked.
    pub requestor: PlayerId,
    /// Player answering.
    pub recipient: PlayerId,
    /// Whether the alliance is accepted.
    pub accept: bool,
}

/// `breakAlliance{requestor, recipient}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakAllianceIntent {
    /// Sending client.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Player breaking the alliance.
    pub requestor: PlayerId,
    /// Former ally.
    pub recipient: PlayerId,
}

/// `buildUnit{playerID, unitType, x, y}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildUnitIntent {
    /// Sending client.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Building player.
    #[serde(rename = "playerID")]
    pub player_id: PlayerId,
    /// Structure to build.
    #[serde(rename = "unitType")]
    pub unit_type: UnitType,
    /// Site column.
    pub x: i32,
    /// Site row.
    pub y: i32,
}

/// `{type: "intent", clientID, gameID, intent}` without the outer tag, which
/// lives on [`crate::protocol::ClientMessage`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIntentMessage {
    /// Sending client.
    #[serde(rename = "clientID")]
    pub client_id: ClientId,
    /// Target game.
    #[serde(rename = "gameID")]
    pub game_id: GameId,
    /// The request itself.
    pub intent: Intent,
}

impl ClientIntentMessage {
    /// Wraps an intent for sending.
    #[must_use]
    pub fn new(game_id: GameId, intent: Intent) -> Self {
        Self {
            client_id: intent.client_id().clone(),
            game_id,
            intent,
        }
    }

    /// Checks envelope/payload agreement and the payload itself.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> SchemaResult<()> {
        check_id("clientID", self.client_id.as_str())?;
        check_id("gameID", self.game_id.as_str())?;
        if self.intent.client_id() != &self.client_id {
            return Err(SchemaError::ClientMismatch {
                envelope: self.client_id.to_string(),
                intent: self.intent.client_id().to_string(),
            });
        }
        self.intent.validate()
    }
}

impl Intent {
    /// Discriminator of this intent.
    #[must_use]
    pub const fn kind(&self) -> IntentKind {
        match self {
            Self::Spawn(_) => IntentKind::Spawn,
            Self::Attack(_) => IntentKind::Attack,
            Self::Boat(_) => IntentKind::Boat,
            Self::AllianceRequest(_) => IntentKind::AllianceRequest,
            Self::AllianceRequestReply(_) => IntentKind::AllianceRequestReply,
            Self::BreakAlliance(_) => IntentKind::BreakAlliance,
            Self::BuildUnit(_) => IntentKind::BuildUnit,
        }
    }

    /// Client that sent this intent.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        match self {
            Self::Spawn(i) => &i.client_id,
            Self::Attack(i) => &i.client_id,
            Self::Boat(i) => &i.client_id,
            Self::AllianceRequest(i) => &i.client_id,
            Self::AllianceRequestReply(i) => &i.client_id,
            Self::BreakAlliance(i) => &i.client_id,
            Self::BuildUnit(i) => &i.client_id,
        }
    }

    /// Player on whose behalf the intent acts.
    ///
    /// For a reply this is the recipient, since the recipient answers.
    #[must_use]
    pub const fn actor(&self) -> &PlayerId {
        match self {
            Self::Spawn(i) => &i.player_id,
            Self::Attack(i) => &i.attacker_id,
            Self::Boat(i) => &i.attacker_id,
            Self::AllianceRequest(i) => &i.requestor,
            Self::AllianceRequestReply(i) => &i.recipient,
            Self::BreakAlliance(i) => &i.requestor,
            Self::BuildUnit(i) => &i.player_id,
        }
    }

    /// Checks value-level rules the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> SchemaResult<()> {
        check_id("clientID", self.client_id().as_str())?;
        match self {
            Self::Spawn(i) => {
                check_id("playerID", i.player_id.as_str())?;
                let name = i.name.trim();
                if name.is_empty() {
                    return Err(SchemaError::invalid("name", "must not be blank"));
                }
                if name.chars().count() > MAX_NAME_LEN {
                    return Err(SchemaError::invalid(
                        "name",
                        format!("longer than {MAX_NAME_LEN} characters"),
                    ));
                }
                check_coord("x", i.x)?;
                check_coord("y", i.y)
            }
            Self::Attack(i) => {
                check_id("attackerID", i.attacker_id.as_str())?;
                if let Some(target) = &i.target_id {
                    check_id("targetID", target.as_str())?;
                    check_distinct("targetID", &i.attacker_id, target)?;
                }
                if i.troops == Some(0) {
                    return Err(SchemaError::invalid("troops", "must be positive or null"));
                }
                check_pair("sourceX", i.source_x, i.source_y)?;
                check_pair("targetX", i.target_x, i.target_y)
            }
            Self::Boat(i) => {
                check_id("attackerID", i.attacker_id.as_str())?;
                if let Some(target) = &i.target_id {
                    check_id("targetID", target.as_str())?;
                    check_distinct("targetID", &i.attacker_id, target)?;
                }
                if i.troops == 0 {
                    return Err(SchemaError::invalid("troops", "must be positive"));
                }
                check_coord("x", i.x)?;
                check_coord("y", i.y)
            }
            Self::AllianceRequest(AllianceRequestIntent { requestor, recipient, .. })
            | Self::BreakAlliance(BreakAllianceIntent { requestor, recipient, .. })
            | Self::AllianceRequestReply(AllianceReplyIntent { requestor, recipient, .. }) => {
                check_id("requestor", requestor.as_str())?;
                check_id("recipient", recipient.as_str())?;
                check_distinct("recipient", requestor, recipient)
            }
            Self::BuildUnit(i) => {
                check_id("playerID", i.player_id.as_str())?;
                check_coord("x", i.x)?;
                check_coord("y", i.y)
            }
        }
    }
}

impl AttackIntent {
    /// Launch cell, when both coordinates were given.
    #[must_use]
    pub fn source_cell(&self) -> Option<Cell> {
        Some(Cell::new(self.source_x?, self.source_y?))
    }

    /// Aim cell, when both coordinates were given.
    #[must_use]
    pub fn target_cell(&self) -> Option<Cell> {
        Some(Cell::new(self.target_x?, self.target_y?))
    }
}

fn check_id(field: &'static str, id: &str) -> SchemaResult<()> {
    if id.is_empty() {
        return Err(SchemaError::invalid(field, "must not be empty"));
    }
    if id.len() > MAX_ID_LEN {
        return Err(SchemaError::invalid(field, format!("longer than {MAX_ID_LEN} bytes")));
    }
    Ok(())
}

fn check_coord(field: &'static str, value: i32) -> SchemaResult<()> {
    if value < 0 {
        return Err(SchemaError::invalid(field, "must not be negative"));
    }
    Ok(())
}

fn check_pair(field: &'static str, x: Option<i32>, y: Option<i32>) -> SchemaResult<()> {
    match (x, y) {
        (None, None) => Ok(()),
        (Some(x), Some(y)) if x >= 0 && y >= 0 => Ok(()),
        (Some(_), Some(_)) => Err(SchemaError::invalid(field, "must not be negative")),
        _ => Err(SchemaError::invalid(field, "x and y must both be set or both be null")),
    }
}

fn check_distinct(field: &'static str, a: &PlayerId, b: &PlayerId) -> SchemaResult<()> {
    if a == b {
        return Err(SchemaError::invalid(field, "must differ from the acting player"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SchemaResult<Intent> {
        let intent: Intent = serde_json::from_str(json)?;
        intent.validate()?;
        Ok(intent)
    }

    #[test]
    fn test_attack_with_explicit_nulls() {
        let intent = parse(
            r#"{"type":"attack","clientID":"c1","attackerID":"P1","targetID":"P2",
                "troops":null,"sourceX":null,"sourceY":null,"targetX":null,"targetY":null}"#,
        )
        .unwrap();
        let Intent::Attack(attack) = intent else {
            panic!("expected attack");
        };
        assert_eq!(attack.target_id, Some(PlayerId::from("P2")));
        assert_eq!(attack.troops, None);
        assert_eq!(attack.source_cell(), None);
    }

    #[test]
    fn test_missing_nullable_field_is_rejected() {
        // `troops` omitted entirely: a null placeholder is required.
        let err = parse(
            r#"{"type":"attack","clientID":"c1","attackerID":"P1","targetID":"P2",
                "sourceX":null,"sourceY":null,"targetX":null,"targetY":null}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(msg) if msg.contains("troops")));
    }

    #[test]
    fn test_nulls_survive_serialization() {
        let intent = Intent::Attack(AttackIntent {
            client_id: "c1".into(),
            attacker_id: "P1".into(),
            target_id: None,
            troops: None,
            source_x: None,
            source_y: None,
            target_x: None,
            target_y: None,
        });
        let json = serde_json::to_string(&intent).unwrap();
        assert!(json.contains("\"troops\":null"));
        assert!(json.contains("\"targetID\":null"));
        assert_eq!(serde_json::from_str::<Intent>(&json).unwrap(), intent);
    }

    #[test]
    fn test_spawn_parses() {
        let intent = parse(
            r#"{"type":"spawn","clientID":"c1","playerID":"P1","name":"Ada",
                "playerType":"HUMAN","x":10,"y":10}"#,
        )
        .unwrap();
        assert_eq!(intent.kind(), IntentKind::Spawn);
        assert_eq!(intent.actor(), &PlayerId::from("P1"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(parse(r#"{"type":"teleport","clientID":"c1"}"#).is_err());
    }

    #[test]
    fn test_blank_name_rejected() {
        let err = parse(
            r#"{"type":"spawn","clientID":"c1","playerID":"P1","name":"  ",
                "playerType":"HUMAN","x":1,"y":1}"#,
        )
        .unwrap_err();
        assert_eq!(err, SchemaError::invalid("name", "must not be blank"));
    }

    #[test]
    fn test_self_alliance_rejected() {
        let err = parse(
            r#"{"type":"allianceRequest","clientID":"c1","requestor":"P1","recipient":"P1"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "recipient", .. }));
    }

    #[test]
    fn test_half_specified_source_rejected() {
        let err = parse(
            r#"{"type":"attack","clientID":"c1","attackerID":"P1","targetID":null,
                "troops":5,"sourceX":3,"sourceY":null,"targetX":null,"targetY":null}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { field: "sourceX", .. }));
    }

    #[test]
    fn test_envelope_client_mismatch() {
        let msg = ClientIntentMessage {
            client_id: "c1".into(),
            game_id: "g1".into(),
            intent: Intent::BreakAlliance(BreakAllianceIntent {
                client_id: "c2".into(),
                requestor: "P1".into(),
                recipient: "P2".into(),
            }),
        };
        assert!(matches!(msg.validate(), Err(SchemaError::ClientMismatch { .. })));
    }
}
