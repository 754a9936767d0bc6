//! # Per-tick Updates
//!
//! The authority records what changed during a tick and ships it as one
//! [`UpdateBatch`]. Records are keyed by [`GameUpdateType`] and carry full
//! entity state (not field diffs), so a replica only needs the latest record
//! per entity to be consistent.
//!
//! Batches are numbered by the tick that produced them. A replica at tick `n`
//! accepts exactly batch `n` next and is at tick `n + 1` afterwards.

use serde::{Deserialize, Serialize};

use crate::ids::{ClientId, PlayerId, UnitId};
use crate::math::TileRef;
use crate::types::{PlayerType, UnitType};

/// Key of an update stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GameUpdateType {
    /// Unit created, moved, captured or deactivated.
    Unit,
    /// Player created or changed.
    Player,
    /// Tile ownership changed.
    Tile,
    /// Alliance or alliance request changed.
    Alliance,
}

/// Full state of one unit after the tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "camelCase")]
pub struct UnitUpdate {
    /// Stable unit id.
    pub id: UnitId,
    /// Kind of unit.
    pub unit_type: UnitType,
    /// Current owner.
    pub owner: PlayerId,
    /// Carried troops (transport ships), zero otherwise.
    pub troops: u32,
    /// Current tile.
    pub tile: TileRef,
    /// Tile before the latest move.
    pub last_tile: TileRef,
    /// `false` once the unit is destroyed; never flips back.
    pub is_active: bool,
}

/// Full state of one player after the tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct PlayerUpdate {
    /// Player id.
    pub id: PlayerId,
    /// Compact id used on tiles.
    #[serde(rename = "smallID")]
    pub small_id: u16,
    /// Display name.
    pub name: String,
    /// Controller kind.
    #[serde(rename = "playerType")]
    pub player_type: PlayerType,
    /// Controlling client, if any.
    #[serde(rename = "clientID")]
    pub client_id: Option<ClientId>,
    /// Troops at home.
    pub troops: u32,
    /// Gold balance.
    pub gold: u64,
    /// Number of tiles owned.
    #[serde(rename = "tilesOwned")]
    pub tiles_owned: u32,
    /// Whether the player is still in the game.
    #[serde(rename = "isAlive")]
    pub is_alive: bool,
}

/// New owner of one tile (`0` = unclaimed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileUpdate {
    /// Tile index.
    pub tile: TileRef,
    /// Owner small id.
    pub owner: u16,
}

/// Alliance lifecycle events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AllianceUpdate {
    /// A request is now pending.
    RequestCreated {
        /// Asking player.
        requestor: PlayerId,
        /// Asked player.
        recipient: PlayerId,
    },
    /// A pending request was answered.
    RequestReplied {
        /// Asking player.
        requestor: PlayerId,
        /// Asked player.
        recipient: PlayerId,
        /// The answer.
        accepted: bool,
    },
    /// A pending request timed out.
    RequestExpired {
        /// Asking player.
        requestor: PlayerId,
        /// Asked player.
        recipient: PlayerId,
    },
    /// Two players are now allied.
    AllianceFormed {
        /// Lower player id.
        a: PlayerId,
        /// Higher player id.
        b: PlayerId,
    },
    /// An alliance ended.
    AllianceBroken {
        /// Player who broke it.
        breaker: PlayerId,
        /// Former ally.
        other: PlayerId,
    },
}

/// Everything that changed in one tick, keyed by update type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameUpdates {
    /// Unit records, ascending by id.
    #[serde(rename = "Unit", default, skip_serializing_if = "Vec::is_empty")]
    pub units: Vec<UnitUpdate>,
    /// Player records, ascending by small id.
    #[serde(rename = "Player", default, skip_serializing_if = "Vec::is_empty")]
    pub players: Vec<PlayerUpdate>,
    /// Tile ownership changes, ascending by tile.
    #[serde(rename = "Tile", default, skip_serializing_if = "Vec::is_empty")]
    pub tiles: Vec<TileUpdate>,
    /// Alliance events, in the order they happened.
    #[serde(rename = "Alliance", default, skip_serializing_if = "Vec::is_empty")]
    pub alliances: Vec<AllianceUpdate>,
}

impl GameUpdates {
    /// True when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
            && self.players.is_empty()
            && self.tiles.is_empty()
            && self.alliances.is_empty()
    }

    /// Number of records of one kind.
    #[must_use]
    pub fn count(&self, kind: GameUpdateType) -> usize {
        match kind {
            GameUpdateType::Unit => self.units.len(),
            GameUpdateType::Player => self.players.len(),
            GameUpdateType::Tile => self.tiles.len(),
            GameUpdateType::Alliance => self.alliances.len(),
        }
    }
}

/// One tick's worth of updates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBatch {
    /// Tick that produced these updates.
    pub tick: u64,
    /// The updates.
    pub updates: GameUpdates,
}
