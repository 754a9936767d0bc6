//! Player state.

use std::collections::BTreeSet;

use frontier_shared::{ClientId, PlayerId, PlayerType, PlayerUpdate, TileRef, UnitId};

/// A participant in the game. Never removed once created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    pub(crate) id: PlayerId,
    pub(crate) small_id: u16,
    pub(crate) client_id: Option<ClientId>,
    pub(crate) name: String,
    pub(crate) player_type: PlayerType,
    pub(crate) troops: u32,
    pub(crate) gold: u64,
    pub(crate) tiles: BTreeSet<TileRef>,
    pub(crate) units: BTreeSet<UnitId>,
    pub(crate) alive: bool,
    pub(crate) spawn_tile: Option<TileRef>,
}

impl Player {
    /// Player id.
    #[must_use]
    pub const fn id(&self) -> &PlayerId {
        &self.id
    }

    /// Compact id written on owned tiles.
    #[must_use]
    pub const fn small_id(&self) -> u16 {
        self.small_id
    }

    /// Controlling client; `None` for server-side bots.
    #[must_use]
    pub const fn client_id(&self) -> Option<&ClientId> {
        self.client_id.as_ref()
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Controller kind.
    #[must_use]
    pub const fn player_type(&self) -> PlayerType {
        self.player_type
    }

    /// Troops at home.
    #[must_use]
    pub const fn troops(&self) -> u32 {
        self.troops
    }

    /// Gold balance.
    #[must_use]
    pub const fn gold(&self) -> u64 {
        self.gold
    }

    /// Owned tiles, ascending.
    #[must_use]
    pub const fn tiles(&self) -> &BTreeSet<TileRef> {
        &self.tiles
    }

    /// Number of owned tiles.
    #[must_use]
    pub fn tiles_owned(&self) -> u32 {
        u32::try_from(self.tiles.len()).unwrap_or(u32::MAX)
    }

    /// Units currently owned (active or not), ascending.
    #[must_use]
    pub const fn units(&self) -> &BTreeSet<UnitId> {
        &self.units
    }

    /// Whether the player is still in the game.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.alive
    }

    /// Tile the player spawned on.
    #[must_use]
    pub const fn spawn_tile(&self) -> Option<TileRef> {
        self.spawn_tile
    }

    /// Whether `client` may act for this player.
    #[must_use]
    pub fn is_controlled_by(&self, client: &ClientId) -> bool {
        self.client_id.as_ref() == Some(client)
    }

    /// Wire record of this player.
    #[must_use]
    pub fn to_update(&self) -> PlayerUpdate {
        PlayerUpdate {
            id: self.id.clone(),
            small_id: self.small_id,
            name: self.name.clone(),
            player_type: self.player_type,
            client_id: self.client_id.clone(),
            troops: self.troops,
            gold: self.gold,
            tiles_owned: self.tiles_owned(),
            is_alive: self.alive,
        }
    }

    pub(crate) fn add_troops(&mut self, amount: u32) {
        self.troops = self.troops.saturating_add(amount);
    }

    /// Removes up to `amount` troops and returns how many were removed.
    pub(crate) fn take_troops(&mut self, amount: u32) -> u32 {
        let taken = amount.min(self.troops);
        self.troops -= taken;
        taken
    }

    pub(crate) fn add_gold(&mut self, amount: u64) {
        self.gold = self.gold.saturating_add(amount);
    }

    pub(crate) fn spend_gold(&mut self, amount: u64) -> bool {
        if self.gold < amount {
            return false;
        }
        self.gold -= amount;
        true
    }
}
