//! # World Model
//!
//! The authoritative state of one game: tile grid, players, units and
//! alliances. `Game` has no behaviour of its own; executions drive it
//! through the named mutators below, each of which keeps these invariants:
//!
//! - every unit's owner is a registered player, and a capture swaps owners
//!   inside one call
//! - a player has at most one active Capital and one active Enterprise; a
//!   capture that would give it a second one destroys the captured unit
//! - a tile's owner and the owner's tile set always agree
//! - units are never removed, only deactivated
//! - every mutation is marked in the [`UpdateRecorder`] so the tick's batch
//!   describes it
//!
//! Queries never mutate. Placement validation ([`Game::can_build`]) returns
//! `None` for "cannot build"; that is an expected answer, not an error.

mod alliance;
mod map;
mod player;
mod recorder;
mod unit;

pub use alliance::AllianceRegistry;
pub use map::{GameMap, UNOWNED};
pub use player::Player;
pub use recorder::UpdateRecorder;
pub use unit::{Unit, UnitArena};

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use frontier_shared::{
    AllianceUpdate, Cell, ClientId, PlayerId, PlayerType, TileRef, UnitId, UnitType, UpdateBatch,
    WorldSnapshot,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use siphasher::sip::SipHasher13;

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::exec::Execution;

/// Authoritative world state.
pub struct Game {
    config: GameConfig,
    map: GameMap,
    /// Indexed by `small_id - 1`.
    players: Vec<Player>,
    index: BTreeMap<PlayerId, u16>,
    units: UnitArena,
    alliances: AllianceRegistry,
    recorder: UpdateRecorder,
    rng: ChaCha8Rng,
    ticks: u64,
    queued: Vec<Box<dyn Execution>>,
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("ticks", &self.ticks)
            .field("players", &self.players.len())
            .field("units", &self.units.len())
            .field("queued", &self.queued.len())
            .finish_non_exhaustive()
    }
}

impl Game {
    /// Creates a fresh world from a config.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] if the config does not validate.
    pub fn new(config: GameConfig) -> GameResult<Self> {
        config.validate()?;
        let map = GameMap::from_config(&config.map)?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self {
            config,
            map,
            players: Vec::new(),
            index: BTreeMap::new(),
            units: UnitArena::new(),
            alliances: AllianceRegistry::default(),
            recorder: UpdateRecorder::default(),
            rng,
            ticks: 0,
            queued: Vec::new(),
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Tile grid.
    #[must_use]
    pub const fn map(&self) -> &GameMap {
        &self.map
    }

    /// Ticks completed so far; also the index of the tick in progress.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether the open spawn phase is still running.
    #[must_use]
    pub const fn in_spawn_phase(&self) -> bool {
        self.ticks < self.config.spawn_phase_ticks
    }

    /// Whether a player with this id exists.
    #[must_use]
    pub fn has_player(&self, id: &PlayerId) -> bool {
        self.index.contains_key(id)
    }

    /// Player by id.
    ///
    /// # Errors
    ///
    /// [`GameError::PlayerNotFound`] if absent.
    pub fn player(&self, id: &PlayerId) -> GameResult<&Player> {
        self.index
            .get(id)
            .and_then(|&small| self.player_by_small_id(small))
            .ok_or_else(|| GameError::PlayerNotFound(id.clone()))
    }

    /// Player by small id.
    #[must_use]
    pub fn player_by_small_id(&self, small_id: u16) -> Option<&Player> {
        self.players.get(usize::from(small_id).wrapping_sub(1))
    }

    /// Players in small-id order.
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Owner of a tile, if claimed.
    #[must_use]
    pub fn owner_of(&self, tile: TileRef) -> Option<&Player> {
        self.player_by_small_id(self.map.owner(tile))
    }

    /// Unit storage.
    #[must_use]
    pub const fn units(&self) -> &UnitArena {
        &self.units
    }

    /// Unit by id.
    ///
    /// # Errors
    ///
    /// [`GameError::UnitNotFound`] if the id was never allocated.
    pub fn unit(&self, id: UnitId) -> GameResult<&Unit> {
        self.units.get(id).ok_or(GameError::UnitNotFound(id))
    }

    /// Active units of a type owned by a player, ascending by id.
    pub fn active_units_of<'a>(
        &'a self,
        player: &'a Player,
        unit_type: UnitType,
    ) -> impl Iterator<Item = &'a Unit> + 'a {
        player
            .units()
            .iter()
            .filter_map(|&id| self.units.get(id))
            .filter(move |u| u.is_active() && u.unit_type() == unit_type)
    }

    /// Alliance state.
    #[must_use]
    pub const fn alliances(&self) -> &AllianceRegistry {
        &self.alliances
    }

    /// Whether two players are allied.
    #[must_use]
    pub fn is_allied(&self, a: &PlayerId, b: &PlayerId) -> bool {
        self.alliances.is_allied(a, b)
    }

    /// Validates placement of a new unit for `player` at `tile`.
    ///
    /// Returns the tile the unit would be placed on, or `None` if it cannot be
    /// built. Rules per type:
    ///
    /// - City: land tile the player owns, no other active city on it
    /// - Capital: at most one per player, on the player's active city
    /// - Enterprise: at most one per player, on the player's active capital
    /// - TransportShip: owned shore tile, below the per-player boat limit
    /// - Warship: owned shore tile
    /// - bombs: owned land tile
    ///
    /// Every type also needs a living player who can pay for it. Units that
    /// only other units spawn (shells, trade ships, warheads) are never
    /// buildable.
    #[must_use]
    pub fn can_build(&self, player: &PlayerId, unit_type: UnitType, tile: TileRef) -> Option<TileRef> {
        let p = self.player(player).ok()?;
        if !p.is_alive() || !self.map.contains(tile) || self.map.owner(tile) != p.small_id() {
            return None;
        }
        if p.gold() < self.config.economy.unit_cost(unit_type) {
            return None;
        }
        let mine_here = |t: UnitType| {
            self.units
                .at(tile)
                .any(|u| u.is_active() && u.unit_type() == t && u.owner() == player)
        };
        let ok = match unit_type {
            UnitType::City => {
                self.map.is_land(tile)
                    && !self
                        .units
                        .at(tile)
                        .any(|u| u.is_active() && u.unit_type() == UnitType::City)
            }
            UnitType::Capital => {
                self.active_units_of(p, UnitType::Capital).next().is_none()
                    && mine_here(UnitType::City)
            }
            UnitType::Enterprise => {
                self.active_units_of(p, UnitType::Enterprise).next().is_none()
                    && mine_here(UnitType::Capital)
            }
            UnitType::TransportShip => {
                let boats = self.active_units_of(p, UnitType::TransportShip).count();
                self.map.is_shore(tile) && boats < self.config.boats.max_per_player as usize
            }
            UnitType::Warship => self.map.is_shore(tile),
            UnitType::AtomBomb | UnitType::HydrogenBomb | UnitType::Mirv => self.map.is_land(tile),
            UnitType::TradeShip | UnitType::Shell | UnitType::MirvWarhead => false,
        };
        ok.then_some(tile)
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Builds a unit for `player`, charging its cost.
    ///
    /// Placement is re-validated here; callers normally pass the tile
    /// returned by [`Game::can_build`].
    ///
    /// # Errors
    ///
    /// [`GameError::CannotBuild`] if placement fails, or
    /// [`GameError::PlayerNotFound`].
    pub fn build_unit(
        &mut self,
        player: &PlayerId,
        unit_type: UnitType,
        troops: u32,
        tile: TileRef,
    ) -> GameResult<UnitId> {
        let tile = self
            .can_build(player, unit_type, tile)
            .ok_or(GameError::CannotBuild { unit_type, tile })?;
        let cost = self.config.economy.unit_cost(unit_type);
        let id = self
            .units
            .insert(unit_type, player.clone(), troops, tile, self.ticks);
        let p = self.player_mut(player)?;
        p.spend_gold(cost);
        p.units.insert(id);
        self.recorder.unit(id);
        Ok(id)
    }

    /// Creates a player, or moves an existing one while the spawn phase runs.
    ///
    /// Claims the spawn tile and unclaimed land within `map.spawn_radius`.
    /// Returns `true` if the player is new.
    ///
    /// # Errors
    ///
    /// - [`GameError::SpawnPhaseOver`] after the spawn phase
    /// - [`GameError::TileOutOfBounds`] for an off-map cell
    /// - [`GameError::InvalidSpawn`] for water or a tile someone else owns
    /// - [`GameError::Unauthorized`] if another client controls the player
    pub fn spawn_player(
        &mut self,
        client: Option<ClientId>,
        id: &PlayerId,
        name: &str,
        player_type: PlayerType,
        cell: Cell,
    ) -> GameResult<bool> {
        if !self.in_spawn_phase() {
            return Err(GameError::SpawnPhaseOver);
        }
        let tile = self.map.require_tile(cell)?;
        if !self.map.is_land(tile) {
            return Err(GameError::InvalidSpawn(format!("{cell} is water")));
        }
        let existing = self.index.get(id).copied();
        let tile_owner = self.map.owner(tile);
        if tile_owner != UNOWNED && Some(tile_owner) != existing {
            return Err(GameError::InvalidSpawn(format!("{cell} is already owned")));
        }

        let small = if let Some(small) = existing {
            if self.player(id)?.client_id != client {
                return Err(GameError::Unauthorized {
                    player: id.clone(),
                    client: client.unwrap_or_default(),
                });
            }
            let p = self.player_mut(id)?;
            p.name = name.to_owned();
            let released = std::mem::take(&mut p.tiles);
            for t in released {
                self.map.set_owner(t, UNOWNED);
                self.recorder.tile(t);
            }
            small
        } else {
            let small = u16::try_from(self.players.len() + 1)
                .map_err(|_| GameError::InvalidSpawn("player limit reached".into()))?;
            self.players.push(Player {
                id: id.clone(),
                small_id: small,
                client_id: client,
                name: name.to_owned(),
                player_type,
                troops: self.config.economy.starting_troops,
                gold: self.config.economy.starting_gold,
                tiles: BTreeSet::new(),
                units: BTreeSet::new(),
                alive: true,
                spawn_tile: None,
            });
            self.index.insert(id.clone(), small);
            small
        };

        let radius = i32::try_from(self.config.map.spawn_radius).unwrap_or(i32::MAX);
        let mut claimed = Vec::new();
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx.abs() + dy.abs() > radius {
                    continue;
                }
                let Some(t) = self.map.tile_at(Cell::new(cell.x + dx, cell.y + dy)) else {
                    continue;
                };
                if self.map.is_land(t) && self.map.owner(t) == UNOWNED {
                    self.map.set_owner(t, small);
                    self.recorder.tile(t);
                    claimed.push(t);
                }
            }
        }
        let p = self.player_mut(id)?;
        p.tiles.extend(claimed);
        p.spawn_tile = Some(tile);
        p.alive = true;
        Ok(existing.is_none())
    }

    /// Transfers a land tile to `player`, capturing structures standing on it.
    ///
    /// A captured Capital or Enterprise is destroyed instead when `player`
    /// already has an active one of that type.
    ///
    /// Returns `false` if nothing changed (water, or already owned).
    ///
    /// # Errors
    ///
    /// [`GameError::PlayerNotFound`] or [`GameError::TileOutOfBounds`].
    pub fn conquer(&mut self, player: &PlayerId, tile: TileRef) -> GameResult<bool> {
        let small = *self
            .index
            .get(player)
            .ok_or_else(|| GameError::PlayerNotFound(player.clone()))?;
        if !self.map.contains(tile) {
            let cell = self.map.cell(tile);
            return Err(GameError::TileOutOfBounds {
                x: cell.x,
                y: cell.y,
            });
        }
        let previous = self.map.owner(tile);
        if previous == small || !self.map.is_land(tile) {
            return Ok(false);
        }
        if let Some(loser) = self.players.get_mut(usize::from(previous).wrapping_sub(1)) {
            loser.tiles.remove(&tile);
            self.recorder.player(previous);
        }
        self.map.set_owner(tile, small);
        self.recorder.tile(tile);
        self.player_mut(player)?.tiles.insert(tile);

        let captured: Vec<UnitId> = self
            .units
            .at(tile)
            .filter(|u| u.is_active() && u.unit_type().is_structure() && u.owner() != player)
            .map(Unit::id)
            .collect();
        for id in captured {
            let Some(unit_type) = self.units.get(id).map(Unit::unit_type) else {
                continue;
            };
            if matches!(unit_type, UnitType::Capital | UnitType::Enterprise) {
                let conqueror = self.player(player)?;
                if self.active_units_of(conqueror, unit_type).next().is_some() {
                    self.delete_unit(id)?;
                    continue;
                }
            }
            let Some(unit) = self.units.get_mut(id) else {
                continue;
            };
            let old_owner = std::mem::replace(&mut unit.owner, player.clone());
            if let Some(&old_small) = self.index.get(&old_owner) {
                if let Some(old) = self.players.get_mut(usize::from(old_small) - 1) {
                    old.units.remove(&id);
                }
                self.recorder.player(old_small);
            }
            self.player_mut(player)?.units.insert(id);
            self.recorder.unit(id);
        }
        Ok(true)
    }

    /// Moves a unit. Moving a destroyed unit is a no-op.
    ///
    /// # Errors
    ///
    /// [`GameError::UnitNotFound`] or [`GameError::TileOutOfBounds`].
    pub fn move_unit(&mut self, id: UnitId, tile: TileRef) -> GameResult<()> {
        if !self.map.contains(tile) {
            let cell = self.map.cell(tile);
            return Err(GameError::TileOutOfBounds {
                x: cell.x,
                y: cell.y,
            });
        }
        if !self.unit(id)?.is_active() {
            return Ok(());
        }
        self.units.relocate(id, tile);
        self.recorder.unit(id);
        Ok(())
    }

    /// Changes the troops a unit carries.
    ///
    /// # Errors
    ///
    /// [`GameError::UnitNotFound`].
    pub fn set_unit_troops(&mut self, id: UnitId, troops: u32) -> GameResult<()> {
        let unit = self.units.get_mut(id).ok_or(GameError::UnitNotFound(id))?;
        if unit.troops != troops {
            unit.troops = troops;
            self.recorder.unit(id);
        }
        Ok(())
    }

    /// Destroys a unit. The id stays valid; the transition is terminal.
    ///
    /// # Errors
    ///
    /// [`GameError::UnitNotFound`].
    pub fn delete_unit(&mut self, id: UnitId) -> GameResult<()> {
        let unit = self.units.get_mut(id).ok_or(GameError::UnitNotFound(id))?;
        if unit.active {
            unit.active = false;
            self.recorder.unit(id);
        }
        Ok(())
    }

    /// Mutable player access; marks the player changed.
    pub(crate) fn player_mut(&mut self, id: &PlayerId) -> GameResult<&mut Player> {
        let small = *self
            .index
            .get(id)
            .ok_or_else(|| GameError::PlayerNotFound(id.clone()))?;
        self.recorder.player(small);
        self.players
            .get_mut(usize::from(small) - 1)
            .ok_or_else(|| GameError::PlayerNotFound(id.clone()))
    }

    /// Small ids of every player, for per-player sweeps.
    pub(crate) fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }

    // =========================================================================
    // Alliances
    // =========================================================================

    /// Files an alliance request. Returns `false` if one is already pending
    /// or the pair is already allied.
    ///
    /// # Errors
    ///
    /// [`GameError::PlayerNotFound`] for either side.
    pub fn request_alliance(&mut self, requestor: &PlayerId, recipient: &PlayerId) -> GameResult<bool> {
        self.player(requestor)?;
        self.player(recipient)?;
        if !self.alliances.request(requestor, recipient, self.ticks) {
            return Ok(false);
        }
        self.recorder.alliance(AllianceUpdate::RequestCreated {
            requestor: requestor.clone(),
            recipient: recipient.clone(),
        });
        Ok(true)
    }

    /// Answers a pending request. Returns `false` if none was pending.
    ///
    /// # Errors
    ///
    /// [`GameError::PlayerNotFound`] for either side.
    pub fn reply_alliance(
        &mut self,
        requestor: &PlayerId,
        recipient: &PlayerId,
        accept: bool,
    ) -> GameResult<bool> {
        self.player(requestor)?;
        self.player(recipient)?;
        if self.alliances.take_request(requestor, recipient).is_none() {
            return Ok(false);
        }
        self.recorder.alliance(AllianceUpdate::RequestReplied {
            requestor: requestor.clone(),
            recipient: recipient.clone(),
            accepted: accept,
        });
        if accept {
            self.alliances.form(requestor, recipient, self.ticks);
            let (a, b) = if requestor <= recipient {
                (requestor.clone(), recipient.clone())
            } else {
                (recipient.clone(), requestor.clone())
            };
            self.recorder.alliance(AllianceUpdate::AllianceFormed { a, b });
        }
        Ok(true)
    }

    /// Ends an alliance. Returns `false` if the pair was not allied.
    ///
    /// # Errors
    ///
    /// [`GameError::PlayerNotFound`] for either side.
    pub fn break_alliance(&mut self, breaker: &PlayerId, other: &PlayerId) -> GameResult<bool> {
        self.player(breaker)?;
        self.player(other)?;
        if !self.alliances.dissolve(breaker, other) {
            return Ok(false);
        }
        self.recorder.alliance(AllianceUpdate::AllianceBroken {
            breaker: breaker.clone(),
            other: other.clone(),
        });
        Ok(true)
    }

    /// Drops requests older than `alliances.request_ticks`.
    pub(crate) fn expire_alliance_requests(&mut self) {
        let ttl = self.config.alliances.request_ticks;
        for (requestor, recipient) in self.alliances.expire(self.ticks, ttl) {
            self.recorder
                .alliance(AllianceUpdate::RequestExpired { requestor, recipient });
        }
    }

    // =========================================================================
    // Engine plumbing
    // =========================================================================

    /// Simulation RNG. Only ever drawn from in execution order.
    pub(crate) fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// Schedules a follow-up execution; it is admitted at the next tick.
    pub fn queue_execution(&mut self, execution: Box<dyn Execution>) {
        self.queued.push(execution);
    }

    pub(crate) fn take_queued(&mut self) -> Vec<Box<dyn Execution>> {
        std::mem::take(&mut self.queued)
    }

    /// Closes the tick in progress and returns its updates.
    pub(crate) fn finish_tick(&mut self) -> UpdateBatch {
        let updates = self.recorder.drain(&self.map, &self.players, &self.units);
        let batch = UpdateBatch {
            tick: self.ticks,
            updates,
        };
        self.ticks += 1;
        batch
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Canonical full-state image.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.ticks,
            width: self.map.width(),
            height: self.map.height(),
            terrain: self.map.terrain_slice().to_vec(),
            owners: self.map.owner_slice().to_vec(),
            players: self.players.iter().map(Player::to_update).collect(),
            units: self.units.iter().map(Unit::to_update).collect(),
            alliances: self.alliances.alliance_records(),
            requests: self.alliances.request_records(),
        }
    }

    /// Stable 64-bit digest of the world and the RNG position.
    ///
    /// Equal hashes across runs mean bit-identical observable state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(0, 0);
        self.snapshot().hash(&mut hasher);
        hasher.write_u128(self.rng.get_word_pos());
        hasher.finish()
    }
}
