//! # Update Recorder
//!
//! Mutators mark what they touched; at the end of the tick the dirty sets are
//! turned into one [`GameUpdates`] holding the *final* state of each touched
//! entity. An entity touched five times in a tick appears once.

use std::collections::BTreeSet;

use frontier_shared::{AllianceUpdate, GameUpdates, TileRef, TileUpdate, UnitId};

use super::map::GameMap;
use super::player::Player;
use super::unit::UnitArena;

/// Dirty tracking for one tick.
#[derive(Clone, Debug, Default)]
pub struct UpdateRecorder {
    units: BTreeSet<UnitId>,
    players: BTreeSet<u16>,
    tiles: BTreeSet<TileRef>,
    alliances: Vec<AllianceUpdate>,
}

impl UpdateRecorder {
    #[inline]
    pub(crate) fn unit(&mut self, id: UnitId) {
        self.units.insert(id);
    }

    #[inline]
    pub(crate) fn player(&mut self, small_id: u16) {
        self.players.insert(small_id);
    }

    #[inline]
    pub(crate) fn tile(&mut self, tile: TileRef) {
        self.tiles.insert(tile);
    }

    pub(crate) fn alliance(&mut self, update: AllianceUpdate) {
        self.alliances.push(update);
    }

    /// Builds the tick's updates and clears the dirty sets.
    pub(crate) fn drain(
        &mut self,
        map: &GameMap,
        players: &[Player],
        units: &UnitArena,
    ) -> GameUpdates {
        let unit_updates = std::mem::take(&mut self.units)
            .into_iter()
            .filter_map(|id| units.get(id).map(super::unit::Unit::to_update))
            .collect();
        let player_updates = std::mem::take(&mut self.players)
            .into_iter()
            .filter_map(|small| {
                players
                    .get(usize::from(small).wrapping_sub(1))
                    .map(Player::to_update)
            })
            .collect();
        let tile_updates = std::mem::take(&mut self.tiles)
            .into_iter()
            .map(|tile| TileUpdate {
                tile,
                owner: map.owner(tile),
            })
            .collect();
        GameUpdates {
            units: unit_updates,
            players: player_updates,
            tiles: tile_updates,
            alliances: std::mem::take(&mut self.alliances),
        }
    }
}
