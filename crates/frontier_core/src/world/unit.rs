//! # Unit Arena
//!
//! Units live in a `Vec` indexed by [`UnitId`]. Ids are handed out in
//! creation order and never reused: destroying a unit flips its `active`
//! flag, the slot stays. Clients may hold ids of dead units for as long as
//! the game runs.
//!
//! A per-tile index answers "what stands here" without a scan.

use std::collections::BTreeMap;

use frontier_shared::{PlayerId, TileRef, UnitId, UnitType, UnitUpdate};

/// One unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    pub(crate) id: UnitId,
    pub(crate) unit_type: UnitType,
    pub(crate) owner: PlayerId,
    pub(crate) tile: TileRef,
    pub(crate) last_tile: TileRef,
    pub(crate) active: bool,
    pub(crate) troops: u32,
    pub(crate) created_tick: u64,
}

impl Unit {
    /// Stable id.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Kind of unit.
    #[must_use]
    pub const fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    /// Current owner.
    #[must_use]
    pub const fn owner(&self) -> &PlayerId {
        &self.owner
    }

    /// Current tile.
    #[must_use]
    pub const fn tile(&self) -> TileRef {
        self.tile
    }

    /// Tile before the latest move.
    #[must_use]
    pub const fn last_tile(&self) -> TileRef {
        self.last_tile
    }

    /// `false` once destroyed.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Carried troops.
    #[must_use]
    pub const fn troops(&self) -> u32 {
        self.troops
    }

    /// Tick the unit was built.
    #[must_use]
    pub const fn created_tick(&self) -> u64 {
        self.created_tick
    }

    /// Wire record of this unit.
    #[must_use]
    pub fn to_update(&self) -> UnitUpdate {
        UnitUpdate {
            id: self.id,
            unit_type: self.unit_type,
            owner: self.owner.clone(),
            troops: self.troops,
            tile: self.tile,
            last_tile: self.last_tile,
            is_active: self.active,
        }
    }
}

/// Append-only unit storage.
#[derive(Clone, Debug, Default)]
pub struct UnitArena {
    units: Vec<Unit>,
    by_tile: BTreeMap<TileRef, Vec<UnitId>>,
}

impl UnitArena {
    /// Empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Units ever created.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// True if no unit was ever created.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units still active.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.units.iter().filter(|u| u.active).count()
    }

    /// Allocates the next id and stores the unit.
    pub(crate) fn insert(
        &mut self,
        unit_type: UnitType,
        owner: PlayerId,
        troops: u32,
        tile: TileRef,
        created_tick: u64,
    ) -> UnitId {
        // More than u32::MAX units cannot be addressed on the wire either.
        let id = UnitId(u32::try_from(self.units.len()).unwrap_or(u32::MAX));
        self.units.push(Unit {
            id,
            unit_type,
            owner,
            tile,
            last_tile: tile,
            active: true,
            troops,
            created_tick,
        });
        self.by_tile.entry(tile).or_default().push(id);
        id
    }

    /// Unit by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.index())
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.index())
    }

    /// Moves a unit and keeps the tile index current.
    pub(crate) fn relocate(&mut self, id: UnitId, to: TileRef) -> bool {
        let Some(unit) = self.units.get_mut(id.index()) else {
            return false;
        };
        let from = unit.tile;
        unit.last_tile = from;
        unit.tile = to;
        if from != to {
            if let Some(ids) = self.by_tile.get_mut(&from) {
                ids.retain(|&u| u != id);
                if ids.is_empty() {
                    self.by_tile.remove(&from);
                }
            }
            self.by_tile.entry(to).or_default().push(id);
        }
        true
    }

    /// Every unit in id order, dead ones included.
    pub fn iter(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter()
    }

    /// Units standing on a tile, in creation order.
    pub fn at(&self, tile: TileRef) -> impl Iterator<Item = &Unit> {
        self.by_tile
            .get(&tile)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.units.get(id.index()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let mut arena = UnitArena::new();
        let a = arena.insert(UnitType::City, "P1".into(), 0, 5, 0);
        let b = arena.insert(UnitType::City, "P1".into(), 0, 6, 0);
        assert_eq!((a, b), (UnitId(0), UnitId(1)));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_relocate_updates_index() {
        let mut arena = UnitArena::new();
        let id = arena.insert(UnitType::TransportShip, "P1".into(), 50, 5, 0);
        assert!(arena.relocate(id, 9));
        assert_eq!(arena.at(5).count(), 0);
        assert_eq!(arena.at(9).map(Unit::id).collect::<Vec<_>>(), vec![id]);
        let unit = arena.get(id).unwrap();
        assert_eq!((unit.last_tile(), unit.tile()), (5, 9));
    }

    #[test]
    fn test_deactivated_unit_keeps_slot() {
        let mut arena = UnitArena::new();
        let id = arena.insert(UnitType::City, "P1".into(), 0, 5, 0);
        arena.get_mut(id).unwrap().active = false;
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.active_count(), 0);
        assert!(!arena.get(id).unwrap().is_active());
    }
}
