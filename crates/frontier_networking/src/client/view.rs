//! # Game View
//!
//! Client-side read-only projection of the authoritative world, rebuilt from
//! one snapshot plus every following batch in tick order.
//!
//! ## Invariants
//!
//! - A view at tick `n` accepts only batch `n`; anything else flags it for
//!   resync and leaves it untouched
//! - Units are never removed; destruction flips `is_active`
//! - A rejected batch or snapshot changes nothing

use std::collections::BTreeMap;

use frontier_shared::{
    AllianceRecord, AllianceRequestRecord, AllianceUpdate, PlayerId, PlayerUpdate, SchemaError,
    Terrain, TileRef, UnitId, UnitUpdate, UpdateBatch, WorldSnapshot,
};

use crate::error::{NetworkError, NetworkResult};

/// Unit lifecycle transition observed while applying a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitEvent {
    /// First record for this id.
    Created(UnitId),
    /// Tile changed.
    Moved {
        /// The unit.
        id: UnitId,
        /// Previous tile.
        from: TileRef,
        /// New tile.
        to: TileRef,
    },
    /// `is_active` went false.
    Deactivated(UnitId),
}

type Pair = (PlayerId, PlayerId);

/// Read-only mirror of the world.
#[derive(Clone, Debug, Default)]
pub struct GameView {
    synced: bool,
    needs_resync: bool,
    tick: u64,
    width: u32,
    height: u32,
    terrain: Vec<Terrain>,
    owners: Vec<u16>,
    players: BTreeMap<u16, PlayerUpdate>,
    player_index: BTreeMap<PlayerId, u16>,
    units: BTreeMap<UnitId, UnitUpdate>,
    alliances: BTreeMap<Pair, u64>,
    requests: BTreeMap<Pair, u64>,
}

impl GameView {
    /// An empty, unsynced view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Replication
    // =========================================================================

    /// Replaces the whole view with `snapshot`.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Protocol`] if the tile arrays do not match the map
    /// size; the view is left as it was.
    pub fn apply_snapshot(&mut self, snapshot: WorldSnapshot) -> NetworkResult<()> {
        let tiles = u64::from(snapshot.width) * u64::from(snapshot.height);
        if snapshot.terrain.len() as u64 != tiles || snapshot.owners.len() as u64 != tiles {
            return Err(SchemaError::invalid("snapshot", "tile arrays do not match map size").into());
        }
        let WorldSnapshot {
            tick,
            width,
            height,
            terrain,
            owners,
            players,
            units,
            alliances,
            requests,
        } = snapshot;

        self.tick = tick;
        self.width = width;
        self.height = height;
        self.terrain = terrain;
        self.owners = owners;
        self.players.clear();
        self.player_index.clear();
        for p in players {
            self.upsert_player(p);
        }
        self.units = units.into_iter().map(|u| (u.id, u)).collect();
        self.alliances = alliances
            .into_iter()
            .map(|r| ((r.a, r.b), r.formed_tick))
            .collect();
        self.requests = requests
            .into_iter()
            .map(|r| ((r.requestor, r.recipient), r.created_tick))
            .collect();
        self.synced = true;
        self.needs_resync = false;
        Ok(())
    }

    /// Applies the next batch and reports unit transitions.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::NotSynced`] before the first snapshot
    /// - [`NetworkError::Desync`] if `batch.tick` is not [`Self::tick`]; the
    ///   view then reports [`Self::needs_resync`]
    /// - [`NetworkError::Protocol`] for a tile index off the map
    pub fn apply_batch(&mut self, batch: &UpdateBatch) -> NetworkResult<Vec<UnitEvent>> {
        if !self.synced {
            return Err(NetworkError::NotSynced);
        }
        if batch.tick != self.tick {
            self.needs_resync = true;
            return Err(NetworkError::Desync {
                expected: self.tick,
                got: batch.tick,
            });
        }
        let updates = &batch.updates;
        let tile_count = self.owners.len();
        let off_map = updates.tiles.iter().map(|t| t.tile).chain(
            updates.units.iter().flat_map(|u| [u.tile, u.last_tile]),
        );
        for tile in off_map {
            if tile as usize >= tile_count {
                self.needs_resync = true;
                return Err(SchemaError::invalid("tile", format!("{tile} is off the map")).into());
            }
        }

        for t in &updates.tiles {
            self.owners[t.tile as usize] = t.owner;
        }
        for p in &updates.players {
            self.upsert_player(p.clone());
        }
        let mut events = Vec::new();
        for u in &updates.units {
            match self.units.get(&u.id) {
                None => events.push(UnitEvent::Created(u.id)),
                Some(old) => {
                    if old.tile != u.tile {
                        events.push(UnitEvent::Moved {
                            id: u.id,
                            from: old.tile,
                            to: u.tile,
                        });
                    }
                    if old.is_active && !u.is_active {
                        events.push(UnitEvent::Deactivated(u.id));
                    }
                }
            }
            self.units.insert(u.id, u.clone());
        }
        for event in &updates.alliances {
            self.apply_alliance(event, batch.tick);
        }
        self.tick += 1;
        Ok(events)
    }

    fn apply_alliance(&mut self, event: &AllianceUpdate, tick: u64) {
        match event {
            AllianceUpdate::RequestCreated {
                requestor,
                recipient,
            } => {
                self.requests
                    .insert((requestor.clone(), recipient.clone()), tick);
            }
            AllianceUpdate::RequestReplied {
                requestor,
                recipient,
                ..
            }
            | AllianceUpdate::RequestExpired {
                requestor,
                recipient,
            } => {
                self.requests
                    .remove(&(requestor.clone(), recipient.clone()));
            }
            AllianceUpdate::AllianceFormed { a, b } => {
                self.alliances.entry(pair(a, b)).or_insert(tick);
            }
            AllianceUpdate::AllianceBroken { breaker, other } => {
                self.alliances.remove(&pair(breaker, other));
            }
        }
    }

    fn upsert_player(&mut self, p: PlayerUpdate) {
        self.player_index.insert(p.id.clone(), p.small_id);
        self.players.insert(p.small_id, p);
    }

    // =========================================================================
    // Read accessors
    // =========================================================================

    /// Whether a snapshot has been applied.
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        self.synced
    }

    /// Whether a gap was detected since the last snapshot.
    #[must_use]
    pub const fn needs_resync(&self) -> bool {
        self.needs_resync
    }

    /// Ticks applied; also the tick of the next expected batch.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Map size.
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Terrain of a tile.
    #[must_use]
    pub fn terrain(&self, tile: TileRef) -> Option<Terrain> {
        self.terrain.get(tile as usize).copied()
    }

    /// Owner small id of a tile (`0` = unclaimed).
    #[must_use]
    pub fn owner_small_id(&self, tile: TileRef) -> Option<u16> {
        self.owners.get(tile as usize).copied()
    }

    /// Owner of a tile.
    #[must_use]
    pub fn owner(&self, tile: TileRef) -> Option<&PlayerUpdate> {
        self.owner_small_id(tile)
            .and_then(|small| self.players.get(&small))
    }

    /// Player by id.
    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerUpdate> {
        self.player_index
            .get(id)
            .and_then(|small| self.players.get(small))
    }

    /// Players ascending by small id.
    pub fn players(&self) -> impl Iterator<Item = &PlayerUpdate> {
        self.players.values()
    }

    /// Unit by id, active or not.
    #[must_use]
    pub fn unit(&self, id: UnitId) -> Option<&UnitUpdate> {
        self.units.get(&id)
    }

    /// Every unit ever seen, ascending by id.
    pub fn units(&self) -> impl Iterator<Item = &UnitUpdate> {
        self.units.values()
    }

    /// Active units, ascending by id.
    pub fn active_units(&self) -> impl Iterator<Item = &UnitUpdate> {
        self.units.values().filter(|u| u.is_active)
    }

    /// Whether two players are allied.
    #[must_use]
    pub fn is_allied(&self, a: &PlayerId, b: &PlayerId) -> bool {
        self.alliances.contains_key(&pair(a, b))
    }

    /// Whether `requestor` has a pending request to `recipient`.
    #[must_use]
    pub fn has_request(&self, requestor: &PlayerId, recipient: &PlayerId) -> bool {
        self.requests
            .contains_key(&(requestor.clone(), recipient.clone()))
    }

    /// The view as a snapshot; equal to the authority's at the same tick.
    #[must_use]
    pub fn to_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            width: self.width,
            height: self.height,
            terrain: self.terrain.clone(),
            owners: self.owners.clone(),
            players: self.players.values().cloned().collect(),
            units: self.units.values().cloned().collect(),
            alliances: self
                .alliances
                .iter()
                .map(|((a, b), &formed_tick)| AllianceRecord {
                    a: a.clone(),
                    b: b.clone(),
                    formed_tick,
                })
                .collect(),
            requests: self
                .requests
                .iter()
                .map(|((requestor, recipient), &created_tick)| AllianceRequestRecord {
                    requestor: requestor.clone(),
                    recipient: recipient.clone(),
                    created_tick,
                })
                .collect(),
        }
    }
}

fn pair(a: &PlayerId, b: &PlayerId) -> Pair {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontier_shared::{GameUpdates, PlayerType, TileUpdate, UnitType};

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            tick: 3,
            width: 4,
            height: 1,
            terrain: vec![Terrain::Land; 4],
            owners: vec![0; 4],
            ..WorldSnapshot::default()
        }
    }

    fn unit(tile: TileRef, active: bool) -> UnitUpdate {
        UnitUpdate {
            id: UnitId(0),
            unit_type: UnitType::TransportShip,
            owner: "P1".into(),
            troops: 10,
            tile,
            last_tile: tile,
            is_active: active,
        }
    }

    fn batch(tick: u64, updates: GameUpdates) -> UpdateBatch {
        UpdateBatch { tick, updates }
    }

    #[test]
    fn test_batch_before_snapshot_rejected() {
        let mut view = GameView::new();
        let err = view.apply_batch(&batch(0, GameUpdates::default())).unwrap_err();
        assert!(matches!(err, NetworkError::NotSynced));
    }

    #[test]
    fn test_gap_flags_resync_and_changes_nothing() {
        let mut view = GameView::new();
        view.apply_snapshot(snapshot()).unwrap();
        let updates = GameUpdates {
            tiles: vec![TileUpdate { tile: 1, owner: 1 }],
            ..GameUpdates::default()
        };
        let err = view.apply_batch(&batch(4, updates)).unwrap_err();
        assert!(matches!(err, NetworkError::Desync { expected: 3, got: 4 }));
        assert!(view.needs_resync());
        assert_eq!(view.owner_small_id(1), Some(0));
        assert_eq!(view.tick(), 3);

        view.apply_snapshot(snapshot()).unwrap();
        assert!(!view.needs_resync());
    }

    #[test]
    fn test_unit_lifecycle_events_and_soft_delete() {
        let mut view = GameView::new();
        view.apply_snapshot(snapshot()).unwrap();

        let events = view
            .apply_batch(&batch(3, GameUpdates { units: vec![unit(0, true)], ..GameUpdates::default() }))
            .unwrap();
        assert_eq!(events, vec![UnitEvent::Created(UnitId(0))]);

        let events = view
            .apply_batch(&batch(4, GameUpdates { units: vec![unit(2, false)], ..GameUpdates::default() }))
            .unwrap();
        assert_eq!(
            events,
            vec![
                UnitEvent::Moved { id: UnitId(0), from: 0, to: 2 },
                UnitEvent::Deactivated(UnitId(0)),
            ]
        );
        assert!(view.unit(UnitId(0)).is_some());
        assert_eq!(view.active_units().count(), 0);
        assert_eq!(view.tick(), 5);
    }

    #[test]
    fn test_alliance_events_tracked() {
        let mut view = GameView::new();
        view.apply_snapshot(snapshot()).unwrap();
        let (p1, p2) = (PlayerId::from("P1"), PlayerId::from("P2"));
        let created = GameUpdates {
            alliances: vec![AllianceUpdate::RequestCreated {
                requestor: p2.clone(),
                recipient: p1.clone(),
            }],
            ..GameUpdates::default()
        };
        view.apply_batch(&batch(3, created)).unwrap();
        assert!(view.has_request(&p2, &p1));

        let accepted = GameUpdates {
            alliances: vec![
                AllianceUpdate::RequestReplied {
                    requestor: p2.clone(),
                    recipient: p1.clone(),
                    accepted: true,
                },
                AllianceUpdate::AllianceFormed { a: p1.clone(), b: p2.clone() },
            ],
            ..GameUpdates::default()
        };
        view.apply_batch(&batch(4, accepted)).unwrap();
        assert!(!view.has_request(&p2, &p1));
        assert!(view.is_allied(&p2, &p1));
        assert_eq!(view.to_snapshot().alliances[0].formed_tick, 4);
    }

    #[test]
    fn test_off_map_tile_rejected() {
        let mut view = GameView::new();
        view.apply_snapshot(snapshot()).unwrap();
        let updates = GameUpdates {
            tiles: vec![TileUpdate { tile: 0, owner: 1 }, TileUpdate { tile: 9, owner: 1 }],
            ..GameUpdates::default()
        };
        assert!(view.apply_batch(&batch(3, updates)).is_err());
        assert_eq!(view.owner_small_id(0), Some(0));
    }

    #[test]
    fn test_players_indexed_by_id() {
        let mut snap = snapshot();
        snap.players.push(PlayerUpdate {
            id: "P1".into(),
            small_id: 1,
            name: "Ada".into(),
            player_type: PlayerType::Human,
            client_id: None,
            troops: 5,
            gold: 0,
            tiles_owned: 1,
            is_alive: true,
        });
        snap.owners[2] = 1;
        let mut view = GameView::new();
        view.apply_snapshot(snap.clone()).unwrap();
        assert_eq!(view.owner(2).map(|p| p.name.as_str()), Some("Ada"));
        assert_eq!(view.player(&"P1".into()).map(|p| p.troops), Some(5));
        assert_eq!(view.to_snapshot(), snap);
    }
}
