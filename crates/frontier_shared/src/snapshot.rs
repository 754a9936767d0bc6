//! # World Snapshot
//!
//! Canonical full-state image of the world, used to bootstrap a replica and
//! to resynchronize it after a gap. Every collection is sorted, so two
//! snapshots of equal state compare (and hash) equal.

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;
use crate::types::Terrain;
use crate::updates::{PlayerUpdate, UnitUpdate};

/// An established alliance.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "camelCase")]
pub struct AllianceRecord {
    /// Lower player id.
    pub a: PlayerId,
    /// Higher player id.
    pub b: PlayerId,
    /// Tick the alliance formed.
    pub formed_tick: u64,
}

/// A pending alliance request.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "camelCase")]
pub struct AllianceRequestRecord {
    /// Asking player.
    pub requestor: PlayerId,
    /// Asked player.
    pub recipient: PlayerId,
    /// Tick the request was made.
    pub created_tick: u64,
}

/// Full world state after `tick` completed ticks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct WorldSnapshot {
    /// Number of ticks completed; the next batch a replica expects.
    pub tick: u64,
    /// Map width in tiles.
    pub width: u32,
    /// Map height in tiles.
    pub height: u32,
    /// Terrain per tile, row-major.
    pub terrain: Vec<Terrain>,
    /// Owner small id per tile, row-major (`0` = unclaimed).
    pub owners: Vec<u16>,
    /// Players ascending by small id.
    pub players: Vec<PlayerUpdate>,
    /// All units ever built, ascending by id, inactive ones included.
    pub units: Vec<UnitUpdate>,
    /// Alliances, sorted.
    pub alliances: Vec<AllianceRecord>,
    /// Pending requests, sorted.
    pub requests: Vec<AllianceRequestRecord>,
}

impl WorldSnapshot {
    /// Number of tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.owners.len()
    }

    /// Number of active units.
    #[must_use]
    pub fn active_units(&self) -> usize {
        self.units.iter().filter(|u| u.is_active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serializes_terrain_compactly() {
        let snapshot = WorldSnapshot {
            width: 2,
            height: 1,
            terrain: vec![Terrain::Land, Terrain::Water],
            owners: vec![0, 0],
            ..WorldSnapshot::default()
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains(r#""terrain":["Land","Water"]"#));
        assert_eq!(serde_json::from_str::<WorldSnapshot>(&json).unwrap(), snapshot);
        assert_eq!(snapshot.tile_count(), 2);
    }
}
