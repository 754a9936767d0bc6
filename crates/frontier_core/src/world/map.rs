//! # Tile Grid
//!
//! Flat row-major storage of terrain and ownership. Ownership is stored as
//! player small ids (`0` = unclaimed) so a tile costs two bytes.

use frontier_shared::{Cell, Terrain, TileRef};

use crate::config::MapConfig;
use crate::error::{GameError, GameResult};

/// Small id meaning "nobody".
pub const UNOWNED: u16 = 0;

/// The tile grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameMap {
    width: u32,
    height: u32,
    terrain: Vec<Terrain>,
    owners: Vec<u16>,
}

impl GameMap {
    /// An all-land map.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            terrain: vec![Terrain::Land; len],
            owners: vec![UNOWNED; len],
        }
    }

    /// Parses terrain rows (`.` land, `~` water).
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] on an empty, ragged or unknown-symbol map.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> GameResult<Self> {
        let height = u32::try_from(rows.len())
            .map_err(|_| GameError::InvalidConfig("too many map rows".into()))?;
        let width = rows.first().map_or(0, |r| r.as_ref().chars().count());
        if width == 0 {
            return Err(GameError::InvalidConfig("empty map".into()));
        }
        let width = u32::try_from(width)
            .map_err(|_| GameError::InvalidConfig("map row too long".into()))?;

        let mut terrain = Vec::with_capacity(width as usize * height as usize);
        for (y, row) in rows.iter().enumerate() {
            let before = terrain.len();
            for c in row.as_ref().chars() {
                let t = Terrain::from_symbol(c).ok_or_else(|| {
                    GameError::InvalidConfig(format!("unknown map symbol {c:?} in row {y}"))
                })?;
                terrain.push(t);
            }
            if terrain.len() - before != width as usize {
                return Err(GameError::InvalidConfig(format!(
                    "map row {y} is not {width} tiles wide"
                )));
            }
        }
        let owners = vec![UNOWNED; terrain.len()];
        Ok(Self {
            width,
            height,
            terrain,
            owners,
        })
    }

    /// Builds the map a config describes.
    ///
    /// # Errors
    ///
    /// See [`GameMap::from_rows`].
    pub fn from_config(config: &MapConfig) -> GameResult<Self> {
        if config.rows.is_empty() {
            Ok(Self::new(config.width, config.height))
        } else {
            Self::from_rows(&config.rows)
        }
    }

    /// Width in tiles.
    #[inline]
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in tiles.
    #[inline]
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of tiles.
    #[inline]
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.terrain.len()
    }

    /// Tile at a cell, if the cell is on the map.
    #[must_use]
    pub fn tile_at(&self, cell: Cell) -> Option<TileRef> {
        let x = u32::try_from(cell.x).ok()?;
        let y = u32::try_from(cell.y).ok()?;
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// Like [`GameMap::tile_at`], but as an error.
    ///
    /// # Errors
    ///
    /// [`GameError::TileOutOfBounds`] if the cell is off the map.
    pub fn require_tile(&self, cell: Cell) -> GameResult<TileRef> {
        self.tile_at(cell).ok_or(GameError::TileOutOfBounds {
            x: cell.x,
            y: cell.y,
        })
    }

    /// Cell of a tile.
    #[must_use]
    pub fn cell(&self, tile: TileRef) -> Cell {
        // Both halves are below the map dimensions, which fit in i32 for any
        // map a u32 tile index can address row by row.
        #[allow(clippy::cast_possible_wrap)]
        Cell::new((tile % self.width) as i32, (tile / self.width) as i32)
    }

    /// Whether the index is on the map.
    #[inline]
    #[must_use]
    pub fn contains(&self, tile: TileRef) -> bool {
        (tile as usize) < self.terrain.len()
    }

    /// Terrain of a tile. Off-map tiles read as water.
    #[must_use]
    pub fn terrain(&self, tile: TileRef) -> Terrain {
        self.terrain.get(tile as usize).copied().unwrap_or(Terrain::Water)
    }

    /// Whether the tile is land.
    #[inline]
    #[must_use]
    pub fn is_land(&self, tile: TileRef) -> bool {
        self.terrain(tile) == Terrain::Land
    }

    /// Whether the tile is water.
    #[inline]
    #[must_use]
    pub fn is_water(&self, tile: TileRef) -> bool {
        self.contains(tile) && self.terrain(tile) == Terrain::Water
    }

    /// Land tile touching water.
    #[must_use]
    pub fn is_shore(&self, tile: TileRef) -> bool {
        self.is_land(tile) && self.neighbors(tile).any(|n| self.is_water(n))
    }

    /// Owner small id of a tile.
    #[inline]
    #[must_use]
    pub fn owner(&self, tile: TileRef) -> u16 {
        self.owners.get(tile as usize).copied().unwrap_or(UNOWNED)
    }

    pub(crate) fn set_owner(&mut self, tile: TileRef, owner: u16) {
        if let Some(slot) = self.owners.get_mut(tile as usize) {
            *slot = owner;
        }
    }

    /// On-map orthogonal neighbours in N, E, S, W order.
    pub fn neighbors(&self, tile: TileRef) -> impl Iterator<Item = TileRef> + '_ {
        let cell = self.cell(tile);
        cell.neighbors().into_iter().filter_map(move |n| self.tile_at(n))
    }

    /// Terrain of every tile, row-major.
    #[must_use]
    pub fn terrain_slice(&self) -> &[Terrain] {
        &self.terrain
    }

    /// Owner of every tile, row-major.
    #[must_use]
    pub fn owner_slice(&self) -> &[u16] {
        &self.owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_round_trip() {
        let map = GameMap::new(8, 4);
        let tile = map.tile_at(Cell::new(3, 2)).unwrap();
        assert_eq!(tile, 19);
        assert_eq!(map.cell(tile), Cell::new(3, 2));
        assert_eq!(map.tile_at(Cell::new(8, 0)), None);
        assert_eq!(map.tile_at(Cell::new(-1, 0)), None);
    }

    #[test]
    fn test_neighbors_clip_at_edges() {
        let map = GameMap::new(3, 3);
        let corner: Vec<_> = map.neighbors(0).collect();
        assert_eq!(corner, vec![1, 3]);
        let center: Vec<_> = map.neighbors(4).collect();
        assert_eq!(center, vec![1, 5, 7, 3]);
    }

    #[test]
    fn test_from_rows_and_shore() {
        let map = GameMap::from_rows(&["..~", "..~"]).unwrap();
        assert_eq!((map.width(), map.height()), (3, 2));
        assert!(map.is_water(2));
        assert!(map.is_shore(1));
        assert!(!map.is_shore(0));
    }

    #[test]
    fn test_from_rows_rejects_unknown_symbol() {
        assert!(GameMap::from_rows(&["..#"]).is_err());
    }
}
