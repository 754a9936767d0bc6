//! Grid math shared between client and server.
//!
//! These are the canonical representations used in the network protocol.
//! Tiles travel as flat [`TileRef`] indices; [`Cell`] is the `(x, y)` form
//! that intents carry.

use serde::{Deserialize, Serialize};

/// Flat tile index: `y * width + x`.
pub type TileRef = u32;

/// Integer grid coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl Cell {
    /// Creates a new cell
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell
    #[must_use]
    pub const fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Euclidean distance squared (avoids sqrt, stays integral)
    #[must_use]
    pub const fn distance_squared(self, other: Self) -> u64 {
        let dx = self.x.abs_diff(other.x) as u64;
        let dy = self.y.abs_diff(other.y) as u64;
        dx * dx + dy * dy
    }

    /// The four orthogonal neighbours, in a fixed order (N, E, S, W).
    #[must_use]
    pub const fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.x, self.y - 1),
            Self::new(self.x + 1, self.y),
            Self::new(self.x, self.y + 1),
            Self::new(self.x - 1, self.y),
        ]
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan() {
        assert_eq!(Cell::new(0, 0).manhattan(Cell::new(3, -4)), 7);
    }

    #[test]
    fn test_distance_squared() {
        assert_eq!(Cell::new(1, 1).distance_squared(Cell::new(4, 5)), 25);
    }

    #[test]
    fn test_neighbor_order() {
        let n = Cell::new(5, 5).neighbors();
        assert_eq!(n[0], Cell::new(5, 4));
        assert_eq!(n[3], Cell::new(4, 5));
    }
}
