//! Enumerations that appear on the wire.

use serde::{Deserialize, Serialize};

/// Kind of unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitType {
    /// Settlement anchoring a build chain.
    City,
    /// Seat of government, built on a city.
    Capital,
    /// Income-producing structure, built on a capital.
    Enterprise,
    /// Armed naval unit.
    Warship,
    /// Carries troops across water.
    TransportShip,
    /// Unarmed trading vessel.
    TradeShip,
    /// Warship projectile.
    Shell,
    /// Small nuclear weapon.
    AtomBomb,
    /// Large nuclear weapon.
    HydrogenBomb,
    /// Multiple-warhead carrier.
    #[serde(rename = "MIRV")]
    Mirv,
    /// One warhead split off a MIRV.
    #[serde(rename = "MIRVWarhead")]
    MirvWarhead,
}

impl UnitType {
    /// Every unit type, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::City,
        Self::Capital,
        Self::Enterprise,
        Self::Warship,
        Self::TransportShip,
        Self::TradeShip,
        Self::Shell,
        Self::AtomBomb,
        Self::HydrogenBomb,
        Self::Mirv,
        Self::MirvWarhead,
    ];

    /// Structures are immobile and change hands with the tile they stand on.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(self, Self::City | Self::Capital | Self::Enterprise)
    }

    /// Units that live on water tiles.
    #[must_use]
    pub const fn is_naval(self) -> bool {
        matches!(self, Self::Warship | Self::TransportShip | Self::TradeShip)
    }

    /// Nuclear weapons and their warheads.
    #[must_use]
    pub const fn is_nuke(self) -> bool {
        matches!(
            self,
            Self::AtomBomb | Self::HydrogenBomb | Self::Mirv | Self::MirvWarhead
        )
    }
}

/// Who controls a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PlayerType {
    /// A person behind a client.
    #[serde(rename = "HUMAN")]
    Human,
    /// Server-side AI.
    #[serde(rename = "BOT")]
    Bot,
    /// AI posing as a human.
    #[serde(rename = "FAKEHUMAN")]
    FakeHuman,
}

/// Terrain of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Conquerable ground.
    #[default]
    Land,
    /// Navigable by ships only.
    Water,
}

impl Terrain {
    /// Map-row character for this terrain.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Land => '.',
            Self::Water => '~',
        }
    }

    /// Parses a map-row character.
    #[must_use]
    pub const fn from_symbol(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Land),
            '~' => Some(Self::Water),
            _ => None,
        }
    }
}
