//! # Game Error Types
//!
//! All errors that can occur while admitting intents or mutating the world.
//! None of them stop the tick loop: the engine logs them and moves on.

use frontier_shared::{ClientId, PlayerId, TileRef, UnitId, UnitType};
use thiserror::Error;

/// Errors that can occur in the simulation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// No player with this id.
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// No unit with this id.
    #[error("unit not found: {0}")]
    UnitNotFound(UnitId),

    /// Coordinates outside the map.
    #[error("tile out of bounds: ({x}, {y})")]
    TileOutOfBounds {
        /// Column.
        x: i32,
        /// Row.
        y: i32,
    },

    /// The client is not allowed to act for this player.
    #[error("client {client} may not act for player {player}")]
    Unauthorized {
        /// Acting player.
        player: PlayerId,
        /// Sending client.
        client: ClientId,
    },

    /// Spawn intent after the spawn phase ended.
    #[error("spawn phase is over")]
    SpawnPhaseOver,

    /// Spawn tile rejected.
    #[error("invalid spawn: {0}")]
    InvalidSpawn(String),

    /// Placement validation failed at build time.
    #[error("cannot build {unit_type:?} at tile {tile}")]
    CannotBuild {
        /// Requested unit type.
        unit_type: UnitType,
        /// Requested tile.
        tile: TileRef,
    },

    /// No execution builds this unit type on request.
    #[error("unit type {0:?} cannot be built by intent")]
    UnsupportedUnit(UnitType),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A replay diverged or could not be loaded.
    #[error("replay failed: {0}")]
    Replay(String),
}

/// Result type for simulation operations.
pub type GameResult<T> = Result<T, GameError>;
