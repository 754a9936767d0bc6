//! # FRONTIER Core
//!
//! The authoritative simulation for a tick-based territory game:
//! - a tile grid owned by players
//! - units, alliances and an economy driven by executions
//! - one [`UpdateBatch`](frontier_shared::UpdateBatch) per tick describing every change
//!
//! ## Architecture Rules
//!
//! 1. **Single writer** - only the [`Executor`] mutates a [`Game`]
//! 2. **Deterministic** - seeded RNG, ordered collections, insertion-order scheduling
//! 3. **Intents in, batches out** - clients never touch the world directly
//!
//! ## Example
//!
//! ```rust,ignore
//! use frontier_core::{Executor, GameConfig};
//!
//! let mut executor = Executor::new(GameConfig::default())?;
//! executor.submit(intent);
//! let batch = executor.tick();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod exec;
pub mod intent;
pub mod replay;
pub mod world;

pub use config::{
    AllianceConfig, BoatConfig, CombatConfig, ConstructionConfig, EconomyConfig, GameConfig,
    MapConfig,
};
pub use error::{GameError, GameResult};
pub use exec::{Execution, Executor, ExecutorStats};
pub use intent::{admit, Admission};
pub use replay::{replay, ReplayLog, ReplayRecorder, ReplayTurn};
pub use world::{AllianceRegistry, Game, GameMap, Player, Unit, UnitArena, UNOWNED};
