//! # Executions
//!
//! Every ongoing action in the game is an [`Execution`]: one object bound to
//! one concern, advanced once per tick by the [`Executor`] until it reports
//! itself inactive.
//!
//! ## Lifecycle
//!
//! ```text
//! queued ──init──► active ──tick──► active ... ──► inactive ──► swept
//! ```
//!
//! `init` runs once, on the first tick the execution is admitted. An
//! execution that fails validation in `init` or `tick` flips itself
//! inactive and logs a warning; it never retries. Outside of the spawn
//! phase every execution runs; during it, only those whose
//! [`Execution::active_during_spawn_phase`] is `true`.

mod alliance;
mod attack;
mod boat;
mod city;
mod engine;
mod enterprise;
mod player;

pub use alliance::{AllianceReplyExecution, AllianceRequestExecution, BreakAllianceExecution};
pub use attack::AttackExecution;
pub use boat::BoatExecution;
pub use city::CityExecution;
pub use engine::{Executor, ExecutorStats};
pub use enterprise::EnterpriseExecution;
pub use player::PlayerExecution;

use frontier_shared::PlayerId;

use crate::world::Game;

/// A scheduled behaviour.
pub trait Execution: Send {
    /// Binds the execution to the world. Called once, before the first tick.
    fn init(&mut self, game: &mut Game, tick: u64);

    /// Advances one tick.
    fn tick(&mut self, game: &mut Game, tick: u64);

    /// `false` once the execution is finished or abandoned. Terminal.
    fn is_active(&self) -> bool;

    /// Player the execution acts for, if any.
    fn owner(&self) -> Option<&PlayerId>;

    /// Whether the execution may run before the spawn phase ends.
    fn active_during_spawn_phase(&self) -> bool;

    /// Short type name for logs.
    fn name(&self) -> &'static str;

    /// Player the execution acts against, if any.
    fn target(&self) -> Option<&PlayerId> {
        None
    }
}
