//! # Executor
//!
//! The single writer of a [`Game`]. One call to [`Executor::tick`] runs one
//! complete tick:
//!
//! 1. admit intents buffered since the last tick, in arrival order
//! 2. `init` executions admitted since the last tick
//! 3. `tick` every active execution, in insertion order
//! 4. sweep executions that went inactive (separate pass)
//! 5. schedule follow-ups queued during the tick for the next one
//! 6. expire stale alliance requests
//! 7. close the tick and return its [`UpdateBatch`]
//!
//! During the spawn phase steps 2 and 3 skip executions that are not
//! spawn-phase eligible; they stay queued until the phase ends.
//!
//! Insertion order is the tie-break for conflicting executions: the one
//! admitted first acts first in every tick.

use frontier_shared::{Intent, UpdateBatch};
use tracing::{debug, warn};

use super::Execution;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::intent::{admit, Admission};
use crate::replay::{ReplayLog, ReplayRecorder};
use crate::world::Game;

/// Engine counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Ticks completed.
    pub ticks: u64,
    /// Intents that passed admission.
    pub intents_admitted: u64,
    /// Intents rejected at admission.
    pub intents_rejected: u64,
    /// Executions that ran `init`.
    pub executions_started: u64,
    /// Executions swept after finishing.
    pub executions_finished: u64,
    /// Executions currently scheduled (initialized or not).
    pub scheduled: usize,
}

struct Slot {
    execution: Box<dyn Execution>,
    initialized: bool,
}

impl Slot {
    fn new(execution: Box<dyn Execution>) -> Self {
        Self {
            execution,
            initialized: false,
        }
    }

    fn eligible(&self, in_spawn_phase: bool) -> bool {
        !in_spawn_phase || self.execution.active_during_spawn_phase()
    }
}

/// Tick scheduler owning the authoritative world.
pub struct Executor {
    game: Game,
    pending: Vec<Intent>,
    slots: Vec<Slot>,
    recorder: Option<ReplayRecorder>,
    stats: ExecutorStats,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("game", &self.game)
            .field("pending", &self.pending.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Creates an engine over a fresh world.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] if the config does not validate.
    pub fn new(config: GameConfig) -> GameResult<Self> {
        Ok(Self {
            game: Game::new(config)?,
            pending: Vec::new(),
            slots: Vec::new(),
            recorder: None,
            stats: ExecutorStats::default(),
        })
    }

    /// The world, read-only.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// The world, for setup between ticks (server-side bots, tests).
    ///
    /// Changes made here are not part of a replay log.
    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    /// Engine counters.
    #[must_use]
    pub const fn stats(&self) -> &ExecutorStats {
        &self.stats
    }

    /// Buffers an intent for the next tick boundary.
    pub fn submit(&mut self, intent: Intent) {
        self.pending.push(intent);
    }

    /// Intents waiting for the next tick.
    #[must_use]
    pub fn pending_intents(&self) -> usize {
        self.pending.len()
    }

    /// Schedules an execution directly; it is initialized on the next tick.
    pub fn add_execution(&mut self, execution: Box<dyn Execution>) {
        self.slots.push(Slot::new(execution));
        self.stats.scheduled = self.slots.len();
    }

    /// Scheduled executions in insertion order.
    pub fn executions(&self) -> impl Iterator<Item = &dyn Execution> {
        self.slots.iter().map(|s| s.execution.as_ref())
    }

    /// Starts recording admitted intents for replay.
    ///
    /// # Errors
    ///
    /// [`GameError::Replay`] once the first tick has run.
    pub fn start_recording(&mut self) -> GameResult<()> {
        if self.game.ticks() > 0 {
            return Err(GameError::Replay(
                "recording must start before the first tick".into(),
            ));
        }
        self.recorder = Some(ReplayRecorder::new(self.game.config().clone()));
        Ok(())
    }

    /// Stops recording and returns the log, sealed with the current state
    /// hash.
    pub fn finish_recording(&mut self) -> Option<ReplayLog> {
        let recorder = self.recorder.take()?;
        Some(recorder.finish(self.game.ticks(), self.game.state_hash()))
    }

    /// Runs one complete tick.
    pub fn tick(&mut self) -> UpdateBatch {
        let tick = self.game.ticks();

        let intents = std::mem::take(&mut self.pending);
        if let Some(recorder) = &mut self.recorder {
            recorder.record(tick, &intents);
        }
        for intent in intents {
            let kind = intent.kind();
            match admit(&mut self.game, intent) {
                Ok(Admission::Applied) => self.stats.intents_admitted += 1,
                Ok(Admission::Scheduled(execution)) => {
                    self.stats.intents_admitted += 1;
                    self.slots.push(Slot::new(execution));
                }
                Err(err) => {
                    self.stats.intents_rejected += 1;
                    warn!(tick, ?kind, %err, "intent rejected");
                }
            }
        }

        let in_spawn_phase = self.game.in_spawn_phase();
        for slot in &mut self.slots {
            if !slot.initialized && slot.eligible(in_spawn_phase) {
                slot.execution.init(&mut self.game, tick);
                slot.initialized = true;
                self.stats.executions_started += 1;
            }
        }

        for slot in &mut self.slots {
            if slot.initialized && slot.execution.is_active() && slot.eligible(in_spawn_phase) {
                slot.execution.tick(&mut self.game, tick);
            }
        }

        let before = self.slots.len();
        self.slots
            .retain(|s| !s.initialized || s.execution.is_active());
        self.stats.executions_finished += (before - self.slots.len()) as u64;

        for execution in self.game.take_queued() {
            debug!(tick, name = execution.name(), "follow-up scheduled");
            self.slots.push(Slot::new(execution));
        }

        self.game.expire_alliance_requests();
        let batch = self.game.finish_tick();
        self.stats.ticks += 1;
        self.stats.scheduled = self.slots.len();
        batch
    }
}
