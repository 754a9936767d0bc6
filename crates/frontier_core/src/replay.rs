//! # Replay
//!
//! A replay log is the config plus every intent the executor admitted, grouped
//! by the tick that admitted them, sealed with the final state hash. Running
//! the same intents against the same seed must reproduce the hash exactly.

use frontier_shared::Intent;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::exec::Executor;

/// Intents submitted before one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayTurn {
    /// Tick that admitted them.
    pub tick: u64,
    /// Intents in arrival order.
    pub intents: Vec<Intent>,
}

/// A complete recorded game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// Config the game started from.
    pub config: GameConfig,
    /// Non-empty turns in tick order.
    pub turns: Vec<ReplayTurn>,
    /// Ticks run.
    pub ticks: u64,
    /// [`crate::world::Game::state_hash`] after the last tick.
    pub final_hash: u64,
}

impl ReplayLog {
    /// Serializes to JSON.
    ///
    /// # Errors
    ///
    /// [`GameError::Replay`] if serialization fails.
    pub fn to_json(&self) -> GameResult<String> {
        serde_json::to_string(self).map_err(|e| GameError::Replay(e.to_string()))
    }

    /// Parses a log written by [`ReplayLog::to_json`].
    ///
    /// # Errors
    ///
    /// [`GameError::Replay`] on malformed input.
    pub fn from_json(text: &str) -> GameResult<Self> {
        serde_json::from_str(text).map_err(|e| GameError::Replay(e.to_string()))
    }

    /// Intents recorded across all turns.
    #[must_use]
    pub fn intent_count(&self) -> usize {
        self.turns.iter().map(|t| t.intents.len()).sum()
    }
}

/// Accumulates turns while a game runs.
#[derive(Debug)]
pub struct ReplayRecorder {
    config: GameConfig,
    turns: Vec<ReplayTurn>,
}

impl ReplayRecorder {
    /// Recorder for a game started from `config`.
    #[must_use]
    pub const fn new(config: GameConfig) -> Self {
        Self {
            config,
            turns: Vec::new(),
        }
    }

    /// Records the intents taken at `tick`. Empty turns are skipped.
    pub fn record(&mut self, tick: u64, intents: &[Intent]) {
        if intents.is_empty() {
            return;
        }
        self.turns.push(ReplayTurn {
            tick,
            intents: intents.to_vec(),
        });
    }

    /// Seals the log.
    #[must_use]
    pub fn finish(self, ticks: u64, final_hash: u64) -> ReplayLog {
        ReplayLog {
            config: self.config,
            turns: self.turns,
            ticks,
            final_hash,
        }
    }
}

/// Re-runs a log on a fresh executor and checks the final hash.
///
/// # Errors
///
/// - [`GameError::InvalidConfig`] if the recorded config is invalid
/// - [`GameError::Replay`] if turns are out of order or the hash differs
pub fn replay(log: &ReplayLog) -> GameResult<Executor> {
    let mut executor = Executor::new(log.config.clone())?;
    let mut turns = log.turns.iter().peekable();
    for tick in 0..log.ticks {
        while let Some(turn) = turns.next_if(|t| t.tick == tick) {
            for intent in &turn.intents {
                executor.submit(intent.clone());
            }
        }
        if turns.peek().is_some_and(|t| t.tick < tick) {
            return Err(GameError::Replay(format!("turn order broken at tick {tick}")));
        }
        executor.tick();
    }
    if let Some(turn) = turns.next() {
        return Err(GameError::Replay(format!(
            "turn at tick {} is past the end ({} ticks)",
            turn.tick, log.ticks
        )));
    }
    let hash = executor.game().state_hash();
    if hash != log.final_hash {
        return Err(GameError::Replay(format!(
            "state hash mismatch: recorded {:016x}, replayed {hash:016x}",
            log.final_hash
        )));
    }
    info!(ticks = log.ticks, intents = log.intent_count(), "replay verified");
    Ok(executor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontier_shared::{ClientId, PlayerType, SpawnIntent};

    fn spawn(player: &str, x: i32) -> Intent {
        Intent::Spawn(SpawnIntent {
            client_id: ClientId::new(format!("c-{player}")),
            player_id: player.into(),
            name: player.into(),
            player_type: PlayerType::Human,
            x,
            y: 10,
        })
    }

    fn recorded(ticks: u64) -> ReplayLog {
        let mut ex = Executor::new(GameConfig::default()).unwrap();
        ex.start_recording().unwrap();
        ex.submit(spawn("P1", 10));
        ex.tick();
        ex.submit(spawn("P2", 40));
        for _ in 1..ticks {
            ex.tick();
        }
        ex.finish_recording().unwrap()
    }

    #[test]
    fn test_recorder_skips_empty_turns() {
        let log = recorded(5);
        assert_eq!(log.turns.len(), 2);
        assert_eq!(log.turns[1].tick, 1);
        assert_eq!(log.intent_count(), 2);
    }

    #[test]
    fn test_replay_reproduces_hash() {
        let log = recorded(20);
        let text = log.to_json().unwrap();
        let parsed = ReplayLog::from_json(&text).unwrap();
        let ex = replay(&parsed).unwrap();
        assert_eq!(ex.game().state_hash(), log.final_hash);
        assert_eq!(ex.game().ticks(), 20);
    }

    #[test]
    fn test_tampered_log_detected() {
        let mut log = recorded(10);
        log.turns[1].intents.clear();
        assert!(matches!(replay(&log), Err(GameError::Replay(_))));
    }
}
