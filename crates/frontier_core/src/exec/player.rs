//! Per-player upkeep: troop and gold growth, elimination.

use frontier_shared::PlayerId;
use tracing::{info, warn};

use super::Execution;
use crate::world::Game;

/// Grows a player's troops and gold every tick after the spawn phase and
/// marks the player dead once it holds no land.
#[derive(Debug)]
pub struct PlayerExecution {
    player: PlayerId,
    active: bool,
}

impl PlayerExecution {
    /// Upkeep for one player.
    #[must_use]
    pub const fn new(player: PlayerId) -> Self {
        Self {
            player,
            active: true,
        }
    }
}

impl Execution for PlayerExecution {
    fn init(&mut self, game: &mut Game, _tick: u64) {
        if !game.has_player(&self.player) {
            warn!(player = %self.player, "PlayerExecution: player not found");
            self.active = false;
        }
    }

    fn tick(&mut self, game: &mut Game, tick: u64) {
        let economy = game.config().economy.clone();
        let Ok(p) = game.player_mut(&self.player) else {
            self.active = false;
            return;
        };
        if p.tiles.is_empty() {
            p.alive = false;
            self.active = false;
            info!(player = %self.player, tick, "player eliminated");
            return;
        }

        let tiles = p.tiles_owned();
        let cap = tiles.saturating_mul(economy.max_troops_per_tile);
        if p.troops < cap {
            let growth = economy
                .troop_growth_base
                .saturating_add(tiles.saturating_mul(economy.troop_growth_per_100_tiles) / 100);
            p.troops = p.troops.saturating_add(growth).min(cap);
        }
        p.add_gold(economy.gold_per_tick);
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn owner(&self) -> Option<&PlayerId> {
        Some(&self.player)
    }

    fn active_during_spawn_phase(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "PlayerExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use frontier_shared::{Cell, PlayerType};

    fn game_with_player(starting_troops: u32) -> (Game, PlayerId) {
        let mut config = GameConfig::default();
        config.economy.starting_troops = starting_troops;
        let mut game = Game::new(config).unwrap();
        let p1 = PlayerId::from("P1");
        game.spawn_player(None, &p1, "P1", PlayerType::Bot, Cell::new(5, 5))
            .unwrap();
        (game, p1)
    }

    #[test]
    fn test_growth_respects_cap() {
        let (mut game, p1) = game_with_player(0);
        let mut exec = PlayerExecution::new(p1.clone());
        exec.init(&mut game, 0);
        for t in 0..1_000 {
            exec.tick(&mut game, t);
        }
        let p = game.player(&p1).unwrap();
        assert_eq!(p.troops(), p.tiles_owned() * game.config().economy.max_troops_per_tile);
    }

    #[test]
    fn test_eliminated_without_land() {
        let (mut game, p1) = game_with_player(100);
        game.spawn_player(None, &"P2".into(), "P2", PlayerType::Bot, Cell::new(50, 50))
            .unwrap();
        let tiles: Vec<_> = game.player(&p1).unwrap().tiles().iter().copied().collect();
        for t in tiles {
            game.conquer(&"P2".into(), t).unwrap();
        }
        let mut exec = PlayerExecution::new(p1.clone());
        exec.init(&mut game, 0);
        exec.tick(&mut game, 0);
        assert!(!exec.is_active());
        assert!(!game.player(&p1).unwrap().is_alive());
    }
}
