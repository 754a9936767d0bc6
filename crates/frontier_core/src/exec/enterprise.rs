//! Stand-alone enterprise: build on an existing capital, then earn income.

use frontier_shared::{PlayerId, TileRef, UnitId, UnitType};
use tracing::{info, warn};

use super::Execution;
use crate::world::Game;

/// Builds one enterprise and pays its income while it stands.
#[derive(Debug)]
pub struct EnterpriseExecution {
    player: PlayerId,
    tile: TileRef,
    enterprise: Option<UnitId>,
    active: bool,
}

impl EnterpriseExecution {
    /// Enterprise for `player` at `tile`.
    #[must_use]
    pub const fn new(player: PlayerId, tile: TileRef) -> Self {
        Self {
            player,
            tile,
            enterprise: None,
            active: true,
        }
    }

    /// The enterprise, once built.
    #[must_use]
    pub const fn enterprise(&self) -> Option<UnitId> {
        self.enterprise
    }
}

impl Execution for EnterpriseExecution {
    fn init(&mut self, game: &mut Game, _tick: u64) {
        if !game.has_player(&self.player) {
            warn!(player = %self.player, "EnterpriseExecution: player not found");
            self.active = false;
        }
    }

    fn tick(&mut self, game: &mut Game, _tick: u64) {
        let Some(id) = self.enterprise else {
            let Some(site) = game.can_build(&self.player, UnitType::Enterprise, self.tile) else {
                warn!(player = %self.player, tile = self.tile, "cannot build enterprise");
                self.active = false;
                return;
            };
            match game.build_unit(&self.player, UnitType::Enterprise, 0, site) {
                Ok(id) => self.enterprise = Some(id),
                Err(err) => {
                    warn!(player = %self.player, %err, "enterprise build failed");
                    self.active = false;
                }
            }
            return;
        };

        let standing = game
            .unit(id)
            .is_ok_and(|u| u.is_active() && u.owner() == &self.player);
        if !standing {
            info!(player = %self.player, %id, "enterprise lost");
            self.active = false;
            return;
        }
        let income = game.config().economy.enterprise_income;
        if let Ok(p) = game.player_mut(&self.player) {
            p.add_gold(income);
        }
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
        "EnterpriseExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use frontier_shared::{Cell, PlayerType};

    #[test]
    fn test_needs_capital() {
        let mut game = Game::new(GameConfig::default()).unwrap();
        let p1 = PlayerId::from("P1");
        game.spawn_player(None, &p1, "P1", PlayerType::Bot, Cell::new(5, 5))
            .unwrap();
        let tile = game.map().tile_at(Cell::new(5, 5)).unwrap();

        let mut exec = EnterpriseExecution::new(p1, tile);
        exec.init(&mut game, 0);
        exec.tick(&mut game, 0);
        assert!(!exec.is_active());
        assert_eq!(exec.enterprise(), None);
    }

    #[test]
    fn test_income_after_build() {
        let mut game = Game::new(GameConfig::default()).unwrap();
        let p1 = PlayerId::from("P1");
        game.spawn_player(None, &p1, "P1", PlayerType::Bot, Cell::new(5, 5))
            .unwrap();
        let tile = game.map().tile_at(Cell::new(5, 5)).unwrap();
        game.build_unit(&p1, UnitType::City, 0, tile).unwrap();
        game.build_unit(&p1, UnitType::Capital, 0, tile).unwrap();

        let mut exec = EnterpriseExecution::new(p1.clone(), tile);
        exec.init(&mut game, 0);
        exec.tick(&mut game, 0);
        assert!(exec.enterprise().is_some());
        let before = game.player(&p1).unwrap().gold();
        exec.tick(&mut game, 1);
        let after = game.player(&p1).unwrap().gold();
        assert_eq!(after - before, game.config().economy.enterprise_income);
    }
}
