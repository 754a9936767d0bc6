//! City build chain: City, then Capital, then Enterprise on the same tile.

use frontier_shared::{PlayerId, TileRef, UnitId, UnitType};
use tracing::{debug, info, warn};

use super::Execution;
use crate::world::Game;

/// Stages of the chain, in build order.
const CHAIN: [UnitType; 3] = [UnitType::City, UnitType::Capital, UnitType::Enterprise];

/// Builds one stage every `construction.ticks` ticks, then runs the
/// finished enterprise for income.
///
/// A stage that fails placement ends the chain for good. If any unit already
/// built is destroyed or captured, the chain stops as well: nothing is built
/// on a dead foundation.
#[derive(Debug)]
pub struct CityExecution {
    player: PlayerId,
    tile: TileRef,
    built: Vec<UnitId>,
    next_build: u64,
    active: bool,
}

impl CityExecution {
    /// Chain for `player` at `tile`.
    #[must_use]
    pub fn new(player: PlayerId, tile: TileRef) -> Self {
        Self {
            player,
            tile,
            built: Vec::with_capacity(CHAIN.len()),
            next_build: 0,
            active: true,
        }
    }

    /// Units built so far, in chain order.
    #[must_use]
    pub fn built(&self) -> &[UnitId] {
        &self.built
    }

    fn foundation_intact(&self, game: &Game) -> bool {
        self.built.iter().all(|&id| {
            game.unit(id)
                .is_ok_and(|u| u.is_active() && u.owner() == &self.player)
        })
    }
}

impl Execution for CityExecution {
    fn init(&mut self, game: &mut Game, tick: u64) {
        if !game.has_player(&self.player) {
            warn!(player = %self.player, "CityExecution: player not found");
            self.active = false;
            return;
        }
        self.next_build = tick;
    }

    fn tick(&mut self, game: &mut Game, tick: u64) {
        if !self.foundation_intact(game) {
            info!(player = %self.player, tile = self.tile, "city chain lost its foundation");
            self.active = false;
            return;
        }

        let Some(&unit_type) = CHAIN.get(self.built.len()) else {
            let income = game.config().economy.enterprise_income;
            if let Ok(p) = game.player_mut(&self.player) {
                p.add_gold(income);
            }
            return;
        };
        if tick < self.next_build {
            return;
        }

        let Some(site) = game.can_build(&self.player, unit_type, self.tile) else {
            warn!(player = %self.player, tile = self.tile, ?unit_type, "cannot build");
            self.active = false;
            return;
        };
        match game.build_unit(&self.player, unit_type, 0, site) {
            Ok(id) => {
                debug!(player = %self.player, %id, ?unit_type, "built");
                self.built.push(id);
                self.next_build = tick + game.config().construction.ticks;
            }
            Err(err) => {
                warn!(player = %self.player, %err, "build failed");
                self.active = false;
            }
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
        "CityExecution"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use frontier_shared::{Cell, PlayerType};

    fn setup() -> (Game, PlayerId, TileRef) {
        let mut config = GameConfig::default();
        config.map.width = 16;
        config.map.height = 16;
        let mut game = Game::new(config).unwrap();
        let p1 = PlayerId::from("P1");
        game.spawn_player(Some("c1".into()), &p1, "P1", PlayerType::Human, Cell::new(8, 8))
            .unwrap();
        let tile = game.map().tile_at(Cell::new(8, 8)).unwrap();
        (game, p1, tile)
    }

    fn run(exec: &mut CityExecution, game: &mut Game, ticks: u64) {
        for _ in 0..ticks {
            let tick = game.ticks();
            if exec.is_active() {
                exec.tick(game, tick);
            }
            game.finish_tick();
        }
    }

    #[test]
    fn test_chain_builds_in_order() {
        let (mut game, p1, tile) = setup();
        let step = game.config().construction.ticks;
        let mut exec = CityExecution::new(p1.clone(), tile);
        exec.init(&mut game, 0);

        run(&mut exec, &mut game, 1);
        assert_eq!(exec.built().len(), 1);
        run(&mut exec, &mut game, step);
        assert_eq!(exec.built().len(), 2);
        run(&mut exec, &mut game, step);
        assert_eq!(exec.built().len(), 3);

        let types: Vec<_> = exec
            .built()
            .iter()
            .map(|&id| game.unit(id).unwrap().unit_type())
            .collect();
        assert_eq!(types, CHAIN.to_vec());
        assert!(exec.is_active());
    }

    #[test]
    fn test_fail_fast_outside_territory() {
        let (mut game, p1, _) = setup();
        let far = game.map().tile_at(Cell::new(0, 0)).unwrap();
        let mut exec = CityExecution::new(p1, far);
        exec.init(&mut game, 0);
        run(&mut exec, &mut game, 1);
        assert!(!exec.is_active());
        assert!(game.units().is_empty());
    }

    #[test]
    fn test_unknown_player_deactivates_in_init() {
        let (mut game, _, tile) = setup();
        let mut exec = CityExecution::new("ghost".into(), tile);
        exec.init(&mut game, 0);
        assert!(!exec.is_active());
    }

    #[test]
    fn test_destroyed_city_stops_chain() {
        let (mut game, p1, tile) = setup();
        let mut exec = CityExecution::new(p1, tile);
        exec.init(&mut game, 0);
        run(&mut exec, &mut game, 1);
        let city = exec.built()[0];
        game.delete_unit(city).unwrap();
        run(&mut exec, &mut game, 1);
        assert!(!exec.is_active());
        assert_eq!(game.units().len(), 1);
    }
}
