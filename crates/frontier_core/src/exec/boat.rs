//! # Naval Landing
//!
//! A transport ship carries troops from one of the attacker's shore tiles to
//! a coastal landing tile, then hands them to a ground attack.
//!
//! The route is a breadth-first search over water starting at the landing
//! tile, so every reached water tile knows its next step toward the target.
//! The launch tile is the attacker shore tile with the shortest route, ties
//! broken by tile index. Neighbours expand in N, E, S, W order, which makes
//! the route itself deterministic.

use std::collections::VecDeque;

use frontier_shared::{Cell, PlayerId, TileRef, UnitId, UnitType};
use tracing::{debug, info, warn};

use super::{AttackExecution, Execution};
use crate::world::{Game, GameMap, UNOWNED};

/// Route found for a landing.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    /// Attacker shore tile where the ship is built.
    launch: TileRef,
    /// Water tiles in travel order, then the landing tile.
    path: Vec<TileRef>,
}

/// Water BFS from `dest`, returning the best route from any of `shore`.
fn plan_route(map: &GameMap, shore: impl Iterator<Item = TileRef>, dest: TileRef, limit: usize) -> Option<Route> {
    const UNSEEN: u32 = u32::MAX;
    let mut dist = vec![UNSEEN; map.tile_count()];
    let mut next_hop = vec![dest; map.tile_count()];
    let mut queue = VecDeque::new();
    let mut seen = 0usize;

    for w in map.neighbors(dest).filter(|&n| map.is_water(n)) {
        dist[w as usize] = 0;
        queue.push_back(w);
    }
    while let Some(tile) = queue.pop_front() {
        seen += 1;
        if seen > limit {
            break;
        }
        let d = dist[tile as usize];
        for n in map.neighbors(tile) {
            if map.is_water(n) && dist[n as usize] == UNSEEN {
                dist[n as usize] = d + 1;
                next_hop[n as usize] = tile;
                queue.push_back(n);
            }
        }
    }

    let (_, launch, start) = shore
        .flat_map(|s| {
            map.neighbors(s)
                .filter(|&w| map.is_water(w) && dist[w as usize] != UNSEEN)
                .map(move |w| (s, w))
                .collect::<Vec<_>>()
        })
        .map(|(s, w)| (dist[w as usize], s, w))
        .min()?;

    let mut path = vec![start];
    let mut at = start;
    while dist[at as usize] > 0 {
        at = next_hop[at as usize];
        path.push(at);
    }
    path.push(dest);
    Some(Route { launch, path })
}

/// A troop transport.
#[derive(Debug)]
pub struct BoatExecution {
    attacker: PlayerId,
    target: Option<PlayerId>,
    troops: u32,
    landing: Cell,
    route: Vec<TileRef>,
    step: usize,
    boat: Option<UnitId>,
    active: bool,
}

impl BoatExecution {
    /// Ship `troops` from `attacker`'s coast to `landing`.
    #[must_use]
    pub const fn new(attacker: PlayerId, target: Option<PlayerId>, troops: u32, landing: Cell) -> Self {
        Self {
            attacker,
            target,
            troops,
            landing,
            route: Vec::new(),
            step: 0,
            boat: None,
            active: true,
        }
    }

    /// The ship, once launched.
    #[must_use]
    pub const fn boat(&self) -> Option<UnitId> {
        self.boat
    }

    fn abort(&mut self, game: &mut Game, refund: bool) {
        if refund && self.troops > 0 {
            if let Ok(p) = game.player_mut(&self.attacker) {
                p.add_troops(self.troops);
            }
        }
        if let Some(boat) = self.boat {
            if let Err(err) = game.delete_unit(boat) {
                warn!(player = %self.attacker, %err, "transport ship not removed");
            }
        }
        self.troops = 0;
        self.active = false;
    }

    fn land(&mut self, game: &mut Game, dest: TileRef) {
        let defender = game.owner_of(dest).map(|p| p.id().clone());
        if let Some(boat) = self.boat {
            if let Err(err) = game.delete_unit(boat) {
                warn!(player = %self.attacker, %err, "transport ship not removed");
            }
        }
        if defender.as_ref() == Some(&self.attacker) {
            self.abort(game, true);
            return;
        }
        if let Some(d) = &defender {
            if game.is_allied(&self.attacker, d) {
                info!(player = %self.attacker, ally = %d, "landing tile now allied, returning home");
                self.abort(game, true);
                return;
            }
        }
        if let Err(err) = game.conquer(&self.attacker, dest) {
            warn!(player = %self.attacker, %err, "landing failed");
            self.abort(game, false);
            return;
        }
        debug!(player = %self.attacker, tile = dest, troops = self.troops, "landed");
        game.queue_execution(Box::new(AttackExecution::with_committed_troops(
            self.attacker.clone(),
            defender,
            self.troops,
            Some(self.landing),
        )));
        self.troops = 0;
        self.active = false;
    }
}

impl Execution for BoatExecution {
    fn init(&mut self, game: &mut Game, _tick: u64) {
        let Ok(attacker) = game.player(&self.attacker) else {
            warn!(player = %self.attacker, "BoatExecution: attacker not found");
            self.active = false;
            return;
        };
        if !attacker.is_alive() {
            self.active = false;
            return;
        }
        let Some(dest) = game.map().tile_at(self.landing) else {
            warn!(player = %self.attacker, cell = %self.landing, "landing off the map");
            self.active = false;
            return;
        };
        if !game.map().is_shore(dest) {
            warn!(player = %self.attacker, cell = %self.landing, "landing tile is not coast");
            self.active = false;
            return;
        }
        let owner = game.map().owner(dest);
        let expected = match &self.target {
            Some(t) => game.player(t).ok().map(|p| p.small_id()),
            None => Some(UNOWNED),
        };
        if expected != Some(owner) || owner == attacker.small_id() {
            warn!(player = %self.attacker, cell = %self.landing, "landing tile does not belong to the target");
            self.active = false;
            return;
        }
        if let Some(t) = &self.target {
            if game.is_allied(&self.attacker, t) {
                warn!(player = %self.attacker, target = %t, "cannot land on an ally");
                self.active = false;
                return;
            }
        }

        let limit = game.config().boats.max_path_tiles as usize;
        let shore = attacker
            .tiles()
            .iter()
            .copied()
            .filter(|&t| game.map().is_shore(t));
        let Some(route) = plan_route(game.map(), shore, dest, limit) else {
            warn!(player = %self.attacker, cell = %self.landing, "no water route");
            self.active = false;
            return;
        };
        if game
            .can_build(&self.attacker, UnitType::TransportShip, route.launch)
            .is_none()
        {
            warn!(player = %self.attacker, "cannot launch transport ship");
            self.active = false;
            return;
        }

        let Ok(p) = game.player_mut(&self.attacker) else {
            self.active = false;
            return;
        };
        self.troops = p.take_troops(self.troops);
        if self.troops == 0 {
            warn!(player = %self.attacker, "boat launched without troops");
            self.active = false;
            return;
        }
        match game.build_unit(&self.attacker, UnitType::TransportShip, self.troops, route.launch) {
            Ok(id) => {
                self.boat = Some(id);
                self.route = route.path;
            }
            Err(err) => {
                warn!(player = %self.attacker, %err, "transport ship build failed");
                self.abort(game, true);
            }
        }
    }

    fn tick(&mut self, game: &mut Game, _tick: u64) {
        let Some(boat) = self.boat else {
            self.active = false;
            return;
        };
        if !game.unit(boat).is_ok_and(|u| u.is_active()) {
            info!(player = %self.attacker, %boat, "transport ship lost at sea");
            self.abort(game, false);
            return;
        }
        for _ in 0..game.config().boats.speed {
            let Some(&next) = self.route.get(self.step) else {
                break;
            };
            self.step += 1;
            if self.step == self.route.len() {
                self.land(game, next);
                return;
            }
            if let Err(err) = game.move_unit(boat, next) {
                warn!(player = %self.attacker, %err, "transport ship stuck");
                self.abort(game, true);
                return;
            }
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn owner(&self) -> Option<&PlayerId> {
        Some(&self.attacker)
    }

    fn active_during_spawn_phase(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "BoatExecution"
    }

    fn target(&self) -> Option<&PlayerId> {
        self.target.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use frontier_shared::PlayerType;

    /// Two islands split by a strait three tiles wide.
    fn islands() -> Game {
        let mut config = GameConfig::default();
        config.map.rows = vec![
            "....~~~....".into(),
            "....~~~....".into(),
            "....~~~....".into(),
        ];
        config.map.spawn_radius = 1;
        let mut game = Game::new(config).unwrap();
        game.spawn_player(None, &"P1".into(), "P1", PlayerType::Bot, Cell::new(3, 1))
            .unwrap();
        game
    }

    #[test]
    fn test_route_crosses_strait() {
        let game = islands();
        let dest = game.map().tile_at(Cell::new(7, 1)).unwrap();
        let shore = game
            .player(&"P1".into())
            .unwrap()
            .tiles()
            .iter()
            .copied()
            .filter(|&t| game.map().is_shore(t))
            .collect::<Vec<_>>();
        let route = plan_route(game.map(), shore.into_iter(), dest, 100).unwrap();
        assert_eq!(game.map().cell(route.launch), Cell::new(3, 1));
        assert_eq!(route.path.len(), 4);
        assert_eq!(route.path.last(), Some(&dest));
    }

    #[test]
    fn test_boat_lands_and_hands_off() {
        let mut game = islands();
        let mut boat = BoatExecution::new("P1".into(), None, 100, Cell::new(7, 1));
        boat.init(&mut game, 0);
        assert!(boat.boat().is_some());
        for t in 0..10 {
            if boat.is_active() {
                boat.tick(&mut game, t);
            }
        }
        assert!(!boat.is_active());
        let landing = game.map().tile_at(Cell::new(7, 1)).unwrap();
        assert_eq!(game.owner_of(landing).map(|p| p.id().as_str()), Some("P1"));
        assert_eq!(game.take_queued().len(), 1);
        assert!(!game.unit(UnitId(0)).unwrap().is_active());
    }

    #[test]
    fn test_landing_on_own_tile_sinks_boat_and_refunds() {
        let mut game = islands();
        let p1 = PlayerId::from("P1");
        let mut boat = BoatExecution::new(p1.clone(), None, 100, Cell::new(7, 1));
        boat.init(&mut game, 0);
        let ship = boat.boat().unwrap();
        let landing = game.map().tile_at(Cell::new(7, 1)).unwrap();
        assert!(game.conquer(&p1, landing).unwrap());

        for t in 0..10 {
            if boat.is_active() {
                boat.tick(&mut game, t);
            }
        }
        assert!(!boat.is_active());
        assert!(!game.unit(ship).unwrap().is_active());
        assert!(game.take_queued().is_empty());
        assert_eq!(game.player(&p1).unwrap().troops(), game.config().economy.starting_troops);
    }

    #[test]
    fn test_inland_target_rejected() {
        let mut game = islands();
        let mut boat = BoatExecution::new("P1".into(), None, 100, Cell::new(10, 1));
        boat.init(&mut game, 0);
        assert!(!boat.is_active());
        assert_eq!(game.player(&"P1".into()).unwrap().troops(), game.config().economy.starting_troops);
    }
}
