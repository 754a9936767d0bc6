//! # Ground Attack
//!
//! Commits troops against a neighbour (or unclaimed land) and eats into the
//! shared border a few tiles per tick.
//!
//! Each conquered tile costs `base_tile_cost + density + jitter` troops,
//! where `density` is the defender's troops per tile and `jitter` is drawn
//! from the game RNG. The defender loses `density` troops per tile taken.
//! The attack ends when troops run out or no border is left; unspent troops
//! go home. An alliance with the target mid-attack turns it into a retreat.
//!
//! Border tiles are taken closest-first to the aim cell (or the launch cell),
//! ties broken by tile index, so the order never depends on set iteration.

use std::collections::BTreeSet;

use frontier_shared::{Cell, PlayerId, TileRef};
use rand::Rng;
use tracing::{debug, info, warn};

use super::Execution;
use crate::world::{Game, UNOWNED};

/// A ground attack.
#[derive(Debug)]
pub struct AttackExecution {
    attacker: PlayerId,
    target: Option<PlayerId>,
    requested: Option<u32>,
    source: Option<Cell>,
    aim: Option<Cell>,
    troops: u32,
    committed: bool,
    active: bool,
}

impl AttackExecution {
    /// Attack with troops still at home. `troops = None` commits
    /// `combat.attack_troop_percent` of the attacker's troops.
    #[must_use]
    pub const fn new(
        attacker: PlayerId,
        target: Option<PlayerId>,
        troops: Option<u32>,
        source: Option<Cell>,
        aim: Option<Cell>,
    ) -> Self {
        Self {
            attacker,
            target,
            requested: troops,
            source,
            aim,
            troops: 0,
            committed: false,
            active: true,
        }
    }

    /// Attack with troops already taken from the attacker, e.g. the cargo
    /// of a boat that just landed.
    #[must_use]
    pub const fn with_committed_troops(
        attacker: PlayerId,
        target: Option<PlayerId>,
        troops: u32,
        beachhead: Option<Cell>,
    ) -> Self {
        Self {
            attacker,
            target,
            requested: Some(troops),
            source: beachhead,
            aim: None,
            troops,
            committed: true,
            active: true,
        }
    }

    /// Troops still in the field.
    #[must_use]
    pub const fn troops(&self) -> u32 {
        self.troops
    }

    fn retreat(&mut self, game: &mut Game) {
        if self.troops > 0 {
            if let Ok(p) = game.player_mut(&self.attacker) {
                p.add_troops(self.troops);
            }
            self.troops = 0;
        }
        self.active = false;
    }

    /// Defender's small id, or `None` if the target vanished.
    fn target_small_id(&self, game: &Game) -> Option<u16> {
        match &self.target {
            None => Some(UNOWNED),
            Some(id) => game.player(id).ok().map(|p| p.small_id()),
        }
    }

    fn border(&self, game: &Game, target_small: u16) -> Vec<TileRef> {
        let Ok(attacker) = game.player(&self.attacker) else {
            return Vec::new();
        };
        let map = game.map();
        let mut border = BTreeSet::new();
        for &tile in attacker.tiles() {
            for n in map.neighbors(tile) {
                if map.is_land(n) && map.owner(n) == target_small {
                    border.insert(n);
                }
            }
        }
        let mut border: Vec<TileRef> = border.into_iter().collect();
        if let Some(focus) = self.aim.or(self.source) {
            border.sort_by_key(|&t| (map.cell(t).distance_squared(focus), t));
        }
        border
    }
}

impl Execution for AttackExecution {
    fn init(&mut self, game: &mut Game, _tick: u64) {
        let Ok(attacker) = game.player(&self.attacker) else {
            warn!(player = %self.attacker, "AttackExecution: attacker not found");
            self.active = false;
            return;
        };
        if !attacker.is_alive() {
            warn!(player = %self.attacker, "AttackExecution: attacker is dead");
            self.retreat(game);
            return;
        }
        if let Some(target) = &self.target {
            if !game.has_player(target) {
                warn!(player = %self.attacker, %target, "AttackExecution: target not found");
                self.retreat(game);
                return;
            }
            if target == &self.attacker || game.is_allied(&self.attacker, target) {
                warn!(player = %self.attacker, %target, "cannot attack self or ally");
                self.retreat(game);
                return;
            }
        }
        if self.committed {
            return;
        }

        let percent = game.config().combat.attack_troop_percent;
        let Ok(p) = game.player_mut(&self.attacker) else {
            self.active = false;
            return;
        };
        let wanted = self
            .requested
            .unwrap_or_else(|| u32::try_from(u64::from(p.troops) * u64::from(percent) / 100).unwrap_or(0));
        self.troops = p.take_troops(wanted);
        if self.troops == 0 {
            warn!(player = %self.attacker, "attack launched without troops");
            self.active = false;
        }
    }

    fn tick(&mut self, game: &mut Game, tick: u64) {
        if let Some(target) = &self.target {
            if game.is_allied(&self.attacker, target) {
                info!(player = %self.attacker, %target, "attack called off, now allied");
                self.retreat(game);
                return;
            }
        }
        if !game.player(&self.attacker).is_ok_and(|p| p.is_alive()) {
            self.troops = 0;
            self.active = false;
            return;
        }
        let Some(target_small) = self.target_small_id(game) else {
            self.retreat(game);
            return;
        };

        let combat = game.config().combat.clone();
        let border = self.border(game, target_small);
        if border.is_empty() {
            debug!(player = %self.attacker, tick, "no border left");
            self.retreat(game);
            return;
        }

        for tile in border.into_iter().take(combat.tiles_per_tick as usize) {
            let density = game
                .player_by_small_id(target_small)
                .map_or(0, |d| d.troops() / d.tiles_owned().max(1));
            let jitter = game.rng().gen_range(0..=combat.jitter);
            let cost = combat
                .base_tile_cost
                .saturating_add(density)
                .saturating_add(jitter);
            if self.troops < cost {
                self.retreat(game);
                return;
            }
            self.troops -= cost;
            if let Some(defender) = &self.target {
                if let Ok(d) = game.player_mut(defender) {
                    d.take_troops(density);
                }
            }
            if let Err(err) = game.conquer(&self.attacker, tile) {
                warn!(player = %self.attacker, %err, "conquest failed");
                self.retreat(game);
                return;
            }
        }
        if self.troops == 0 {
            self.active = false;
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
        "AttackExecution"
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

    fn duel() -> Game {
        let mut config = GameConfig::default();
        config.map.width = 12;
        config.map.height = 6;
        config.map.spawn_radius = 1;
        config.economy.starting_troops = 1_000;
        let mut game = Game::new(config).unwrap();
        game.spawn_player(None, &"P1".into(), "P1", PlayerType::Bot, Cell::new(3, 3))
            .unwrap();
        game.spawn_player(None, &"P2".into(), "P2", PlayerType::Bot, Cell::new(6, 3))
            .unwrap();
        game
    }

    #[test]
    fn test_null_troops_commits_percentage() {
        let mut game = duel();
        let mut attack = AttackExecution::new("P1".into(), Some("P2".into()), None, None, None);
        attack.init(&mut game, 0);
        assert_eq!(attack.troops(), 200);
        assert_eq!(game.player(&"P1".into()).unwrap().troops(), 800);
    }

    #[test]
    fn test_attack_takes_border_of_unclaimed_land() {
        let mut game = duel();
        let before = game.player(&"P1".into()).unwrap().tiles_owned();
        let mut attack = AttackExecution::new("P1".into(), None, Some(500), None, None);
        attack.init(&mut game, 0);
        attack.tick(&mut game, 0);
        let after = game.player(&"P1".into()).unwrap().tiles_owned();
        assert_eq!(after - before, game.config().combat.tiles_per_tick);
    }

    #[test]
    fn test_attack_on_ally_rejected() {
        let mut game = duel();
        let (p1, p2) = (PlayerId::from("P1"), PlayerId::from("P2"));
        game.request_alliance(&p1, &p2).unwrap();
        game.reply_alliance(&p1, &p2, true).unwrap();
        let mut attack = AttackExecution::new(p1.clone(), Some(p2), None, None, None);
        attack.init(&mut game, 0);
        assert!(!attack.is_active());
        assert_eq!(game.player(&p1).unwrap().troops(), 1_000);
    }

    #[test]
    fn test_alliance_mid_attack_retreats() {
        let mut game = duel();
        let (p1, p2) = (PlayerId::from("P1"), PlayerId::from("P2"));
        let mut attack = AttackExecution::new(p1.clone(), Some(p2.clone()), Some(300), None, None);
        attack.init(&mut game, 0);
        game.request_alliance(&p1, &p2).unwrap();
        game.reply_alliance(&p1, &p2, true).unwrap();
        attack.tick(&mut game, 1);
        assert!(!attack.is_active());
        assert_eq!(game.player(&p1).unwrap().troops(), 1_000);
    }

    #[test]
    fn test_unknown_target_deactivates() {
        let mut game = duel();
        let mut attack = AttackExecution::new("P1".into(), Some("P9".into()), None, None, None);
        attack.init(&mut game, 0);
        assert!(!attack.is_active());
    }
}
