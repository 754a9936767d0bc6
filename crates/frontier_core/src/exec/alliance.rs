//! Alliance executions. Each acts once, on its first tick, against the world
//! as it is then, and finishes.

use frontier_shared::PlayerId;
use tracing::{debug, warn};

use super::Execution;
use crate::world::Game;

fn both_exist(game: &Game, a: &PlayerId, b: &PlayerId, who: &str) -> bool {
    for id in [a, b] {
        if !game.player(id).is_ok_and(|p| p.is_alive()) {
            warn!(player = %id, "{who}: player not found or eliminated");
            return false;
        }
    }
    true
}

/// Files an alliance request.
#[derive(Debug)]
pub struct AllianceRequestExecution {
    requestor: PlayerId,
    recipient: PlayerId,
    active: bool,
}

impl AllianceRequestExecution {
    /// `requestor` asks `recipient`.
    #[must_use]
    pub const fn new(requestor: PlayerId, recipient: PlayerId) -> Self {
        Self {
            requestor,
            recipient,
            active: true,
        }
    }
}

impl Execution for AllianceRequestExecution {
    fn init(&mut self, game: &mut Game, _tick: u64) {
        self.active = both_exist(game, &self.requestor, &self.recipient, self.name());
    }

    fn tick(&mut self, game: &mut Game, _tick: u64) {
        match game.request_alliance(&self.requestor, &self.recipient) {
            Ok(true) => debug!(requestor = %self.requestor, recipient = %self.recipient, "alliance requested"),
            Ok(false) => debug!(requestor = %self.requestor, recipient = %self.recipient, "request already pending or allied"),
            Err(err) => warn!(%err, "alliance request failed"),
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn owner(&self) -> Option<&PlayerId> {
        Some(&self.requestor)
    }

    fn active_during_spawn_phase(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "AllianceRequestExecution"
    }

    fn target(&self) -> Option<&PlayerId> {
        Some(&self.recipient)
    }
}

/// Answers a pending request.
#[derive(Debug)]
pub struct AllianceReplyExecution {
    requestor: PlayerId,
    recipient: PlayerId,
    accept: bool,
    active: bool,
}

impl AllianceReplyExecution {
    /// `recipient` answers `requestor`.
    #[must_use]
    pub const fn new(requestor: PlayerId, recipient: PlayerId, accept: bool) -> Self {
        Self {
            requestor,
            recipient,
            accept,
            active: true,
        }
    }
}

impl Execution for AllianceReplyExecution {
    fn init(&mut self, game: &mut Game, _tick: u64) {
        self.active = both_exist(game, &self.requestor, &self.recipient, self.name());
    }

    fn tick(&mut self, game: &mut Game, _tick: u64) {
        match game.reply_alliance(&self.requestor, &self.recipient, self.accept) {
            Ok(true) => debug!(requestor = %self.requestor, recipient = %self.recipient, accept = self.accept, "alliance request answered"),
            Ok(false) => warn!(requestor = %self.requestor, recipient = %self.recipient, "no pending alliance request"),
            Err(err) => warn!(%err, "alliance reply failed"),
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn owner(&self) -> Option<&PlayerId> {
        Some(&self.recipient)
    }

    fn active_during_spawn_phase(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "AllianceReplyExecution"
    }

    fn target(&self) -> Option<&PlayerId> {
        Some(&self.requestor)
    }
}

/// Ends an alliance.
#[derive(Debug)]
pub struct BreakAllianceExecution {
    requestor: PlayerId,
    recipient: PlayerId,
    active: bool,
}

impl BreakAllianceExecution {
    /// `requestor` breaks with `recipient`.
    #[must_use]
    pub const fn new(requestor: PlayerId, recipient: PlayerId) -> Self {
        Self {
            requestor,
            recipient,
            active: true,
        }
    }
}

impl Execution for BreakAllianceExecution {
    fn init(&mut self, game: &mut Game, _tick: u64) {
        self.active = both_exist(game, &self.requestor, &self.recipient, self.name());
    }

    fn tick(&mut self, game: &mut Game, _tick: u64) {
        match game.break_alliance(&self.requestor, &self.recipient) {
            Ok(true) => debug!(requestor = %self.requestor, recipient = %self.recipient, "alliance broken"),
            Ok(false) => warn!(requestor = %self.requestor, recipient = %self.recipient, "not allied"),
            Err(err) => warn!(%err, "break alliance failed"),
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn owner(&self) -> Option<&PlayerId> {
        Some(&self.requestor)
    }

    fn active_during_spawn_phase(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "BreakAllianceExecution"
    }

    fn target(&self) -> Option<&PlayerId> {
        Some(&self.recipient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use frontier_shared::{Cell, PlayerType};

    fn game() -> Game {
        let mut game = Game::new(GameConfig::default()).unwrap();
        game.spawn_player(None, &"P1".into(), "P1", PlayerType::Bot, Cell::new(5, 5))
            .unwrap();
        game.spawn_player(None, &"P2".into(), "P2", PlayerType::Bot, Cell::new(50, 50))
            .unwrap();
        game
    }

    fn run(exec: &mut dyn Execution, game: &mut Game) {
        exec.init(game, 0);
        if exec.is_active() {
            exec.tick(game, 0);
        }
    }

    #[test]
    fn test_request_then_accept() {
        let mut game = game();
        let (p1, p2) = (PlayerId::from("P1"), PlayerId::from("P2"));
        run(&mut AllianceRequestExecution::new(p1.clone(), p2.clone()), &mut game);
        assert!(game.alliances().has_request(&p1, &p2));
        run(&mut AllianceReplyExecution::new(p1.clone(), p2.clone(), true), &mut game);
        assert!(game.is_allied(&p1, &p2));
        run(&mut BreakAllianceExecution::new(p2.clone(), p1.clone()), &mut game);
        assert!(!game.is_allied(&p1, &p2));
    }

    #[test]
    fn test_reply_without_request_changes_nothing() {
        let mut game = game();
        let (p1, p2) = (PlayerId::from("P1"), PlayerId::from("P2"));
        let mut reply = AllianceReplyExecution::new(p1.clone(), p2.clone(), true);
        run(&mut reply, &mut game);
        assert!(!reply.is_active());
        assert!(!game.is_allied(&p1, &p2));
    }

    #[test]
    fn test_unknown_player_rejected_in_init() {
        let mut game = game();
        let mut exec = AllianceRequestExecution::new("P1".into(), "nobody".into());
        exec.init(&mut game, 0);
        assert!(!exec.is_active());
    }
}
