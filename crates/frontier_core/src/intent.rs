//! # Intent Admission
//!
//! Turns a schema-valid [`Intent`] into a world change at a tick boundary.
//!
//! Authorization is checked here against the world as it is *now*: the
//! acting player must exist and be bound to the sending client. Spawns are
//! applied directly; everything else becomes an execution, which re-checks
//! its own preconditions when it runs.

use frontier_shared::{Cell, ClientId, Intent, PlayerId, UnitType};

use crate::error::{GameError, GameResult};
use crate::exec::{
    AllianceReplyExecution, AllianceRequestExecution, AttackExecution, BoatExecution,
    BreakAllianceExecution, CityExecution, EnterpriseExecution, Execution, PlayerExecution,
};
use crate::world::Game;

/// Outcome of admitting one intent.
pub enum Admission {
    /// The world was changed directly; nothing to schedule.
    Applied,
    /// An execution to schedule.
    Scheduled(Box<dyn Execution>),
}

impl std::fmt::Debug for Admission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Applied => f.write_str("Applied"),
            Self::Scheduled(exec) => f.debug_tuple("Scheduled").field(&exec.name()).finish(),
        }
    }
}

fn authorize(game: &Game, player: &PlayerId, client: &ClientId) -> GameResult<()> {
    let p = game.player(player)?;
    if p.is_controlled_by(client) {
        Ok(())
    } else {
        Err(GameError::Unauthorized {
            player: player.clone(),
            client: client.clone(),
        })
    }
}

/// Admits one intent.
///
/// # Errors
///
/// - [`GameError::PlayerNotFound`] / [`GameError::Unauthorized`] for the
///   acting player
/// - spawn errors from [`Game::spawn_player`]
/// - [`GameError::TileOutOfBounds`] / [`GameError::UnsupportedUnit`] for
///   builds
pub fn admit(game: &mut Game, intent: Intent) -> GameResult<Admission> {
    if !matches!(intent, Intent::Spawn(_)) {
        authorize(game, intent.actor(), intent.client_id())?;
    }
    let execution: Box<dyn Execution> = match intent {
        Intent::Spawn(spawn) => {
            let created = game.spawn_player(
                Some(spawn.client_id),
                &spawn.player_id,
                &spawn.name,
                spawn.player_type,
                Cell::new(spawn.x, spawn.y),
            )?;
            if !created {
                return Ok(Admission::Applied);
            }
            Box::new(PlayerExecution::new(spawn.player_id))
        }
        Intent::Attack(a) => {
            let source = a.source_cell();
            let aim = a.target_cell();
            Box::new(AttackExecution::new(a.attacker_id, a.target_id, a.troops, source, aim))
        }
        Intent::Boat(b) => Box::new(BoatExecution::new(
            b.attacker_id,
            b.target_id,
            b.troops,
            Cell::new(b.x, b.y),
        )),
        Intent::AllianceRequest(r) => {
            Box::new(AllianceRequestExecution::new(r.requestor, r.recipient))
        }
        Intent::AllianceRequestReply(r) => {
            Box::new(AllianceReplyExecution::new(r.requestor, r.recipient, r.accept))
        }
        Intent::BreakAlliance(r) => Box::new(BreakAllianceExecution::new(r.requestor, r.recipient)),
        Intent::BuildUnit(b) => {
            let tile = game
                .map()
                .require_tile(Cell::new(b.x, b.y))?;
            match b.unit_type {
                UnitType::City => Box::new(CityExecution::new(b.player_id, tile)),
                UnitType::Enterprise => Box::new(EnterpriseExecution::new(b.player_id, tile)),
                other => return Err(GameError::UnsupportedUnit(other)),
            }
        }
    };
    Ok(Admission::Scheduled(execution))
}
