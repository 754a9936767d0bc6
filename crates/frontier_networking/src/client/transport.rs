//! # Client Transport
//!
//! Connection state machine plus the outbound half of a client socket.
//!
//! ```text
//!            attach                 detach
//! Connecting ──────► Open ─────────────────► Closed
//!     ▲                                        │
//!     └──────────── Reconnecting ◄─────────────┘
//!        begin_connect          begin_reconnect
//! ```
//!
//! Every send checks the state first. A send while not open is dropped,
//! logged and turned into a reconnect request; nothing is queued across
//! reconnects. The request also wakes the session through
//! [`ClientTransport::reconnect_signal`], so a client whose backoff ran out
//! starts connecting again.

use std::sync::Arc;
use std::time::Duration;

use frontier_shared::{
    AllianceReplyIntent, AllianceRequestIntent, AttackIntent, BoatIntent, BreakAllianceIntent,
    BuildUnitIntent, Cell, ClientId, ClientIntentMessage, ClientMessage, GameId, Intent, PlayerId,
    PlayerType, SpawnIntent, UnitType,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::error::{NetworkError, NetworkResult};
use crate::protocol::encode_client;

/// Where the client connection is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// First connection attempt in progress.
    Connecting,
    /// Socket open; sends go out.
    Open,
    /// Socket gone; waiting for a reconnect.
    #[default]
    Closed,
    /// Reconnect attempt in progress.
    Reconnecting,
}

/// Exponential backoff between reconnect attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any delay.
    pub max_delay: Duration,
    /// Growth factor per attempt.
    pub multiplier: u32,
    /// Give up after this many attempts; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            multiplier: 2,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (1-based), or `None` once the
    /// cap is reached.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || self.max_attempts.is_some_and(|max| attempt > max) {
            return None;
        }
        let factor = self.multiplier.max(1).saturating_pow(attempt - 1);
        Some(self.initial_delay.saturating_mul(factor).min(self.max_delay))
    }
}

/// What happened to a send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum SendOutcome {
    /// Handed to the socket.
    Sent,
    /// Dropped because the connection was not open.
    Dropped,
}

/// Outbound side of one client.
#[derive(Debug)]
pub struct ClientTransport {
    client_id: ClientId,
    game_id: GameId,
    state: ConnectionState,
    policy: ReconnectPolicy,
    attempts: u32,
    outbound: Option<UnboundedSender<String>>,
    reconnect_requested: bool,
    reconnect_signal: Arc<Notify>,
    sent: u64,
    dropped: u64,
}

impl ClientTransport {
    /// A closed transport for `client_id` in `game_id`.
    #[must_use]
    pub fn new(client_id: ClientId, game_id: GameId, policy: ReconnectPolicy) -> Self {
        Self {
            client_id,
            game_id,
            state: ConnectionState::Closed,
            policy,
            attempts: 0,
            outbound: None,
            reconnect_requested: false,
            reconnect_signal: Arc::new(Notify::new()),
            sent: 0,
            dropped: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether sends go out.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// This client.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// The game.
    #[must_use]
    pub const fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Messages sent and dropped so far.
    #[must_use]
    pub const fn counters(&self) -> (u64, u64) {
        (self.sent, self.dropped)
    }

    /// Reconnect attempts since the last successful open.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Notified every time a dropped send asks for a reconnect.
    #[must_use]
    pub fn reconnect_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.reconnect_signal)
    }

    /// Marks the first connection attempt.
    pub fn begin_connect(&mut self) {
        self.state = ConnectionState::Connecting;
    }

    /// Starts over with a fresh backoff after the policy gave up.
    pub fn restart(&mut self) {
        self.attempts = 0;
        self.reconnect_requested = false;
        self.state = ConnectionState::Connecting;
    }

    /// Marks a reconnect attempt and returns the delay to wait first.
    ///
    /// # Errors
    ///
    /// [`NetworkError::ReconnectExhausted`] once the policy gives up; the
    /// transport stays closed.
    pub fn begin_reconnect(&mut self) -> NetworkResult<Duration> {
        self.attempts += 1;
        match self.policy.delay_for(self.attempts) {
            Some(delay) => {
                self.state = ConnectionState::Reconnecting;
                self.reconnect_requested = false;
                info!(attempt = self.attempts, delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX), "attempting reconnect");
                Ok(delay)
            }
            None => {
                self.state = ConnectionState::Closed;
                Err(NetworkError::ReconnectExhausted(self.attempts - 1))
            }
        }
    }

    /// Binds an open socket's outbound queue.
    pub fn attach(&mut self, outbound: UnboundedSender<String>) {
        self.outbound = Some(outbound);
        self.state = ConnectionState::Open;
        self.attempts = 0;
        self.reconnect_requested = false;
    }

    /// Forgets the socket after it closed.
    pub fn detach(&mut self) {
        self.outbound = None;
        self.state = ConnectionState::Closed;
    }

    /// Returns and clears the pending reconnect request.
    pub fn take_reconnect_request(&mut self) -> bool {
        std::mem::take(&mut self.reconnect_requested)
    }

    /// Sends a message if the connection is open.
    pub fn send(&mut self, message: &ClientMessage) -> SendOutcome {
        if self.state == ConnectionState::Open {
            let text = match encode_client(message) {
                Ok(text) => text,
                Err(err) => {
                    warn!(%err, "failed to encode message");
                    self.dropped += 1;
                    return SendOutcome::Dropped;
                }
            };
            let delivered = self
                .outbound
                .as_ref()
                .is_some_and(|outbound| outbound.send(text).is_ok());
            if delivered {
                self.sent += 1;
                return SendOutcome::Sent;
            }
            self.detach();
        }
        self.dropped += 1;
        warn!(state = ?self.state, client = %self.client_id, "connection not open, message dropped");
        if matches!(self.state, ConnectionState::Closed) {
            info!(client = %self.client_id, "attempting reconnect");
            self.reconnect_requested = true;
            self.reconnect_signal.notify_one();
        }
        SendOutcome::Dropped
    }

    // =========================================================================
    // Convenience senders
    // =========================================================================

    /// Subscribes to the game.
    pub fn join(&mut self) -> SendOutcome {
        let message = ClientMessage::Join {
            client_id: self.client_id.clone(),
            game_id: self.game_id.clone(),
        };
        self.send(&message)
    }

    /// Asks for a full snapshot.
    pub fn request_snapshot(&mut self) -> SendOutcome {
        let message = ClientMessage::SnapshotRequest {
            client_id: self.client_id.clone(),
            game_id: self.game_id.clone(),
        };
        self.send(&message)
    }

    fn send_intent(&mut self, intent: Intent) -> SendOutcome {
        let message = ClientMessage::Intent(ClientIntentMessage::new(self.game_id.clone(), intent));
        self.send(&message)
    }

    /// Claims a starting position.
    pub fn spawn(&mut self, player: &PlayerId, name: &str, player_type: PlayerType, at: Cell) -> SendOutcome {
        self.send_intent(Intent::Spawn(SpawnIntent {
            client_id: self.client_id.clone(),
            player_id: player.clone(),
            name: name.to_owned(),
            player_type,
            x: at.x,
            y: at.y,
        }))
    }

    /// Ground attack; `target` `None` attacks unclaimed land.
    pub fn attack(
        &mut self,
        attacker: &PlayerId,
        target: Option<&PlayerId>,
        troops: Option<u32>,
        aim: Option<Cell>,
    ) -> SendOutcome {
        self.send_intent(Intent::Attack(AttackIntent {
            client_id: self.client_id.clone(),
            attacker_id: attacker.clone(),
            target_id: target.cloned(),
            troops,
            source_x: None,
            source_y: None,
            target_x: aim.map(|c| c.x),
            target_y: aim.map(|c| c.y),
        }))
    }

    /// Naval landing at `at`.
    pub fn boat_attack(
        &mut self,
        attacker: &PlayerId,
        target: Option<&PlayerId>,
        troops: u32,
        at: Cell,
    ) -> SendOutcome {
        self.send_intent(Intent::Boat(BoatIntent {
            client_id: self.client_id.clone(),
            attacker_id: attacker.clone(),
            target_id: target.cloned(),
            troops,
            x: at.x,
            y: at.y,
        }))
    }

    /// Asks `recipient` for an alliance.
    pub fn alliance_request(&mut self, requestor: &PlayerId, recipient: &PlayerId) -> SendOutcome {
        self.send_intent(Intent::AllianceRequest(AllianceRequestIntent {
            client_id: self.client_id.clone(),
            requestor: requestor.clone(),
            recipient: recipient.clone(),
        }))
    }

    /// Answers `requestor`'s request.
    pub fn alliance_reply(&mut self, requestor: &PlayerId, recipient: &PlayerId, accept: bool) -> SendOutcome {
        self.send_intent(Intent::AllianceRequestReply(AllianceReplyIntent {
            client_id: self.client_id.clone(),
            requestor: requestor.clone(),
            recipient: recipient.clone(),
            accept,
        }))
    }

    /// Ends the alliance with `recipient`.
    pub fn break_alliance(&mut self, requestor: &PlayerId, recipient: &PlayerId) -> SendOutcome {
        self.send_intent(Intent::BreakAlliance(BreakAllianceIntent {
            client_id: self.client_id.clone(),
            requestor: requestor.clone(),
            recipient: recipient.clone(),
        }))
    }

    /// Builds a structure at `at`.
    pub fn build(&mut self, player: &PlayerId, unit_type: UnitType, at: Cell) -> SendOutcome {
        self.send_intent(Intent::BuildUnit(BuildUnitIntent {
            client_id: self.client_id.clone(),
            player_id: player.clone(),
            unit_type,
            x: at.x,
            y: at.y,
        }))
    }
}
