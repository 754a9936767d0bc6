//! # Game Server
//!
//! The authoritative server for one game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        GAME SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
//! │  │ Socket tasks │  │ Tick thread  │  │ Outbound     │      │
//! │  │ (tokio)      │──│ (Executor)   │──│ queues       │      │
//! │  └──────────────┘  └──────────────┘  └──────────────┘      │
//! │     decode +           single            one per           │
//! │     validate           writer            socket            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Socket tasks decode and validate frames in parallel and hand the results
//! to the tick thread as [`NetworkEvent`]s. The tick thread drains them at
//! the start of each tick, so everything that arrived during tick `n` is
//! admitted at the boundary of tick `n + 1` in arrival order. After the
//! executor runs, the tick's batch goes to every joined connection.
//!
//! Errors caused by one client are answered to that client only and never
//! stop the loop.

mod config;
mod connection;
mod tick;

pub use config::{ServerConfig, ServerSettings};
pub use connection::{ClientConnection, ConnectionId, ConnectionState, Connections};
pub use tick::{TickLoop, TickStats};

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use frontier_core::Executor;
use frontier_shared::{ClientId, ClientMessage, ServerMessage};
use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::error::{NetworkError, NetworkResult};
use crate::protocol::{encode_server, OutboundFrame};

/// Capacity of the socket → tick thread channel.
const EVENT_QUEUE: usize = 10_000;

/// Event from a socket task.
#[derive(Debug)]
pub enum NetworkEvent {
    /// A socket finished its handshake.
    ClientConnected {
        /// Id assigned by the transport.
        conn: ConnectionId,
        /// Frames for this socket.
        outbound: UnboundedSender<OutboundFrame>,
    },
    /// A decoded, schema-valid message.
    MessageReceived {
        /// Sending socket.
        conn: ConnectionId,
        /// The message.
        message: ClientMessage,
    },
    /// The socket closed.
    ClientDisconnected(ConnectionId),
}

/// Server status published after every tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerStatus {
    /// Ticks completed.
    pub tick: u64,
    /// Open connections.
    pub connections: usize,
    /// Joined connections.
    pub joined: usize,
    /// Players in the game.
    pub players: usize,
    /// Units still active.
    pub active_units: usize,
    /// Intents admitted so far.
    pub intents_admitted: u64,
    /// Intents rejected so far.
    pub intents_rejected: u64,
    /// Messages refused before reaching the engine.
    pub messages_refused: u64,
}

/// Cloneable handle the transport uses to talk to the tick thread.
#[derive(Clone, Debug)]
pub struct ServerHandle {
    events: Sender<NetworkEvent>,
    status: Arc<RwLock<ServerStatus>>,
    next_conn: Arc<AtomicU32>,
    running: Arc<AtomicBool>,
}

impl ServerHandle {
    /// Hands an event to the tick thread without blocking.
    ///
    /// Returns `false` if the queue is full or the server is gone.
    pub fn send(&self, event: NetworkEvent) -> bool {
        match self.events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("event queue full, dropping event");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Allocates a connection id.
    #[must_use]
    pub fn next_connection_id(&self) -> ConnectionId {
        ConnectionId(self.next_conn.fetch_add(1, Ordering::Relaxed))
    }

    /// Latest published status.
    #[must_use]
    pub fn status(&self) -> ServerStatus {
        self.status.read().clone()
    }

    /// Whether the tick loop should keep running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Asks the tick loop to stop after the current tick.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

/// The authoritative server: executor, connections, event queue.
pub struct GameServer {
    config: ServerConfig,
    executor: Executor,
    connections: Connections,
    event_rx: Receiver<NetworkEvent>,
    handle: ServerHandle,
    snapshot_cache: Option<(u64, OutboundFrame)>,
    messages_refused: u64,
}

impl std::fmt::Debug for GameServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameServer")
            .field("game_id", &self.config.server.game_id)
            .field("executor", &self.executor)
            .field("connections", &self.connections.len())
            .finish_non_exhaustive()
    }
}

impl GameServer {
    /// Creates a server and its fresh game.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Config`] if either config table is invalid.
    pub fn new(config: ServerConfig) -> NetworkResult<Self> {
        config.validate()?;
        let executor = Executor::new(config.game.clone())?;
        let (events, event_rx) = bounded(EVENT_QUEUE);
        let handle = ServerHandle {
            events,
            status: Arc::new(RwLock::new(ServerStatus::default())),
            next_conn: Arc::new(AtomicU32::new(1)),
            running: Arc::new(AtomicBool::new(true)),
        };
        Ok(Self {
            connections: Connections::new(config.server.max_clients),
            config,
            executor,
            event_rx,
            handle,
            snapshot_cache: None,
            messages_refused: 0,
        })
    }

    /// Handle for the transport and status readers.
    #[must_use]
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The engine.
    #[must_use]
    pub const fn executor(&self) -> &Executor {
        &self.executor
    }

    /// The engine, for server-side setup between ticks.
    pub fn executor_mut(&mut self) -> &mut Executor {
        &mut self.executor
    }

    /// Live connections.
    #[must_use]
    pub const fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Runs one tick: drain events, advance the game, broadcast the batch.
    pub fn tick(&mut self) -> u64 {
        while let Ok(event) = self.event_rx.try_recv() {
            self.handle_event(event);
        }

        let batch = self.executor.tick();
        let tick = batch.tick;
        let turn = ServerMessage::Turn {
            game_id: self.config.server.game_id.clone(),
            batch,
        };
        match encode_server(&turn, self.config.server.compression_threshold) {
            Ok(frame) => {
                self.connections.broadcast(&frame);
            }
            Err(err) => warn!(tick, %err, "failed to encode turn"),
        }
        for id in self.connections.sweep_closed() {
            info!("Client disconnected: {id} (queue closed)");
        }
        self.publish_status();
        tick
    }

    /// Runs ticks at the configured interval until [`ServerHandle::shutdown`]
    /// is called or `max_ticks` ticks have run.
    pub fn run(&mut self, max_ticks: Option<u64>) {
        let mut tick_loop = TickLoop::from_millis(self.config.server.tick_interval_ms);
        let every = self.config.server.status_interval_ticks;
        info!(
            game = %self.config.server.game_id,
            interval_ms = self.config.server.tick_interval_ms,
            "tick loop started"
        );
        while self.handle.is_running() {
            if max_ticks.is_some_and(|max| tick_loop.tick_count() >= max) {
                break;
            }
            tick_loop.wait_for_next_tick();
            while tick_loop.should_tick() {
                let start = tick_loop.begin_tick();
                let tick = self.tick();
                tick_loop.end_tick(start);
                if every > 0 && (tick + 1) % every == 0 {
                    let status = self.handle.status();
                    let stats = tick_loop.stats();
                    info!(
                        tick = status.tick,
                        clients = status.connections,
                        players = status.players,
                        units = status.active_units,
                        avg_tick_us = stats.avg_tick_us,
                        late_ticks = stats.late_ticks,
                        "server status"
                    );
                }
            }
        }
        let stats = tick_loop.stats();
        info!(
            ticks = stats.total_ticks,
            avg_tick_us = stats.avg_tick_us,
            max_tick_us = stats.max_tick_us,
            late_ticks = stats.late_ticks,
            "tick loop stopped"
        );
    }

    fn handle_event(&mut self, event: NetworkEvent) {
        match event {
            NetworkEvent::ClientConnected { conn, outbound } => {
                match self.connections.add(ClientConnection::new(conn, outbound)) {
                    Ok(()) => info!("Client connected: {conn}"),
                    Err(mut refused) => {
                        let err = NetworkError::ServerFull(self.config.server.max_clients);
                        warn!("Client refused: {conn}: {err}");
                        send_error(&mut refused, &err);
                        refused.send(OutboundFrame::Close);
                    }
                }
            }
            NetworkEvent::MessageReceived { conn, message } => {
                if let Err(err) = self.handle_message(conn, message) {
                    self.messages_refused += 1;
                    warn!(%conn, %err, "message refused");
                    if let Some(c) = self.connections.get_mut(conn) {
                        send_error(c, &err);
                    }
                }
            }
            NetworkEvent::ClientDisconnected(conn) => {
                if self.connections.remove(conn).is_some() {
                    info!("Client disconnected: {conn}");
                }
            }
        }
    }

    fn handle_message(&mut self, conn: ConnectionId, message: ClientMessage) -> NetworkResult<()> {
        let expected = &self.config.server.game_id;
        if message.game_id() != expected {
            return Err(NetworkError::WrongGame {
                expected: expected.clone(),
                got: message.game_id().clone(),
            });
        }
        match message {
            ClientMessage::Join { client_id, .. } => {
                let frame = self.snapshot_frame()?;
                let tick = self.executor.game().ticks();
                let Some(c) = self.connections.get_mut(conn) else {
                    return Ok(());
                };
                c.state = ConnectionState::Joined;
                c.client_id = Some(client_id.clone());
                c.last_snapshot_tick = Some(tick);
                c.send(frame);
                info!(%conn, client = %client_id, tick, "client joined");
            }
            ClientMessage::SnapshotRequest { client_id, .. } => {
                self.require_bound(conn, &client_id)?;
                let frame = self.snapshot_frame()?;
                let tick = self.executor.game().ticks();
                if let Some(c) = self.connections.get_mut(conn) {
                    c.last_snapshot_tick = Some(tick);
                    c.send(frame);
                }
                debug!(%conn, client = %client_id, tick, "snapshot resent");
            }
            ClientMessage::Intent(msg) => {
                self.require_bound(conn, &msg.client_id)?;
                debug!(%conn, kind = ?msg.intent.kind(), "intent queued");
                self.executor.submit(msg.intent);
            }
        }
        Ok(())
    }

    fn require_bound(&self, conn: ConnectionId, client: &ClientId) -> NetworkResult<()> {
        match self.connections.get(conn) {
            Some(c) if c.is_bound_to(client) => Ok(()),
            _ => Err(NetworkError::NotJoined(client.clone())),
        }
    }

    /// Snapshot of the current state, encoded once per tick.
    fn snapshot_frame(&mut self) -> NetworkResult<OutboundFrame> {
        let tick = self.executor.game().ticks();
        if let Some((cached, frame)) = &self.snapshot_cache {
            if *cached == tick {
                return Ok(frame.clone());
            }
        }
        let message = ServerMessage::Snapshot {
            game_id: self.config.server.game_id.clone(),
            snapshot: self.executor.game().snapshot(),
        };
        let frame = encode_server(&message, self.config.server.compression_threshold)?;
        self.snapshot_cache = Some((tick, frame.clone()));
        Ok(frame)
    }

    fn publish_status(&self) {
        let game = self.executor.game();
        let stats = self.executor.stats();
        let mut status = self.handle.status.write();
        *status = ServerStatus {
            tick: game.ticks(),
            connections: self.connections.len(),
            joined: self.connections.joined(),
            players: game.players().count(),
            active_units: game.units().active_count(),
            intents_admitted: stats.intents_admitted,
            intents_rejected: stats.intents_rejected,
            messages_refused: self.messages_refused,
        };
    }
}

fn send_error(connection: &mut ClientConnection, err: &NetworkError) {
    let message = ServerMessage::Error {
        message: err.to_string(),
    };
    match encode_server(&message, 0) {
        Ok(frame) => {
            connection.send(frame);
        }
        Err(e) => warn!(%e, "failed to encode error reply"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frontier_shared::{ClientIntentMessage, GameId, Intent, PlayerType, SpawnIntent};
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn server() -> GameServer {
        let mut config = ServerConfig::default();
        config.server.game_id = GameId::from("g1");
        config.game.map.width = 20;
        config.game.map.height = 20;
        GameServer::new(config).unwrap()
    }

    fn connect(server: &GameServer) -> (ConnectionId, UnboundedReceiver<OutboundFrame>) {
        let handle = server.handle();
        let conn = handle.next_connection_id();
        let (tx, rx) = unbounded_channel();
        assert!(handle.send(NetworkEvent::ClientConnected { conn, outbound: tx }));
        (conn, rx)
    }

    fn say(server: &GameServer, conn: ConnectionId, message: ClientMessage) {
        assert!(server.handle().send(NetworkEvent::MessageReceived { conn, message }));
    }

    fn join(client: &str, game: &str) -> ClientMessage {
        ClientMessage::Join {
            client_id: client.into(),
            game_id: game.into(),
        }
    }

    fn decoded(rx: &mut UnboundedReceiver<OutboundFrame>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let Some(msg) = crate::protocol::decode_server(&frame.into()).unwrap() {
                out.push(msg);
            }
        }
        out
    }

    #[test]
    fn test_join_gets_snapshot_then_turn() {
        let mut server = server();
        let (conn, mut rx) = connect(&server);
        say(&server, conn, join("c1", "g1"));
        server.tick();
        let messages = decoded(&mut rx);
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0], ServerMessage::Snapshot { snapshot, .. } if snapshot.tick == 0));
        assert!(matches!(&messages[1], ServerMessage::Turn { batch, .. } if batch.tick == 0));
        assert_eq!(server.handle().status().joined, 1);
    }

    #[test]
    fn test_wrong_game_answered_to_sender_only() {
        let mut server = server();
        let (a, mut rx_a) = connect(&server);
        let (b, mut rx_b) = connect(&server);
        say(&server, b, join("c2", "g1"));
        say(&server, a, join("c1", "other"));
        server.tick();
        let to_a = decoded(&mut rx_a);
        assert_eq!(to_a.len(), 1);
        assert!(matches!(&to_a[0], ServerMessage::Error { message } if message.contains("wrong game")));
        assert!(decoded(&mut rx_b)
            .iter()
            .all(|m| !matches!(m, ServerMessage::Error { .. })));
        assert_eq!(server.handle().status().messages_refused, 1);
    }

    #[test]
    fn test_intent_before_join_refused() {
        let mut server = server();
        let (conn, mut rx) = connect(&server);
        let intent = Intent::Spawn(SpawnIntent {
            client_id: "c1".into(),
            player_id: "P1".into(),
            name: "Ada".into(),
            player_type: PlayerType::Human,
            x: 5,
            y: 5,
        });
        say(&server, conn, ClientMessage::Intent(ClientIntentMessage::new("g1".into(), intent.clone())));
        server.tick();
        assert!(!server.executor().game().has_player(&"P1".into()));
        assert!(matches!(&decoded(&mut rx)[0], ServerMessage::Error { .. }));

        say(&server, conn, join("c1", "g1"));
        say(&server, conn, ClientMessage::Intent(ClientIntentMessage::new("g1".into(), intent)));
        server.tick();
        assert!(server.executor().game().has_player(&"P1".into()));
    }

    #[test]
    fn test_full_server_refuses_connection() {
        let mut config = ServerConfig::default();
        config.server.max_clients = 1;
        let mut server = GameServer::new(config).unwrap();
        let (_a, _rx_a) = connect(&server);
        let (_b, mut rx_b) = connect(&server);
        server.tick();
        assert_eq!(server.connections().len(), 1);
        assert!(matches!(&decoded(&mut rx_b)[0], ServerMessage::Error { message } if message.contains("full")));
    }

    #[test]
    fn test_dropped_socket_swept_after_broadcast() {
        let mut server = server();
        let (conn, rx) = connect(&server);
        say(&server, conn, join("c1", "g1"));
        server.tick();
        drop(rx);
        server.tick();
        assert!(server.connections().is_empty());
    }
}
