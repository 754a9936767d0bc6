//! # Client Session
//!
//! Drives one WebSocket connection to the server and keeps a [`GameView`]
//! current.
//!
//! - joins on every open, so each (re)connect starts from a fresh snapshot
//! - applies turns in order and asks for one snapshot when a gap shows up
//! - reconnects with the transport's backoff when the socket closes
//! - once the backoff gives up, waits for the next dropped send and starts
//!   over with a fresh backoff

use std::sync::Arc;
use std::time::Duration;

use frontier_shared::constants::DEFAULT_SERVER_URL;
use frontier_shared::{ClientId, GameId, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::unbounded_channel;
use tokio::sync::{watch, Notify};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::transport::{ClientTransport, ReconnectPolicy, SendOutcome};
use super::view::GameView;
use crate::error::NetworkError;
use crate::protocol::decode_server;

/// Client configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `ws://host:port`
    pub server_url: String,
    /// This client.
    pub client_id: ClientId,
    /// Game to join.
    pub game_id: GameId,
    /// First reconnect delay.
    pub reconnect_initial_ms: u64,
    /// Longest reconnect delay.
    pub reconnect_max_ms: u64,
    /// Give up after this many failed reconnects.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_owned(),
            client_id: ClientId::from("client"),
            game_id: GameId::from("frontier"),
            reconnect_initial_ms: 250,
            reconnect_max_ms: 10_000,
            max_reconnect_attempts: None,
        }
    }
}

impl ClientConfig {
    /// Backoff built from the delay settings.
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            initial_delay: Duration::from_millis(self.reconnect_initial_ms),
            max_delay: Duration::from_millis(self.reconnect_max_ms),
            multiplier: 2,
            max_attempts: self.max_reconnect_attempts,
        }
    }
}

/// Why a connection ended.
enum Closed {
    Socket,
    Stopped,
}

type ClientSocket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A client connected to one game.
#[derive(Debug)]
pub struct ClientSession {
    config: ClientConfig,
    view: Arc<RwLock<GameView>>,
    transport: Arc<Mutex<ClientTransport>>,
    stop: Arc<watch::Sender<bool>>,
}

impl ClientSession {
    /// A session that has not connected yet.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let transport = ClientTransport::new(
            config.client_id.clone(),
            config.game_id.clone(),
            config.reconnect_policy(),
        );
        let (stop, _) = watch::channel(false);
        Self {
            config,
            view: Arc::new(RwLock::new(GameView::new())),
            transport: Arc::new(Mutex::new(transport)),
            stop: Arc::new(stop),
        }
    }

    /// Shared projection.
    #[must_use]
    pub fn view(&self) -> Arc<RwLock<GameView>> {
        Arc::clone(&self.view)
    }

    /// Shared transport; player actions go through here.
    #[must_use]
    pub fn transport(&self) -> Arc<Mutex<ClientTransport>> {
        Arc::clone(&self.transport)
    }

    /// Makes [`Self::run`] return after the current frame.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Connects and keeps the view current until [`Self::stop`] is called.
    pub async fn run(&self) {
        let mut stop = self.stop.subscribe();
        let reconnect = self.transport.lock().reconnect_signal();
        self.transport.lock().begin_connect();
        loop {
            if *stop.borrow() {
                return;
            }
            match connect_async(self.config.server_url.as_str()).await {
                Ok((socket, _)) => {
                    info!(url = %self.config.server_url, "connected");
                    if let Closed::Stopped = self.drive(socket, &mut stop).await {
                        self.transport.lock().detach();
                        return;
                    }
                    info!("connection closed");
                }
                Err(err) => warn!(url = %self.config.server_url, %err, "connect failed"),
            }
            let delay = {
                let mut transport = self.transport.lock();
                transport.detach();
                transport.begin_reconnect()
            };
            match delay {
                Ok(delay) => {
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        _ = stop.changed() => return,
                    }
                }
                Err(err) => {
                    warn!(%err, "waiting for a send before reconnecting");
                    tokio::select! {
                        () = self.wait_for_send(&reconnect) => {}
                        _ = stop.changed() => return,
                    }
                    self.transport.lock().restart();
                }
            }
        }
    }

    /// Resolves once a send was dropped after the backoff gave up.
    async fn wait_for_send(&self, reconnect: &Notify) {
        loop {
            if self.transport.lock().take_reconnect_request() {
                return;
            }
            reconnect.notified().await;
        }
    }

    async fn drive(&self, socket: ClientSocket, stop: &mut watch::Receiver<bool>) -> Closed {
        let (mut write, mut read) = socket.split();
        let (outbound, mut outbound_rx) = unbounded_channel();
        {
            let mut transport = self.transport.lock();
            transport.attach(outbound);
            if transport.join() == SendOutcome::Dropped {
                warn!("join dropped");
                return Closed::Socket;
            }
        }
        let mut resync_pending = false;

        loop {
            tokio::select! {
                text = outbound_rx.recv() => {
                    let Some(text) = text else { return Closed::Socket };
                    if let Err(err) = write.send(Message::Text(text)).await {
                        debug!(%err, "write failed");
                        return Closed::Socket;
                    }
                }
                frame = read.next() => {
                    match frame {
                        Some(Ok(frame)) if frame.is_close() => return Closed::Socket,
                        Some(Ok(frame)) => self.handle_frame(&frame, &mut resync_pending),
                        Some(Err(err)) => {
                            debug!(%err, "read failed");
                            return Closed::Socket;
                        }
                        None => return Closed::Socket,
                    }
                }
                _ = stop.changed() => {
                    let _ = write.close().await;
                    return Closed::Stopped;
                }
            }
        }
    }

    fn handle_frame(&self, frame: &Message, resync_pending: &mut bool) {
        let message = match decode_server(frame) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(err) => {
                warn!(%err, "undecodable frame");
                return;
            }
        };
        match message {
            ServerMessage::Snapshot { game_id, snapshot } => {
                if game_id != self.config.game_id {
                    warn!(%game_id, "snapshot for another game ignored");
                    return;
                }
                let tick = snapshot.tick;
                match self.view.write().apply_snapshot(snapshot) {
                    Ok(()) => {
                        *resync_pending = false;
                        info!(tick, "snapshot applied");
                    }
                    Err(err) => warn!(%err, "snapshot rejected"),
                }
            }
            ServerMessage::Turn { game_id, batch } => {
                if game_id != self.config.game_id {
                    return;
                }
                let applied = self.view.write().apply_batch(&batch);
                match applied {
                    Ok(events) if !events.is_empty() => {
                        debug!(tick = batch.tick, events = events.len(), "unit transitions");
                    }
                    Ok(_) => {}
                    Err(NetworkError::NotSynced) if *resync_pending => {}
                    Err(err) => {
                        warn!(%err, "turn rejected, requesting snapshot");
                        if !*resync_pending {
                            let sent = self.transport.lock().request_snapshot();
                            *resync_pending = sent == SendOutcome::Sent;
                        }
                    }
                }
            }
            ServerMessage::Error { message } => warn!(%message, "server rejected a message"),
        }
    }
}
