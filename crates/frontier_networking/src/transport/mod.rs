//! # Transport Layer
//!
//! WebSocket sockets on the tokio runtime, the tick loop on its own thread.
//!
//! Each accepted socket gets two halves:
//!
//! - a reader that decodes and validates frames and forwards them as
//!   [`NetworkEvent`]s; malformed frames are answered on the same socket
//!   and never reach the tick thread
//! - a writer that drains the socket's outbound queue and sends heartbeat
//!   pings
//!
//! The socket ends when either half ends.

use std::net::SocketAddr;
use std::thread;
use std::time::Duration;

use frontier_shared::ServerMessage;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{NetworkError, NetworkResult};
use crate::protocol::{decode_client, encode_server, OutboundFrame};
use crate::server::{ConnectionId, GameServer, NetworkEvent, ServerHandle};

/// Interval between keep-alive pings.
const HEARTBEAT: Duration = Duration::from_secs(20);

/// A server whose tick thread and accept loop are running.
#[derive(Debug)]
pub struct RunningServer {
    /// Address the listener is bound to.
    pub local_addr: SocketAddr,
    /// Handle into the tick thread.
    pub handle: ServerHandle,
    tick_thread: thread::JoinHandle<GameServer>,
    accept_task: JoinHandle<()>,
}

impl RunningServer {
    /// Stops accepting, stops the tick loop and returns the server.
    ///
    /// Blocks until the current tick finishes.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Io`] if the tick thread panicked.
    pub fn shutdown(self) -> NetworkResult<GameServer> {
        self.accept_task.abort();
        self.handle.shutdown();
        self.tick_thread
            .join()
            .map_err(|_| NetworkError::Io(std::io::Error::other("tick thread panicked")))
    }
}

/// Binds the configured address, starts the tick thread and the accept loop.
///
/// Must be called inside a tokio runtime.
///
/// # Errors
///
/// [`NetworkError::Io`] if the address cannot be bound or the thread cannot
/// be spawned.
pub async fn launch(server: GameServer) -> NetworkResult<RunningServer> {
    let listener = TcpListener::bind(&server.config().server.bind).await?;
    let local_addr = listener.local_addr()?;
    let handle = server.handle();

    let tick_thread = thread::Builder::new()
        .name("frontier-tick".into())
        .spawn(move || {
            let mut server = server;
            server.run(None);
            server
        })?;
    let accept_task = tokio::spawn(serve(listener, handle.clone()));

    info!(%local_addr, "listening");
    Ok(RunningServer {
        local_addr,
        handle,
        tick_thread,
        accept_task,
    })
}

/// Accepts sockets until the server shuts down.
pub async fn serve(listener: TcpListener, handle: ServerHandle) {
    while handle.is_running() {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(handle_socket(stream, peer, handle.clone()));
            }
            Err(err) => warn!(%err, "accept failed"),
        }
    }
}

async fn handle_socket(stream: TcpStream, peer: SocketAddr, handle: ServerHandle) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            debug!(%peer, %err, "websocket handshake failed");
            return;
        }
    };
    let conn = handle.next_connection_id();
    let (outbound, outbound_rx) = unbounded_channel();
    if !handle.send(NetworkEvent::ClientConnected {
        conn,
        outbound: outbound.clone(),
    }) {
        return;
    }
    debug!(%peer, %conn, "socket open");

    let (write, read) = ws.split();
    let mut writer = tokio::spawn(write_frames(write, outbound_rx));
    let mut reader = tokio::spawn(read_frames(read, conn, outbound, handle.clone()));
    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    let _ = handle.send(NetworkEvent::ClientDisconnected(conn));
    debug!(%peer, %conn, "socket closed");
}

type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = futures_util::stream::SplitStream<WebSocketStream<TcpStream>>;

async fn write_frames(mut write: WsSink, mut frames: UnboundedReceiver<OutboundFrame>) {
    let mut heartbeat = tokio::time::interval(HEARTBEAT);
    heartbeat.tick().await;
    loop {
        tokio::select! {
            frame = frames.recv() => {
                let Some(frame) = frame else { break };
                let closing = frame == OutboundFrame::Close;
                if write.send(frame.into()).await.is_err() || closing {
                    break;
                }
            }
            _ = heartbeat.tick() => {
                if write.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }
    let _ = write.close().await;
}

async fn read_frames(
    mut read: WsStream,
    conn: ConnectionId,
    outbound: UnboundedSender<OutboundFrame>,
    handle: ServerHandle,
) {
    while let Some(frame) = read.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                debug!(%conn, %err, "read failed");
                break;
            }
        };
        if frame.is_close() {
            break;
        }
        match decode_client(&frame) {
            Ok(Some(message)) => {
                if !handle.send(NetworkEvent::MessageReceived { conn, message }) {
                    reply_error(&outbound, "server busy");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(%conn, %err, "invalid frame");
                reply_error(&outbound, &err.to_string());
            }
        }
    }
}

fn reply_error(outbound: &UnboundedSender<OutboundFrame>, message: &str) {
    let reply = ServerMessage::Error {
        message: message.to_owned(),
    };
    if let Ok(frame) = encode_server(&reply, 0) {
        let _ = outbound.send(frame);
    }
}
