//! # Network Error Types
//!
//! Transport faults, protocol violations and replica desyncs. None of these
//! stop the server tick loop; they end a connection or trigger a resync.

use frontier_shared::{ClientId, GameId, SchemaError};
use thiserror::Error;

/// Errors raised by the server, the codec and the client session.
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Socket I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or framing failed.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A frame did not decode to a valid message.
    #[error("protocol error: {0}")]
    Protocol(#[from] SchemaError),

    /// A binary frame could not be decompressed.
    #[error("compression error: {0}")]
    Compression(String),

    /// Server or client configuration is unusable.
    #[error("config error: {0}")]
    Config(String),

    /// Message addressed to a game this server does not run.
    #[error("wrong game: expected {expected}, got {got}")]
    WrongGame {
        /// Game this server runs.
        expected: GameId,
        /// Game named in the message.
        got: GameId,
    },

    /// Connection sent a message before joining, or under another client id.
    #[error("client {0} has not joined on this connection")]
    NotJoined(ClientId),

    /// Server refused the connection.
    #[error("server full ({0} clients)")]
    ServerFull(usize),

    /// A batch arrived out of sequence.
    #[error("desync: expected batch {expected}, got {got}")]
    Desync {
        /// Tick the projection expected next.
        expected: u64,
        /// Tick of the batch received.
        got: u64,
    },

    /// The projection has no snapshot to apply batches to.
    #[error("projection not synced")]
    NotSynced,

    /// Reconnect policy gave up.
    #[error("gave up reconnecting after {0} attempts")]
    ReconnectExhausted(u32),
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(SchemaError::from(err))
    }
}

impl From<frontier_core::GameError> for NetworkError {
    fn from(err: frontier_core::GameError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for networking operations.
pub type NetworkResult<T> = Result<T, NetworkError>;
