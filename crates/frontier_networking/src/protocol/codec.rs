//! # Wire Codec
//!
//! Messages travel as JSON text frames. Server frames larger than the
//! configured threshold (in practice full snapshots) are LZ4-compressed and
//! sent as binary frames instead; the receiver tells them apart by frame
//! kind, not by content.

use frontier_shared::{ClientMessage, ServerMessage};
use tokio_tungstenite::tungstenite::Message;

use super::compression;
use crate::error::{NetworkError, NetworkResult};

/// An encoded frame ready for a socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Plain JSON.
    Text(String),
    /// LZ4-compressed JSON.
    Binary(Vec<u8>),
    /// Server-initiated close.
    Close,
}

impl OutboundFrame {
    /// Bytes on the wire.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Binary(bytes) => bytes.len(),
            Self::Close => 0,
        }
    }

    /// True for an empty frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<OutboundFrame> for Message {
    fn from(frame: OutboundFrame) -> Self {
        match frame {
            OutboundFrame::Text(text) => Self::Text(text),
            OutboundFrame::Binary(bytes) => Self::Binary(bytes),
            OutboundFrame::Close => Self::Close(None),
        }
    }
}

/// Encodes a server message. `threshold == 0` disables compression.
///
/// # Errors
///
/// [`NetworkError::Protocol`] if serialization fails.
pub fn encode_server(message: &ServerMessage, threshold: usize) -> NetworkResult<OutboundFrame> {
    let text = serde_json::to_string(message)?;
    if threshold == 0 || text.len() <= threshold {
        return Ok(OutboundFrame::Text(text));
    }
    let packed = compression::compress(text.as_bytes());
    tracing::debug!(
        raw = text.len(),
        packed = packed.len(),
        ratio = compression::ratio(text.len(), packed.len()),
        "compressed frame"
    );
    Ok(OutboundFrame::Binary(packed))
}

/// Decodes a server frame.
///
/// Control frames (ping, pong, close) yield `Ok(None)`.
///
/// # Errors
///
/// [`NetworkError::Compression`] or [`NetworkError::Protocol`].
pub fn decode_server(frame: &Message) -> NetworkResult<Option<ServerMessage>> {
    match frame {
        Message::Text(text) => Ok(Some(serde_json::from_str(text)?)),
        Message::Binary(bytes) => {
            let raw = compression::decompress(bytes)?;
            Ok(Some(serde_json::from_slice(&raw)?))
        }
        _ => Ok(None),
    }
}

/// Encodes a client message as a text frame.
///
/// # Errors
///
/// [`NetworkError::Protocol`] if serialization fails.
pub fn encode_client(message: &ClientMessage) -> NetworkResult<String> {
    Ok(serde_json::to_string(message)?)
}

/// Decodes and validates a client frame.
///
/// Control frames yield `Ok(None)`. Clients only send text.
///
/// # Errors
///
/// [`NetworkError::Protocol`] for binary frames, malformed JSON or a
/// message that fails validation.
pub fn decode_client(frame: &Message) -> NetworkResult<Option<ClientMessage>> {
    match frame {
        Message::Text(text) => Ok(Some(ClientMessage::parse(text)?)),
        Message::Binary(_) => Err(NetworkError::Protocol(
            frontier_shared::SchemaError::Malformed("binary frames are not accepted".into()),
        )),
        _ => Ok(None),
    }
}
