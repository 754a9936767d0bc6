//! # Network Protocol
//!
//! Framing for the message types defined in `frontier_shared::protocol`.
//!
//! ## Frame Kinds
//!
//! ```text
//! client ──text──► server      intent | join | snapshotRequest
//! server ──text──► client      turn | error | small snapshot
//! server ─binary─► client      LZ4(snapshot JSON), size-prepended
//! ```

mod codec;
mod compression;

pub use codec::{decode_client, decode_server, encode_client, encode_server, OutboundFrame};
pub use compression::{compress, decompress, MAX_FRAME_BYTES};
