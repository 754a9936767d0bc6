//! # FRONTIER Networking
//!
//! Replication of the authoritative game to thin clients over WebSockets.
//!
//! ## Architecture
//!
//! This crate implements the complete networking stack for FRONTIER:
//!
//! - **Protocol**: JSON text frames, LZ4 binary frames for large snapshots
//! - **Server**: one tick thread owning the [`Executor`](frontier_core::Executor)
//! - **Transport**: tokio sockets that decode and forward, never mutate
//! - **Client**: connection state machine, session driver, read-only view
//!
//! ## Authority Model
//!
//! ```text
//! CLIENT                           SERVER
//!   |                                 |
//!   |--- intent: "attack P2" -------->|
//!   |                                 | <- validated, admitted next tick
//!   |<-- turn: batch for tick n ------|
//!   |                                 |
//! ```
//!
//! The client never decides outcomes. It learns about every change from
//! the per-tick batches and recovers from gaps with a full snapshot.
//!
//! ## Example
//!
//! ```rust,ignore
//! use frontier_networking::{launch, GameServer, ServerConfig};
//!
//! let server = GameServer::new(ServerConfig::load("config/frontier.toml")?)?;
//! let running = launch(server).await?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::{
    ClientConfig, ClientSession, ClientTransport, ConnectionState, GameView, ReconnectPolicy,
    SendOutcome, UnitEvent,
};
pub use error::{NetworkError, NetworkResult};
pub use protocol::OutboundFrame;
pub use server::{GameServer, NetworkEvent, ServerConfig, ServerHandle, ServerStatus};
pub use transport::{launch, serve, RunningServer};
