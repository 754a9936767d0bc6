//! # FRONTIER Shared
//!
//! Common types used by both client and server.
//!
//! ## CRITICAL RULE
//!
//! This crate only describes data that crosses the wire:
//! - intents flowing client → server
//! - update batches and snapshots flowing server → client
//! - the envelopes wrapping both
//!
//! Anything that mutates a world lives in `frontier_core`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod error;
pub mod ids;
pub mod intent;
pub mod math;
pub mod protocol;
pub mod snapshot;
pub mod types;
pub mod updates;

pub use constants::{DEFAULT_BIND, DEFAULT_TICK_INTERVAL_MS, MAX_NAME_LEN, PROTOCOL_VERSION};
pub use error::{SchemaError, SchemaResult};
pub use ids::{ClientId, GameId, PlayerId, UnitId};
pub use intent::{
    AllianceReplyIntent, AllianceRequestIntent, AttackIntent, BoatIntent, BreakAllianceIntent,
    BuildUnitIntent, ClientIntentMessage, Intent, IntentKind, SpawnIntent,
};
pub use math::{Cell, TileRef};
pub use protocol::{ClientMessage, ServerMessage};
pub use snapshot::{AllianceRecord, AllianceRequestRecord, WorldSnapshot};
pub use types::{PlayerType, Terrain, UnitType};
pub use updates::{
    AllianceUpdate, GameUpdateType, GameUpdates, PlayerUpdate, TileUpdate, UnitUpdate, UpdateBatch,
};
