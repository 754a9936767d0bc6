//! Network and gameplay constants shared by client and server.

/// Protocol revision. Bumped whenever a wire type changes shape.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default address the server binds its WebSocket listener to.
pub const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Default client connect URL, matching [`DEFAULT_BIND`].
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3000";

/// Default simulation tick interval (10 ticks per second).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Longest display name accepted in a spawn intent.
///
/// Content moderation happens elsewhere; this only bounds the payload.
pub const MAX_NAME_LEN: usize = 27;

/// Longest accepted client/player/game identifier.
pub const MAX_ID_LEN: usize = 64;

/// Default maximum number of connected clients per game.
pub const MAX_CLIENTS: usize = 256;
