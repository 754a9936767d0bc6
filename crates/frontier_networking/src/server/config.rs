//! Server configuration: a `[server]` table plus the simulation's `[game]`
//! table, both optional.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3000"
//! tick_interval_ms = 100
//! game_id = "frontier-1"
//!
//! [game]
//! seed = 7
//! ```

use std::path::Path;

use frontier_core::GameConfig;
use frontier_shared::constants::MAX_CLIENTS;
use frontier_shared::{GameId, DEFAULT_BIND, DEFAULT_TICK_INTERVAL_MS};
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, NetworkResult};

/// `[server]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Listener address.
    pub bind: String,
    /// Wall-clock time between ticks.
    pub tick_interval_ms: u64,
    /// Connections beyond this are refused.
    pub max_clients: usize,
    /// The one game this server runs.
    pub game_id: GameId,
    /// Frames larger than this many bytes are LZ4-compressed; `0` disables.
    pub compression_threshold: usize,
    /// Ticks between status log lines; `0` disables.
    pub status_interval_ticks: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_clients: MAX_CLIENTS,
            game_id: GameId::from("frontier"),
            compression_threshold: 16 * 1024,
            status_interval_ticks: 50,
        }
    }
}

/// Complete server configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Transport and pacing.
    pub server: ServerSettings,
    /// Simulation.
    pub game: GameConfig,
}

impl ServerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Config`] on syntax errors or invalid values.
    pub fn from_toml_str(text: &str) -> NetworkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| NetworkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Config`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> NetworkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| NetworkError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks both tables.
    ///
    /// # Errors
    ///
    /// [`NetworkError::Config`] naming the first bad value.
    pub fn validate(&self) -> NetworkResult<()> {
        let s = &self.server;
        if s.tick_interval_ms == 0 {
            return Err(NetworkError::Config("server.tick_interval_ms must be positive".into()));
        }
        if s.max_clients == 0 {
            return Err(NetworkError::Config("server.max_clients must be positive".into()));
        }
        if s.game_id.as_str().is_empty() {
            return Err(NetworkError::Config("server.game_id must not be empty".into()));
        }
        if s.bind.parse::<std::net::SocketAddr>().is_err() {
            return Err(NetworkError::Config(format!("server.bind `{}` is not an address", s.bind)));
        }
        self.game.validate()?;
        Ok(())
    }
}
