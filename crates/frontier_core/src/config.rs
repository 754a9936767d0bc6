//! # Game Configuration
//!
//! Balance data lives in TOML, never in code. Every section has defaults so
//! a file only needs the values it changes:
//!
//! ```toml
//! seed = 42
//! spawn_phase_ticks = 50
//!
//! [map]
//! rows = ["....~~", "....~~"]
//!
//! [economy]
//! city_cost = 10000
//! ```
//!
//! Configs are validated on load; a config that passed [`GameConfig::validate`]
//! cannot make the engine divide by zero or build an empty map.

use std::path::Path;

use frontier_shared::UnitType;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, GameResult};

/// Complete simulation configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed of the simulation RNG.
    pub seed: u64,
    /// Ticks during which players may (re)spawn and only spawn-phase
    /// executions run.
    pub spawn_phase_ticks: u64,
    /// Map shape.
    pub map: MapConfig,
    /// Starting resources, growth and costs.
    pub economy: EconomyConfig,
    /// Ground attack tuning.
    pub combat: CombatConfig,
    /// Transport ship tuning.
    pub boats: BoatConfig,
    /// Alliance tuning.
    pub alliances: AllianceConfig,
    /// Build chain pacing.
    pub construction: ConstructionConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            spawn_phase_ticks: 100,
            map: MapConfig::default(),
            economy: EconomyConfig::default(),
            combat: CombatConfig::default(),
            boats: BoatConfig::default(),
            alliances: AllianceConfig::default(),
            construction: ConstructionConfig::default(),
        }
    }
}

/// `[map]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Width when `rows` is empty.
    pub width: u32,
    /// Height when `rows` is empty.
    pub height: u32,
    /// Explicit terrain rows (`.` land, `~` water). Overrides width/height.
    pub rows: Vec<String>,
    /// Manhattan radius of land claimed around a spawn tile.
    pub spawn_radius: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            rows: Vec::new(),
            spawn_radius: 2,
        }
    }
}

/// `[economy]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Troops a fresh player starts with.
    pub starting_troops: u32,
    /// Gold a fresh player starts with.
    pub starting_gold: u64,
    /// Flat troop growth per tick.
    pub troop_growth_base: u32,
    /// Extra troop growth per 100 owned tiles per tick.
    pub troop_growth_per_100_tiles: u32,
    /// Troop cap per owned tile.
    pub max_troops_per_tile: u32,
    /// Flat gold income per tick.
    pub gold_per_tick: u64,
    /// Gold per tick from each running enterprise.
    pub enterprise_income: u64,
    /// Price of a city.
    pub city_cost: u64,
    /// Price of a capital.
    pub capital_cost: u64,
    /// Price of an enterprise.
    pub enterprise_cost: u64,
    /// Price of a warship.
    pub warship_cost: u64,
    /// Price of an atom bomb.
    pub atom_bomb_cost: u64,
    /// Price of a hydrogen bomb.
    pub hydrogen_bomb_cost: u64,
    /// Price of a MIRV.
    pub mirv_cost: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_troops: 2_500,
            starting_gold: 250_000,
            troop_growth_base: 10,
            troop_growth_per_100_tiles: 50,
            max_troops_per_tile: 100,
            gold_per_tick: 100,
            enterprise_income: 500,
            city_cost: 50_000,
            capital_cost: 75_000,
            enterprise_cost: 100_000,
            warship_cost: 100_000,
            atom_bomb_cost: 750_000,
            hydrogen_bomb_cost: 5_000_000,
            mirv_cost: 10_000_000,
        }
    }
}

impl EconomyConfig {
    /// Gold price of a unit type. Units spawned by other units are free.
    #[must_use]
    pub const fn unit_cost(&self, unit_type: UnitType) -> u64 {
        match unit_type {
            UnitType::City => self.city_cost,
            UnitType::Capital => self.capital_cost,
            UnitType::Enterprise => self.enterprise_cost,
            UnitType::Warship => self.warship_cost,
            UnitType::AtomBomb => self.atom_bomb_cost,
            UnitType::HydrogenBomb => self.hydrogen_bomb_cost,
            UnitType::Mirv => self.mirv_cost,
            UnitType::TransportShip
            | UnitType::TradeShip
            | UnitType::Shell
            | UnitType::MirvWarhead => 0,
        }
    }
}

/// `[combat]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Share of current troops committed when an attack leaves `troops` null.
    pub attack_troop_percent: u32,
    /// Border tiles an attack may take per tick.
    pub tiles_per_tick: u32,
    /// Troops spent per conquered tile before defence.
    pub base_tile_cost: u32,
    /// Upper bound of the seeded random extra cost per tile.
    pub jitter: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            attack_troop_percent: 20,
            tiles_per_tick: 4,
            base_tile_cost: 5,
            jitter: 3,
        }
    }
}

/// `[boats]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoatConfig {
    /// Water tiles a transport ship moves per tick.
    pub speed: u32,
    /// Active transport ships allowed per player.
    pub max_per_player: u32,
    /// Longest water path searched, in tiles.
    pub max_path_tiles: u32,
}

impl Default for BoatConfig {
    fn default() -> Self {
        Self {
            speed: 2,
            max_per_player: 3,
            max_path_tiles: 2_048,
        }
    }
}

/// `[alliances]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllianceConfig {
    /// Ticks before an unanswered request expires.
    pub request_ticks: u64,
}

impl Default for AllianceConfig {
    fn default() -> Self {
        Self { request_ticks: 300 }
    }
}

/// `[construction]`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstructionConfig {
    /// Ticks between the stages of a build chain.
    pub ticks: u64,
}

impl Default for ConstructionConfig {
    fn default() -> Self {
        Self { ticks: 10 }
    }
}

impl GameConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] on syntax errors or invalid values.
    pub fn from_toml_str(text: &str) -> GameResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| GameError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GameError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Width and height of the configured map.
    #[must_use]
    pub fn map_size(&self) -> (u32, u32) {
        match self.map.rows.first() {
            Some(first) => (
                u32::try_from(first.chars().count()).unwrap_or(u32::MAX),
                u32::try_from(self.map.rows.len()).unwrap_or(u32::MAX),
            ),
            None => (self.map.width, self.map.height),
        }
    }

    /// Checks every value the engine relies on.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidConfig`] naming the first bad value.
    pub fn validate(&self) -> GameResult<()> {
        let (width, height) = self.map_size();
        if width == 0 || height == 0 {
            return Err(invalid("map must be at least 1x1"));
        }
        if u64::from(width) * u64::from(height) > u64::from(u32::MAX) {
            return Err(invalid("map has more tiles than a tile index can address"));
        }
        for (y, row) in self.map.rows.iter().enumerate() {
            if row.chars().count() != width as usize {
                return Err(invalid(format!("map row {y} is not {width} tiles wide")));
            }
        }
        if self.combat.attack_troop_percent == 0 || self.combat.attack_troop_percent > 100 {
            return Err(invalid("combat.attack_troop_percent must be in 1..=100"));
        }
        if self.combat.tiles_per_tick == 0 {
            return Err(invalid("combat.tiles_per_tick must be positive"));
        }
        if self.boats.speed == 0 {
            return Err(invalid("boats.speed must be positive"));
        }
        if self.construction.ticks == 0 {
            return Err(invalid("construction.ticks must be positive"));
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> GameError {
    GameError::InvalidConfig(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        GameConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GameConfig::from_toml_str(
            r#"
            seed = 7
            [economy]
            city_cost = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.economy.city_cost, 10);
        assert_eq!(config.economy.capital_cost, EconomyConfig::default().capital_cost);
        assert_eq!(config.spawn_phase_ticks, 100);
    }

    #[test]
    fn test_rows_define_map_size() {
        let config = GameConfig::from_toml_str(
            r#"
            [map]
            rows = ["..~", "..~"]
            "#,
        )
        .unwrap();
        assert_eq!(config.map_size(), (3, 2));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = GameConfig::from_toml_str(
            r#"
            [map]
            rows = ["...", ".."]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(msg) if msg.contains("row 1")));
    }

    #[test]
    fn test_zero_speed_rejected() {
        let mut config = GameConfig::default();
        config.boats.speed = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unit_costs() {
        let economy = EconomyConfig::default();
        assert_eq!(economy.unit_cost(UnitType::City), economy.city_cost);
        assert_eq!(economy.unit_cost(UnitType::TransportShip), 0);
    }
}
