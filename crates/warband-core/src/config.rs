//! Configuration loading and typed config structures for the Warband simulation.
//!
//! The canonical configuration lives in `warband-config.yaml` at the project
//! root. Every section carries `#[serde(default)]`, so a partial file (or an
//! empty one) parses into a playable game.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use warband_ledger::ResourceSettings;
use warband_types::ArmamentTier;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The values parsed but describe an unplayable game.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Which setting is wrong and why.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// World name and RNG seed.
    #[serde(default)]
    pub world: WorldConfig,

    /// Per-turn budget.
    #[serde(default)]
    pub turn: TurnConfig,

    /// The player's lord.
    #[serde(default)]
    pub lord: LordConfig,

    /// Currency and morale.
    #[serde(default)]
    pub resources: ResourceSettings,

    /// Starting troops.
    #[serde(default)]
    pub troops: TroopConfig,

    /// Combat constants.
    #[serde(default)]
    pub combat: CombatConfig,

    /// Marketplace settings.
    #[serde(default)]
    pub market: MarketConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };

        if self.turn.action_points_per_turn == 0 {
            return invalid("turn.action_points_per_turn must be at least 1");
        }
        if self.lord.max_mana < 0 {
            return invalid("lord.max_mana must not be negative");
        }
        if self.resources.morale_decay_divisor == 0 {
            return invalid("resources.morale_decay_divisor must be at least 1");
        }
        if self.market.ward_shelf_min > self.market.ward_shelf_max {
            return invalid("market.ward_shelf_min exceeds market.ward_shelf_max");
        }
        let combat = &self.combat;
        if !(combat.raid_power_coefficient > 0.0 && combat.raid_power_coefficient <= 1.0) {
            return invalid("combat.raid_power_coefficient must be in (0, 1]");
        }
        if combat.casualty_slope <= 0.0 || !combat.casualty_slope.is_finite() {
            return invalid("combat.casualty_slope must be positive");
        }
        for (name, cap) in [
            ("victory_casualty_cap", combat.victory_casualty_cap),
            ("defeat_casualty_cap", combat.defeat_casualty_cap),
        ] {
            if !(0.0..=1.0).contains(&cap) {
                return Err(ConfigError::Invalid {
                    reason: format!("combat.{name} must be in [0, 1]"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Human-readable game name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Seed for the game's single random number generator.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_world_name() -> String {
    String::from("Warband")
}

const fn default_seed() -> u64 {
    42
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
        }
    }
}

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// Per-turn budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnConfig {
    /// Action points available each turn.
    #[serde(default = "default_action_points")]
    pub action_points_per_turn: u32,
}

const fn default_action_points() -> u32 {
    3
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            action_points_per_turn: default_action_points(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lord
// ---------------------------------------------------------------------------

/// The player's lord.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LordConfig {
    /// Lord's name.
    #[serde(default = "default_lord_name")]
    pub name: String,

    /// Mana at game start.
    #[serde(default)]
    pub mana: i64,

    /// Mana ceiling.
    #[serde(default = "default_max_mana")]
    pub max_mana: i64,
}

fn default_lord_name() -> String {
    String::from("The Lord")
}

const fn default_max_mana() -> i64 {
    100
}

impl Default for LordConfig {
    fn default() -> Self {
        Self {
            name: default_lord_name(),
            mana: 0,
            max_mana: default_max_mana(),
        }
    }
}

// ---------------------------------------------------------------------------
// Troops
// ---------------------------------------------------------------------------

/// Troops placed in the common pool at game start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopConfig {
    /// Count per tier, e.g. `unarmed: 40`.
    #[serde(default)]
    pub starting: BTreeMap<ArmamentTier, u32>,
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// Combat constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatConfig {
    /// Action points a normal assault costs.
    #[serde(default = "default_normal_action_points")]
    pub normal_action_points: u32,

    /// Action points a raid costs.
    #[serde(default = "default_raid_action_points")]
    pub raid_action_points: u32,

    /// Multiplier applied to a champion's power when deployed in raid mode.
    #[serde(default = "default_raid_power_coefficient")]
    pub raid_power_coefficient: f64,

    /// Slope of both casualty curves.
    #[serde(default = "default_casualty_slope")]
    pub casualty_slope: f64,

    /// Highest casualty fraction after a victory.
    #[serde(default = "default_victory_casualty_cap")]
    pub victory_casualty_cap: f64,

    /// Highest casualty fraction after a defeat.
    #[serde(default = "default_defeat_casualty_cap")]
    pub defeat_casualty_cap: f64,
}

const fn default_normal_action_points() -> u32 {
    3
}

const fn default_raid_action_points() -> u32 {
    2
}

const fn default_raid_power_coefficient() -> f64 {
    0.8
}

const fn default_casualty_slope() -> f64 {
    0.4
}

const fn default_victory_casualty_cap() -> f64 {
    0.6
}

const fn default_defeat_casualty_cap() -> f64 {
    0.8
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            normal_action_points: default_normal_action_points(),
            raid_action_points: default_raid_action_points(),
            raid_power_coefficient: default_raid_power_coefficient(),
            casualty_slope: default_casualty_slope(),
            victory_casualty_cap: default_victory_casualty_cap(),
            defeat_casualty_cap: default_defeat_casualty_cap(),
        }
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Marketplace settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Fewest wards listed per refresh.
    #[serde(default = "default_shelf_min")]
    pub ward_shelf_min: u32,

    /// Most wards listed per refresh.
    #[serde(default = "default_shelf_max")]
    pub ward_shelf_max: u32,
}

const fn default_shelf_min() -> u32 {
    1
}

const fn default_shelf_max() -> u32 {
    3
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            ward_shelf_min: default_shelf_min(),
            ward_shelf_max: default_shelf_max(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level (trace, debug, info, warn, error); `RUST_LOG` wins.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    String::from("info")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
