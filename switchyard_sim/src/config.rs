// Data-driven game configuration.
//
// All tunable parameters live in `GameConfig`, loaded from JSON at startup.
// Handlers never use magic numbers for prices or limits; they read them from
// the config held by the `World`. In a replicated session every peer must run
// with an identical config: `config_hash()` is sent in the relay handshake
// and mismatches are rejected before the game starts.
//
// `GameSettings` holds the subset that can change during play through the
// `ChangeSetting` command (pause level, town spacing, money transfers). The
// config only provides their starting values; the live values are part of
// the replicated world state.
//
// See also: `world.rs` which owns the config and the live settings,
// `game.rs` for the `ChangeSetting` handler.
//
// **Critical constraint: determinism.** Config values feed directly into
// command costs. No floats: all fractions are expressed per mille.

use crate::flags::CommandPauseLevel;
use crate::types::Money;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use thiserror::Error;

/// Why a config could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("malformed config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Prices
// ---------------------------------------------------------------------------

/// Base prices for every costed action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prices {
    /// Clearing an empty tile before building on it.
    pub clear_grass: Money,
    /// Demolishing a road piece.
    pub clear_road: Money,
    /// Demolishing a house.
    pub clear_house: Money,
    pub build_road: Money,
    /// Removing a road piece with `RemoveRoad`.
    pub remove_road: Money,
    /// Raising or lowering a tile by one level.
    pub terraform: Money,
    pub found_town: Money,
    pub place_sign: Money,
}

impl Default for Prices {
    fn default() -> Self {
        Self {
            clear_grass: 100,
            clear_road: 150,
            clear_house: 2_000,
            build_road: 400,
            remove_road: 120,
            terraform: 250,
            found_town: 20_000,
            place_sign: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings changeable during play
// ---------------------------------------------------------------------------

/// Game settings that can be changed at runtime by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSettings {
    /// What may still be done while the game is paused.
    pub command_pause_level: CommandPauseLevel,
    /// Minimum Manhattan distance between two town centres.
    pub town_min_distance: u32,
    /// Whether companies may transfer money to each other.
    pub give_money: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            command_pause_level: CommandPauseLevel::NoConstruction,
            town_min_distance: 8,
            give_money: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level game config
// ---------------------------------------------------------------------------

/// Top-level game configuration. Loaded from JSON, never mutated at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Map width in tiles.
    pub map_size_x: u32,
    /// Map height in tiles.
    pub map_size_y: u32,
    /// Share of interior tiles generated as water, per mille.
    pub water_per_mille: u32,
    /// Companies created at game start, numbered from 0.
    pub company_count: u8,
    pub starting_money: Money,
    pub prices: Prices,
    /// Maximum number of signs on the map.
    pub max_signs: u32,
    /// Highest terrain level reachable by terraforming.
    pub max_height: u8,
    /// Maximum length in bytes of any command text payload.
    pub max_text_len: usize,
    /// Starting values of the runtime settings.
    pub settings: GameSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            map_size_x: 64,
            map_size_y: 64,
            water_per_mille: 80,
            company_count: 2,
            starting_money: 100_000,
            prices: Prices::default(),
            max_signs: 64,
            max_height: 15,
            max_text_len: 32,
            settings: GameSettings::default(),
        }
    }
}

impl GameConfig {
    /// Parse and validate a config from JSON. Missing fields take their
    /// default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> String {
        // Plain structs with string keys cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.map_size_x < 3 || self.map_size_y < 3 {
            return Err(ConfigError::Invalid(format!(
                "map must be at least 3x3, got {}x{}",
                self.map_size_x, self.map_size_y
            )));
        }
        if self
            .map_size_x
            .checked_mul(self.map_size_y)
            .is_none_or(|n| n == u32::MAX)
        {
            return Err(ConfigError::Invalid("map too large".into()));
        }
        if self.water_per_mille > 1000 {
            return Err(ConfigError::Invalid(format!(
                "water_per_mille must be <= 1000, got {}",
                self.water_per_mille
            )));
        }
        if self.company_count == u8::MAX {
            return Err(ConfigError::Invalid("too many companies".into()));
        }
        Ok(())
    }

    /// Stable hash of the config, compared during the relay handshake.
    pub fn config_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        hasher.write(self.to_json().as_bytes());
        hasher.finish()
    }
}
