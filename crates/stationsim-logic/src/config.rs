//! Simulation configuration: station driver and disposal bin tunables.
//!
//! Hosts build a [`SimConfig`] (usually from JSON) and hand it to the
//! station at construction time. Nothing here is global; two stations with
//! different configs can run side by side.
//!
//! ```
//! use stationsim_logic::config::{validate_config, SimConfig};
//!
//! let config = SimConfig::default();
//! assert!(validate_config(&config).is_empty());
//! assert_eq!(config.bin.target_pressure, 200.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{disposal, physics, station};

/// Disposal bin pump and timing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinConfig {
    /// Charge pressure at which the bin is ready (kPa).
    pub target_pressure: f32,
    /// Reservoir volume (m³).
    pub reservoir_volume: f32,
    /// Per-tick cap on moles pumped from the tile.
    pub max_moles_per_tick: f32,
    /// Fraction of the computed deficit pumped per tick.
    pub pump_factor: f32,
    /// Seconds from an item entering a ready bin to the automatic flush.
    pub auto_flush_delay: f32,
    /// Seconds the flush sequence takes.
    pub flush_duration: f32,
    /// Percent chance (0–100) a thrown item misses the bin.
    pub dunk_miss_chance: u32,
}

impl Default for BinConfig {
    fn default() -> Self {
        Self {
            target_pressure: disposal::CHARGED_PRESSURE,
            reservoir_volume: disposal::RESERVOIR_VOLUME,
            max_moles_per_tick: disposal::MAX_MOLES_PER_TICK,
            pump_factor: disposal::PUMP_FACTOR,
            auto_flush_delay: disposal::AUTO_FLUSH_DELAY,
            flush_duration: disposal::FLUSH_DURATION,
            dunk_miss_chance: disposal::DUNK_MISS_CHANCE,
        }
    }
}

/// Station-wide parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seconds of simulated time per tick.
    pub tick_interval: f32,
    /// Tile grid width.
    pub width: u32,
    /// Tile grid height.
    pub height: u32,
    /// Volume of every tile (m³).
    pub tile_volume: f32,
    /// Initial tile temperature (K).
    pub tile_temperature: f32,
    /// Initial tile pressure (kPa).
    pub tile_pressure: f32,
    /// Fraction of the equalizing amount shared with each open neighbour
    /// per tick.
    pub exchange_rate: f32,
    pub bin: BinConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval: station::TICK_INTERVAL,
            width: 16,
            height: 16,
            tile_volume: physics::TILE_VOLUME,
            tile_temperature: physics::ROOM_TEMPERATURE,
            tile_pressure: physics::ONE_ATMOSPHERE,
            exchange_rate: station::TILE_EXCHANGE_RATE,
            bin: BinConfig::default(),
        }
    }
}

impl SimConfig {
    /// Every out-of-range field, empty when the config is usable.
    pub fn validate(&self) -> Vec<ConfigError> {
        validate_config(self)
    }
}

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Tick interval must be positive.
    InvalidTickInterval(f32),
    /// Grid must have at least one tile.
    EmptyGrid { width: u32, height: u32 },
    /// Tile volume must be positive.
    InvalidTileVolume(f32),
    /// Tile temperature must be positive.
    InvalidTileTemperature(f32),
    /// Tile pressure must be non-negative.
    InvalidTilePressure(f32),
    /// Exchange rate outside `[0, 1]`.
    InvalidExchangeRate(f32),
    /// Target pressure must be positive.
    InvalidTargetPressure(f32),
    /// Reservoir volume must be positive.
    InvalidReservoirVolume(f32),
    /// Per-tick mole cap must be positive.
    InvalidMoleCap(f32),
    /// Pump factor outside `(0, 1]`.
    InvalidPumpFactor(f32),
    /// Timer delays must be non-negative.
    InvalidDelay(f32),
    /// Miss chance above 100%.
    InvalidMissChance(u32),
}

fn positive(v: f32) -> bool {
    v.is_finite() && v > 0.0
}

/// Validate a configuration, returning all errors found.
pub fn validate_config(config: &SimConfig) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    if !positive(config.tick_interval) {
        errors.push(ConfigError::InvalidTickInterval(config.tick_interval));
    }
    if config.width == 0 || config.height == 0 {
        errors.push(ConfigError::EmptyGrid {
            width: config.width,
            height: config.height,
        });
    }
    if !positive(config.tile_volume) {
        errors.push(ConfigError::InvalidTileVolume(config.tile_volume));
    }
    if !positive(config.tile_temperature) {
        errors.push(ConfigError::InvalidTileTemperature(config.tile_temperature));
    }
    if !(config.tile_pressure.is_finite() && config.tile_pressure >= 0.0) {
        errors.push(ConfigError::InvalidTilePressure(config.tile_pressure));
    }
    if !(0.0..=1.0).contains(&config.exchange_rate) {
        errors.push(ConfigError::InvalidExchangeRate(config.exchange_rate));
    }

    let bin = &config.bin;
    if !positive(bin.target_pressure) {
        errors.push(ConfigError::InvalidTargetPressure(bin.target_pressure));
    }
    if !positive(bin.reservoir_volume) {
        errors.push(ConfigError::InvalidReservoirVolume(bin.reservoir_volume));
    }
    if !positive(bin.max_moles_per_tick) {
        errors.push(ConfigError::InvalidMoleCap(bin.max_moles_per_tick));
    }
    if !(positive(bin.pump_factor) && bin.pump_factor <= 1.0) {
        errors.push(ConfigError::InvalidPumpFactor(bin.pump_factor));
    }
    for delay in [bin.auto_flush_delay, bin.flush_duration] {
        if !(delay.is_finite() && delay >= 0.0) {
            errors.push(ConfigError::InvalidDelay(delay));
        }
    }
    if bin.dunk_miss_chance > 100 {
        errors.push(ConfigError::InvalidMissChance(bin.dunk_miss_chance));
    }

    errors
}
