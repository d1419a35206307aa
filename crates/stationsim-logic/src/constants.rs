//! Physical and gameplay constants.
//!
//! Plain `f32` values with no engine dependency. Gameplay tunables here are
//! the defaults for [`crate::config::BinConfig`] and
//! [`crate::config::SimConfig`]; hosts override them through config.

/// Thermodynamic constants shared by every gas mix.
pub mod physics {
    /// Ideal gas constant, J/(mol·K).
    pub const GAS_CONSTANT: f32 = 8.314;
    /// Standard sea-level pressure in kPa.
    pub const ONE_ATMOSPHERE: f32 = 101.325;
    /// 20°C in Kelvin.
    pub const ROOM_TEMPERATURE: f32 = 293.15;
    /// Volume of a single map tile in m³.
    pub const TILE_VOLUME: f32 = 2.5;
}

/// Disposal bin tunables.
pub mod disposal {
    /// Reservoir pressure at which the bin counts as charged (kPa).
    pub const CHARGED_PRESSURE: f32 = 200.0;
    /// Reservoir volume in m³.
    pub const RESERVOIR_VOLUME: f32 = 0.3;
    /// Upper bound on moles moved by the pump in one tick.
    pub const MAX_MOLES_PER_TICK: f32 = 8.0;
    /// Fraction of the computed pressure deficit pumped per tick.
    pub const PUMP_FACTOR: f32 = 0.5;
    /// Seconds between an item landing in a ready bin and the automatic flush.
    pub const AUTO_FLUSH_DELAY: f32 = 2.0;
    /// Seconds the flush sequence takes (matches the flush animation length).
    pub const FLUSH_DURATION: f32 = 1.3;
    /// Percent chance a thrown item bounces off the rim.
    pub const DUNK_MISS_CHANCE: u32 = 25;
}

/// Station driver tunables.
pub mod station {
    /// Seconds per simulation tick.
    pub const TICK_INTERVAL: f32 = 1.0;
    /// Fraction of the equalizing amount exchanged between neighbouring
    /// tiles per tick.
    pub const TILE_EXCHANGE_RATE: f32 = 0.3;
}
