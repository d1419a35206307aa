//! Error types for the gas core and station persistence.

use thiserror::Error;

use crate::config::ConfigError;
use crate::gas::Gas;
use crate::tiles::TilePos;

/// Malformed gas-mix input. Fatal to the call that received it, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GasError {
    #[error("invalid quantity {quantity} mol for {gas:?}: must be finite and non-negative")]
    InvalidGasQuantity { gas: Gas, quantity: f32 },
    #[error("invalid volume {0} m³: must be finite and positive")]
    InvalidVolume(f32),
    #[error("invalid temperature {0} K: must be finite and positive")]
    InvalidTemperature(f32),
}

/// Save/load failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("save version mismatch: file is v{found}, expected v{expected}")]
    VersionMismatch { found: u32, expected: u32 },
}

/// Failures building or addressing a station.
#[derive(Debug, Error)]
pub enum StationError {
    #[error("invalid configuration: {0:?}")]
    InvalidConfig(Vec<ConfigError>),
    #[error(transparent)]
    Gas(#[from] GasError),
    #[error("no tile at {0:?}")]
    UnknownTile(TilePos),
}
