//! Pure gas-transfer and pressure-pump logic for the station simulation.
//!
//! This crate contains the atmospherics core that is independent of any
//! engine, renderer or network layer. A host application owns the map and
//! the clock, calls into the core once per simulation tick, and supplies
//! or consumes plain numeric tile data.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | Station and disposal bin tunables, validation |
//! | [`constants`] | Physical constants and gameplay defaults |
//! | [`disposal`] | Disposal bin state machine and charge pump |
//! | [`error`] | Gas, station and persistence error types |
//! | [`events`] | State-change notifications for presentation layers |
//! | [`gas`] | Gas mixes: per-species moles, ideal-gas pressure |
//! | [`persistence`] | Versioned bincode save/load of a station |
//! | [`registry`] | Disposal network packets leaving flushed bins |
//! | [`scheduler`] | Timer contract between core and host, timer queue |
//! | [`station`] | Reference host: fixed-order tick driver |
//! | [`tiles`] | Per-tile gas storage and neighbour exchange |
//! | [`transfer`] | Conservative mole transfer and pressure equalization |

pub mod config;
pub mod constants;
pub mod disposal;
pub mod error;
pub mod events;
pub mod gas;
pub mod persistence;
pub mod registry;
pub mod scheduler;
pub mod station;
pub mod tiles;
pub mod transfer;
