//! Save/load for whole stations.
//!
//! Uses bincode. A [`SaveData`] snapshot carries a format version and the
//! full [`Station`]: tiles, bins, pending timers, the disposal registry and
//! the clock. Loading a snapshot written by another version fails.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::station::Station;

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of a station.
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub station: Station,
}

/// Write `station` to `writer`.
pub fn save_station<W: Write>(station: &Station, mut writer: W) -> Result<(), PersistenceError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        station: station.clone(),
    };
    bincode::serialize_into(&mut writer, &save_data)?;
    writer.flush()?;
    log::info!(
        "saved station at tick {} ({} bins)",
        station.tick_count(),
        station.bins().len()
    );
    Ok(())
}

/// Read a station previously written by [`save_station`].
pub fn load_station<R: Read>(reader: R) -> Result<Station, PersistenceError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;
    if save_data.version != SAVE_VERSION {
        return Err(PersistenceError::VersionMismatch {
            found: save_data.version,
            expected: SAVE_VERSION,
        });
    }
    log::info!("loaded station at tick {}", save_data.station.tick_count());
    Ok(save_data.station)
}

pub fn save_to_bytes(station: &Station) -> Result<Vec<u8>, PersistenceError> {
    let mut buf = Vec::new();
    save_station(station, &mut buf)?;
    Ok(buf)
}

pub fn load_from_bytes(bytes: &[u8]) -> Result<Station, PersistenceError> {
    load_station(bytes)
}
