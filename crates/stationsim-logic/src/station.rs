//! Station driver: the reference host for the gas core.
//!
//! A [`Station`] owns the tile grid, every disposal bin, the timer queue,
//! the event log and the disposal registry, and advances them in a fixed
//! order once per tick:
//!
//! 1. advance the clock by `tick_interval`;
//! 2. deliver every due timer, earliest first;
//! 3. tick each bin against the gas on its tile, in insertion order;
//! 4. run one atmospherics exchange pass over dirty tiles.
//!
//! Everything happens on the caller's thread, so each tile's gas has a
//! single writer at any moment.
//!
//! Events and flushed packets accumulate until the host takes them: call
//! [`Station::drain_events`] and [`Station::deliver_packets`] once per frame,
//! or both grow without bound and are carried into every save.
//!
//! ```
//! use stationsim_logic::config::SimConfig;
//! use stationsim_logic::disposal::BinState;
//! use stationsim_logic::station::Station;
//! use stationsim_logic::tiles::TilePos;
//!
//! let mut station = Station::new(SimConfig::default()).unwrap();
//! let bin = station.add_bin(TilePos::new(4, 4)).unwrap();
//! station.connect_power(bin);
//! station.power_on(bin);
//! station.run(40);
//! assert_eq!(station.bin(bin).unwrap().state(), BinState::Ready);
//! ```

use std::io::{Read, Write};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{validate_config, SimConfig};
use crate::disposal::{DeviceId, DisposalBin, DunkOutcome, Item};
use crate::error::{PersistenceError, StationError};
use crate::events::{DeviceEvent, EventLog};
use crate::persistence;
use crate::registry::{DisposalPacket, DisposalRegistry};
use crate::scheduler::TimerQueue;
use crate::tiles::{TileGrid, TilePos};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    config: SimConfig,
    tiles: TileGrid,
    bins: Vec<DisposalBin>,
    timers: TimerQueue,
    events: EventLog,
    registry: DisposalRegistry,
    tick_count: u64,
    next_device: u32,
}

fn find_bin(bins: &mut [DisposalBin], id: DeviceId) -> Option<&mut DisposalBin> {
    let found = bins.iter_mut().find(|b| b.id() == id);
    if found.is_none() {
        log::warn!("no bin with id {:?}", id);
    }
    found
}

impl Station {
    /// Build a station of breathable air. Rejects invalid configs.
    pub fn new(config: SimConfig) -> Result<Self, StationError> {
        let errors = validate_config(&config);
        if !errors.is_empty() {
            return Err(StationError::InvalidConfig(errors));
        }
        let tiles = TileGrid::from_config(&config)?;
        log::info!(
            "station {}x{} ready, tick {:.2}s",
            config.width,
            config.height,
            config.tick_interval
        );
        Ok(Self {
            config,
            tiles,
            bins: Vec::new(),
            timers: TimerQueue::new(),
            events: EventLog::new(),
            registry: DisposalRegistry::new(),
            tick_count: 0,
            next_device: 0,
        })
    }

    fn place_bin(&mut self, pos: TilePos, installed: bool) -> Result<DeviceId, StationError> {
        let temperature = self
            .tiles
            .tile(pos)
            .ok_or(StationError::UnknownTile(pos))?
            .gas
            .temperature();
        let id = DeviceId(self.next_device);
        let bin = if installed {
            DisposalBin::spawn_installed(id, pos, self.config.bin.clone(), temperature)?
        } else {
            DisposalBin::new(id, pos, self.config.bin.clone(), temperature)?
        };
        self.next_device += 1;
        self.bins.push(bin);
        log::debug!("placed bin {:?} at {:?}", id, pos);
        Ok(id)
    }

    /// Take a bin off the station, dropping any timers still addressed to it.
    pub fn remove_bin(&mut self, id: DeviceId) -> Option<DisposalBin> {
        let idx = self.bins.iter().position(|b| b.id() == id)?;
        self.timers.cancel_device(id);
        log::debug!("removed bin {:?}", id);
        Some(self.bins.remove(idx))
    }

    /// Build a new, disconnected bin on `pos`.
    pub fn add_bin(&mut self, pos: TilePos) -> Result<DeviceId, StationError> {
        self.place_bin(pos, false)
    }

    /// Map in a bin that is already powered, charged and ready.
    pub fn add_installed_bin(&mut self, pos: TilePos) -> Result<DeviceId, StationError> {
        self.place_bin(pos, true)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn bin(&self, id: DeviceId) -> Option<&DisposalBin> {
        self.bins.iter().find(|b| b.id() == id)
    }

    pub fn bins(&self) -> &[DisposalBin] {
        &self.bins
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut TileGrid {
        &mut self.tiles
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<DeviceEvent> {
        self.events.drain()
    }

    /// Take every packet flushed since the last call.
    pub fn deliver_packets(&mut self) -> Vec<DisposalPacket> {
        self.registry.deliver_all()
    }

    pub fn registry(&self) -> &DisposalRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DisposalRegistry {
        &mut self.registry
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Simulated seconds since the station started.
    pub fn now(&self) -> f64 {
        self.timers.now()
    }

    /// Moles held by tiles and bin reservoirs together.
    pub fn total_moles(&self) -> f32 {
        self.tiles.total_moles()
            + self
                .bins
                .iter()
                .map(|b| b.reservoir().total_moles())
                .sum::<f32>()
    }

    /// Write a versioned snapshot of the whole station.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), PersistenceError> {
        persistence::save_station(self, writer)
    }

    /// Restore a station written by [`Station::save`].
    pub fn load<R: Read>(reader: R) -> Result<Self, PersistenceError> {
        persistence::load_station(reader)
    }

    // ── Tick ───────────────────────────────────────────────────────────

    /// Advance the whole station by one tick.
    pub fn tick(&mut self) {
        self.timers.advance(self.config.tick_interval);
        self.tick_count += 1;

        while let Some(due) = self.timers.pop_due() {
            if let Some(bin) = find_bin(&mut self.bins, due.timer.device) {
                bin.on_timer(
                    due.handle,
                    due.timer.kind,
                    &mut self.registry,
                    &mut self.timers,
                    &mut self.events,
                );
            }
        }

        for bin in &mut self.bins {
            bin.tick(&mut self.tiles, &mut self.timers, &mut self.events);
        }

        let moved = self.tiles.tick_exchange(self.config.exchange_rate);
        log::trace!(
            "tick {}: exchanged {:.3} mol across {} dirty tile(s)",
            self.tick_count,
            moved,
            self.tiles.dirty_count()
        );
    }

    pub fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    // ── Requests ───────────────────────────────────────────────────────
    //
    // UI-facing entry points. Unknown ids and out-of-state requests return
    // false / None; nothing here is an error.

    pub fn connect_power(&mut self, id: DeviceId) -> bool {
        find_bin(&mut self.bins, id).is_some_and(|bin| bin.connect_power(&mut self.events))
    }

    pub fn disconnect_power(&mut self, id: DeviceId) -> bool {
        find_bin(&mut self.bins, id)
            .is_some_and(|bin| bin.disconnect_power(&mut self.timers, &mut self.events))
    }

    pub fn power_on(&mut self, id: DeviceId) -> bool {
        find_bin(&mut self.bins, id)
            .is_some_and(|bin| bin.power_on(&mut self.timers, &mut self.events))
    }

    pub fn power_off(&mut self, id: DeviceId) -> bool {
        find_bin(&mut self.bins, id)
            .is_some_and(|bin| bin.power_off(&mut self.timers, &mut self.events))
    }

    pub fn toggle_power(&mut self, id: DeviceId) -> bool {
        find_bin(&mut self.bins, id)
            .is_some_and(|bin| bin.toggle_power(&mut self.timers, &mut self.events))
    }

    pub fn flush(&mut self, id: DeviceId) -> bool {
        find_bin(&mut self.bins, id)
            .is_some_and(|bin| bin.flush_contents(&mut self.timers, &mut self.events))
    }

    pub fn insert_item(&mut self, id: DeviceId, item: Item) -> bool {
        match find_bin(&mut self.bins, id) {
            Some(bin) => {
                bin.insert_item(item, &mut self.timers, &mut self.events);
                true
            }
            None => false,
        }
    }

    /// Throw `item` at a bin. An unknown bin hands the item straight back.
    pub fn try_dunk<R: Rng>(&mut self, id: DeviceId, item: Item, rng: &mut R) -> DunkOutcome {
        match find_bin(&mut self.bins, id) {
            Some(bin) => bin.try_dunk(item, rng, &mut self.timers, &mut self.events),
            None => DunkOutcome::Missed(item),
        }
    }

    pub fn eject(&mut self, id: DeviceId) -> Vec<Item> {
        find_bin(&mut self.bins, id)
            .map(|bin| bin.eject_contents(&mut self.timers, &mut self.events))
            .unwrap_or_default()
    }

    pub fn try_escape(&mut self, id: DeviceId, entity: u64) -> Option<Item> {
        find_bin(&mut self.bins, id).and_then(|bin| bin.try_escape(entity, &mut self.events))
    }
}
