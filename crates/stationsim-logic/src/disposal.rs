//! Disposal bin: a pressure-driven device controller.
//!
//! The bin keeps a sealed air reservoir that it pumps up from the gas on
//! its own tile. Once the reservoir reaches the target pressure the bin is
//! ready; flushing releases the charge, sends the payload into the
//! disposal network and starts recharging again.
//!
//! # States
//!
//! | State | Pump | Accepts power-on | Accepts power-off |
//! |-------|------|------------------|-------------------|
//! | `Disconnected` | frozen | no | no |
//! | `Off` | idle | yes | — |
//! | `Recharging` | one pump step per tick | — | yes |
//! | `Ready` | idle, auto-flushes a non-empty payload | — | yes |
//! | `Flushing` | idle until the flush timer fires | — | no |
//!
//! Out-of-state requests are no-ops reported through the return value,
//! never errors: UI actions can race the bin's state.
//!
//! Delays (auto-flush, flush duration) go through a [`Scheduler`]; the
//! host delivers expiries to [`DisposalBin::on_timer`] and calls
//! [`DisposalBin::tick`] once per simulation tick.
//!
//! ```
//! use stationsim_logic::config::BinConfig;
//! use stationsim_logic::disposal::{BinState, DeviceId, DisposalBin};
//! use stationsim_logic::events::EventLog;
//! use stationsim_logic::scheduler::TimerQueue;
//! use stationsim_logic::tiles::TilePos;
//!
//! let mut timers = TimerQueue::new();
//! let mut events = EventLog::new();
//! let mut bin = DisposalBin::new(DeviceId(1), TilePos::new(0, 0), BinConfig::default(), 293.15).unwrap();
//!
//! assert!(!bin.power_on(&mut timers, &mut events), "disconnected bins cannot power on");
//! assert!(bin.connect_power(&mut events));
//! assert!(bin.power_on(&mut timers, &mut events));
//! assert_eq!(bin.state(), BinState::Recharging);
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::BinConfig;
use crate::error::GasError;
use crate::events::{DeviceEvent, EventSink};
use crate::gas::{Gas, GasMix};
use crate::registry::DisposalRegistry;
use crate::scheduler::{Scheduler, Timer, TimerHandle, TimerKind};
use crate::tiles::{TileGasProvider, TilePos};
use crate::transfer::{clamp, transfer_gas};

/// Identifies one device on the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinState {
    /// Not wired to power. Everything frozen.
    Disconnected,
    /// Wired but switched off.
    Off,
    /// Charged and waiting for a flush.
    Ready,
    /// Releasing the charge and payload.
    Flushing,
    /// Pumping the reservoir back up.
    Recharging,
}

/// Something sitting in the bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    /// Players can try to climb back out.
    pub is_player: bool,
}

impl Item {
    pub fn object(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_player: false,
        }
    }

    pub fn player(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_player: true,
        }
    }
}

/// Result of throwing an item at the bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DunkOutcome {
    Scored,
    /// Bounced off the rim; the item is handed back.
    Missed(Item),
}

/// Moles the pump pulls from a tile holding `tile_moles` into a reservoir
/// at `reservoir_pressure`, already clamped to `[0, max_moles_per_tick]`.
///
/// The deficit term `-(n - n·target/P)` shrinks as the reservoir nears the
/// target, so the charge approaches the target asymptotically unless the
/// tile holds enough gas for the final step to cross it. An empty
/// reservoir pumps at the cap.
pub fn pump_moles(tile_moles: f32, reservoir_pressure: f32, config: &BinConfig) -> f32 {
    let deficit = if reservoir_pressure > 0.0 {
        -(tile_moles - tile_moles * (config.target_pressure / reservoir_pressure))
    } else if tile_moles > 0.0 {
        f32::INFINITY
    } else {
        0.0
    };
    clamp(
        deficit * config.pump_factor,
        0.0,
        config.max_moles_per_tick,
    )
}

/// A disposal bin and its charge reservoir.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisposalBin {
    id: DeviceId,
    position: TilePos,
    state: BinState,
    reservoir: GasMix,
    contents: Vec<Item>,
    auto_flush: Option<TimerHandle>,
    flush_timer: Option<TimerHandle>,
    config: BinConfig,
}

impl DisposalBin {
    /// A freshly built bin: disconnected, reservoir empty.
    pub fn new(
        id: DeviceId,
        position: TilePos,
        config: BinConfig,
        temperature: f32,
    ) -> Result<Self, GasError> {
        let reservoir = GasMix::new(config.reservoir_volume, temperature)?;
        Ok(Self {
            id,
            position,
            state: BinState::Disconnected,
            reservoir,
            contents: Vec::new(),
            auto_flush: None,
            flush_timer: None,
            config,
        })
    }

    /// A bin mapped in as already installed: powered, charged and ready.
    pub fn spawn_installed(
        id: DeviceId,
        position: TilePos,
        config: BinConfig,
        temperature: f32,
    ) -> Result<Self, GasError> {
        let mut reservoir =
            GasMix::air(config.reservoir_volume, temperature, config.target_pressure)?;
        // Rounding can land a hair under the target; a charged bin must read as charged.
        if reservoir.pressure() < config.target_pressure {
            let top_up = reservoir.total_moles() * 1e-6;
            reservoir.add_moles(Gas::Nitrogen, top_up);
        }
        Ok(Self {
            id,
            position,
            state: BinState::Ready,
            reservoir,
            contents: Vec::new(),
            auto_flush: None,
            flush_timer: None,
            config,
        })
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn position(&self) -> TilePos {
        self.position
    }

    pub fn state(&self) -> BinState {
        self.state
    }

    pub fn config(&self) -> &BinConfig {
        &self.config
    }

    pub fn reservoir(&self) -> &GasMix {
        &self.reservoir
    }

    /// Current charge in kPa, always read off the reservoir.
    pub fn charge_pressure(&self) -> f32 {
        self.reservoir.pressure()
    }

    pub fn is_charged(&self) -> bool {
        self.charge_pressure() >= self.config.target_pressure
    }

    pub fn contents(&self) -> &[Item] {
        &self.contents
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn has_pending_auto_flush(&self) -> bool {
        self.auto_flush.is_some()
    }

    /// One-line status for examine text.
    pub fn examine(&self) -> &'static str {
        match self.state {
            BinState::Disconnected => "It is disconnected from the power.",
            BinState::Off => "Its power is switched off.",
            BinState::Ready => "It is ready for use.",
            BinState::Flushing => "It is currently flushing its contents.",
            BinState::Recharging => "It is currently restoring pressure.",
        }
    }

    fn set_state(&mut self, to: BinState, events: &mut impl EventSink) {
        let from = self.state;
        if from == to {
            return;
        }
        self.state = to;
        log::info!("bin {:?}: {:?} -> {:?}", self.id, from, to);
        events.emit(DeviceEvent::StateChanged {
            device: self.id,
            from,
            to,
        });
    }

    fn timer(&self, kind: TimerKind) -> Timer {
        Timer {
            device: self.id,
            kind,
        }
    }

    fn cancel_auto_flush(&mut self, scheduler: &mut impl Scheduler) {
        if let Some(handle) = self.auto_flush.take() {
            scheduler.cancel_timer(handle);
        }
    }

    fn restart_auto_flush(&mut self, scheduler: &mut impl Scheduler) {
        self.cancel_auto_flush(scheduler);
        let timer = self.timer(TimerKind::AutoFlush);
        self.auto_flush = Some(scheduler.schedule_timer(self.config.auto_flush_delay, timer));
    }

    // ── Power ──────────────────────────────────────────────────────────

    /// Wire the bin to power. Only valid while disconnected.
    pub fn connect_power(&mut self, events: &mut impl EventSink) -> bool {
        if self.state != BinState::Disconnected {
            log::debug!("bin {:?}: connect ignored in {:?}", self.id, self.state);
            return false;
        }
        self.set_state(BinState::Off, events);
        true
    }

    /// Unwire the bin. Only valid while switched off.
    pub fn disconnect_power(
        &mut self,
        scheduler: &mut impl Scheduler,
        events: &mut impl EventSink,
    ) -> bool {
        if self.state != BinState::Off {
            log::debug!("bin {:?}: disconnect ignored in {:?}", self.id, self.state);
            return false;
        }
        self.cancel_auto_flush(scheduler);
        self.set_state(BinState::Disconnected, events);
        true
    }

    /// Switch on. Goes straight to `Ready` if the reservoir still holds its
    /// charge, otherwise starts recharging.
    pub fn power_on(&mut self, scheduler: &mut impl Scheduler, events: &mut impl EventSink) -> bool {
        if self.state != BinState::Off {
            log::debug!("bin {:?}: power-on ignored in {:?}", self.id, self.state);
            return false;
        }
        if self.is_charged() {
            self.set_state(BinState::Ready, events);
            if !self.contents.is_empty() {
                self.restart_auto_flush(scheduler);
            }
        } else {
            self.set_state(BinState::Recharging, events);
        }
        true
    }

    /// Switch off, cancelling any pending auto-flush and halting the pump.
    /// Rejected mid-flush and while disconnected.
    pub fn power_off(&mut self, scheduler: &mut impl Scheduler, events: &mut impl EventSink) -> bool {
        match self.state {
            BinState::Ready | BinState::Recharging => {
                self.cancel_auto_flush(scheduler);
                self.set_state(BinState::Off, events);
                true
            }
            // A disconnected bin stays inert; it must be wired up before any switching.
            BinState::Flushing | BinState::Disconnected | BinState::Off => {
                log::debug!("bin {:?}: power-off ignored in {:?}", self.id, self.state);
                false
            }
        }
    }

    /// The UI power switch.
    pub fn toggle_power(&mut self, scheduler: &mut impl Scheduler, events: &mut impl EventSink) -> bool {
        if self.state == BinState::Off {
            self.power_on(scheduler, events)
        } else {
            self.power_off(scheduler, events)
        }
    }

    // ── Pump ───────────────────────────────────────────────────────────

    /// Advance one simulation tick. Only does work while recharging.
    pub fn tick(
        &mut self,
        tiles: &mut impl TileGasProvider,
        scheduler: &mut impl Scheduler,
        events: &mut impl EventSink,
    ) {
        if self.state != BinState::Recharging {
            return;
        }

        if !self.is_charged() {
            match tiles.tile_gas_mut(self.position) {
                Some(tile_gas) => {
                    self.operate_air_pump(tile_gas);
                }
                None => {
                    log::warn!("bin {:?}: no tile gas at {:?}", self.id, self.position);
                    return;
                }
            }
            tiles.mark_dirty(self.position);
            events.emit(DeviceEvent::ChargeChanged {
                device: self.id,
                pressure: self.charge_pressure(),
            });
        }

        if self.is_charged() {
            self.set_state(BinState::Ready, events);
            events.emit(DeviceEvent::AirFlapClosed { device: self.id });
            if !self.contents.is_empty() {
                self.restart_auto_flush(scheduler);
            }
        }
    }

    /// One pump step from the tile into the reservoir. Returns moles moved.
    pub fn operate_air_pump(&mut self, tile_gas: &mut GasMix) -> f32 {
        let requested = pump_moles(
            tile_gas.total_moles(),
            self.reservoir.pressure(),
            &self.config,
        );
        let moved = transfer_gas(tile_gas, &mut self.reservoir, requested);
        log::trace!(
            "bin {:?}: pumped {:.3} mol, charge {:.2} kPa",
            self.id,
            moved,
            self.charge_pressure()
        );
        moved
    }

    // ── Payload ────────────────────────────────────────────────────────

    /// Drop an item in. (Re)starts the auto-flush countdown.
    pub fn insert_item(
        &mut self,
        item: Item,
        scheduler: &mut impl Scheduler,
        events: &mut impl EventSink,
    ) {
        events.emit(DeviceEvent::ItemStored {
            device: self.id,
            item: item.clone(),
        });
        self.contents.push(item);
        self.restart_auto_flush(scheduler);
    }

    /// Throw an item at the bin. Misses with `dunk_miss_chance` percent.
    pub fn try_dunk<R: Rng>(
        &mut self,
        item: Item,
        rng: &mut R,
        scheduler: &mut impl Scheduler,
        events: &mut impl EventSink,
    ) -> DunkOutcome {
        if rng.gen_range(0..100) < self.config.dunk_miss_chance {
            log::debug!("bin {:?}: {} bounced off the rim", self.id, item.name);
            events.emit(DeviceEvent::DunkMissed {
                device: self.id,
                item: item.clone(),
            });
            return DunkOutcome::Missed(item);
        }
        self.insert_item(item, scheduler, events);
        DunkOutcome::Scored
    }

    /// Empty the bin by hand. Cancels a pending auto-flush; returns nothing
    /// while flushing.
    pub fn eject_contents(
        &mut self,
        scheduler: &mut impl Scheduler,
        events: &mut impl EventSink,
    ) -> Vec<Item> {
        self.cancel_auto_flush(scheduler);
        if self.state == BinState::Flushing {
            return Vec::new();
        }
        let items = std::mem::take(&mut self.contents);
        if !items.is_empty() {
            events.emit(DeviceEvent::ContentsEjected {
                device: self.id,
                count: items.len(),
            });
        }
        items
    }

    /// An entity inside tries to climb out. Too late once flushing.
    pub fn try_escape(&mut self, entity: u64, events: &mut impl EventSink) -> Option<Item> {
        if self.state == BinState::Flushing {
            events.emit(DeviceEvent::EscapeFailed {
                device: self.id,
                entity,
            });
            return None;
        }
        let idx = self.contents.iter().position(|i| i.id == entity)?;
        Some(self.contents.remove(idx))
    }

    // ── Flush ──────────────────────────────────────────────────────────

    /// The flush handle. Only acts when ready.
    pub fn flush_contents(
        &mut self,
        scheduler: &mut impl Scheduler,
        events: &mut impl EventSink,
    ) -> bool {
        if self.state != BinState::Ready {
            log::debug!("bin {:?}: flush ignored in {:?}", self.id, self.state);
            return false;
        }
        self.start_flush(scheduler, events);
        true
    }

    fn start_flush(&mut self, scheduler: &mut impl Scheduler, events: &mut impl EventSink) {
        self.cancel_auto_flush(scheduler);
        self.set_state(BinState::Flushing, events);
        let timer = self.timer(TimerKind::FlushComplete);
        self.flush_timer = Some(scheduler.schedule_timer(self.config.flush_duration, timer));
    }

    /// Timer expiry from the host. Expiries for handles the bin is no
    /// longer waiting on are dropped.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        kind: TimerKind,
        registry: &mut DisposalRegistry,
        scheduler: &mut impl Scheduler,
        events: &mut impl EventSink,
    ) {
        match kind {
            TimerKind::AutoFlush => {
                if self.auto_flush != Some(handle) {
                    log::warn!("bin {:?}: stale auto-flush timer {:?}", self.id, handle);
                    return;
                }
                self.auto_flush = None;
                if self.state == BinState::Ready && !self.contents.is_empty() {
                    self.start_flush(scheduler, events);
                }
            }
            TimerKind::FlushComplete => {
                if self.flush_timer != Some(handle) {
                    log::warn!("bin {:?}: stale flush timer {:?}", self.id, handle);
                    return;
                }
                self.flush_timer = None;
                if self.state != BinState::Flushing {
                    return;
                }
                self.complete_flush(registry, events);
            }
        }
    }

    fn complete_flush(&mut self, registry: &mut DisposalRegistry, events: &mut impl EventSink) {
        // The charge leaves with the payload.
        self.reservoir.reset();
        let items = std::mem::take(&mut self.contents);
        let count = items.len();
        let disposal = registry.new_disposal(self.id, self.position, items);
        events.emit(DeviceEvent::Flushed {
            device: self.id,
            disposal,
            items: count,
        });
        self.set_state(BinState::Recharging, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::physics::{ONE_ATMOSPHERE, ROOM_TEMPERATURE};
    use crate::scheduler::TimerQueue;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// A tile that never runs out: refilled before every access.
    struct BottomlessTile {
        template: GasMix,
        gas: GasMix,
    }

    impl BottomlessTile {
        fn new() -> Self {
            // ~1e6 mol of air at one atmosphere.
            let template = GasMix::air(25_000.0, ROOM_TEMPERATURE, ONE_ATMOSPHERE).unwrap();
            Self {
                gas: template.clone(),
                template,
            }
        }
    }

    impl TileGasProvider for BottomlessTile {
        fn tile_gas_mut(&mut self, _pos: TilePos) -> Option<&mut GasMix> {
            self.gas = self.template.clone();
            Some(&mut self.gas)
        }

        fn mark_dirty(&mut self, _pos: TilePos) {}
    }

    struct Rig {
        bin: DisposalBin,
        timers: TimerQueue,
        events: Vec<DeviceEvent>,
        registry: DisposalRegistry,
        tile: BottomlessTile,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                bin: DisposalBin::new(
                    DeviceId(1),
                    TilePos::new(0, 0),
                    BinConfig::default(),
                    ROOM_TEMPERATURE,
                )
                .unwrap(),
                timers: TimerQueue::new(),
                events: Vec::new(),
                registry: DisposalRegistry::new(),
                tile: BottomlessTile::new(),
            }
        }

        fn ready() -> Self {
            let mut rig = Self::new();
            rig.bin = DisposalBin::spawn_installed(
                DeviceId(1),
                TilePos::new(0, 0),
                BinConfig::default(),
                ROOM_TEMPERATURE,
            )
            .unwrap();
            rig
        }

        fn power_on(&mut self) {
            self.bin.connect_power(&mut self.events);
            self.bin.power_on(&mut self.timers, &mut self.events);
        }

        /// Advance one second: clock, due timers, then the pump.
        fn step(&mut self) {
            self.timers.advance(1.0);
            while let Some(p) = self.timers.pop_due() {
                self.bin.on_timer(
                    p.handle,
                    p.timer.kind,
                    &mut self.registry,
                    &mut self.timers,
                    &mut self.events,
                );
            }
            self.bin
                .tick(&mut self.tile, &mut self.timers, &mut self.events);
        }
    }

    #[test]
    fn test_pump_moles_formula() {
        let config = BinConfig::default();
        // Empty reservoir pumps at the cap.
        assert_eq!(pump_moles(100.0, 0.0, &config), 8.0);
        // Empty tile has nothing to give.
        assert_eq!(pump_moles(0.0, 0.0, &config), 0.0);
        // Above target the raw value is negative and clamps to zero.
        assert_eq!(pump_moles(100.0, 250.0, &config), 0.0);
        // Near target: -(n - n * 200/190) * 0.5
        let expected = -(10.0 - 10.0 * (200.0 / 190.0)) * 0.5;
        assert!((pump_moles(10.0, 190.0, &config) - expected).abs() < 1e-5);
    }

    #[test]
    fn test_new_bin_is_disconnected_and_empty() {
        let rig = Rig::new();
        assert_eq!(rig.bin.state(), BinState::Disconnected);
        assert_eq!(rig.bin.charge_pressure(), 0.0);
        assert!(rig.bin.is_empty());
    }

    #[test]
    fn test_power_on_rejected_when_disconnected() {
        let mut rig = Rig::new();
        assert!(!rig.bin.power_on(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.state(), BinState::Disconnected);
        assert!(rig.events.is_empty());
    }

    #[test]
    fn test_recharge_reaches_ready_without_overshoot() {
        let mut rig = Rig::new();
        rig.power_on();
        assert_eq!(rig.bin.state(), BinState::Recharging);

        let target = rig.bin.config().target_pressure;
        let cap = rig.bin.config().max_moles_per_tick;
        let per_mole = rig.bin.reservoir().temperature() * crate::constants::physics::GAS_CONSTANT
            / rig.bin.reservoir().volume()
            / 1000.0;

        let mut last = rig.bin.charge_pressure();
        let mut ticks = 0;
        while rig.bin.state() == BinState::Recharging {
            rig.step();
            ticks += 1;
            let now = rig.bin.charge_pressure();
            assert!(now > last, "charge must rise every tick");
            last = now;
            assert!(ticks < 50, "recharge did not terminate");
        }

        assert_eq!(rig.bin.state(), BinState::Ready);
        assert!(rig.bin.charge_pressure() >= target);
        assert!(rig.bin.charge_pressure() <= target + cap * per_mole + 1e-3);
        assert!(rig
            .events
            .contains(&DeviceEvent::AirFlapClosed { device: DeviceId(1) }));
    }

    #[test]
    fn test_power_off_halts_recharge() {
        let mut rig = Rig::new();
        rig.power_on();
        rig.step();
        rig.step();
        assert!(rig.bin.power_off(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.state(), BinState::Off);

        let frozen = rig.bin.charge_pressure();
        for _ in 0..10 {
            rig.step();
        }
        assert_eq!(rig.bin.charge_pressure(), frozen);
        assert_eq!(rig.bin.state(), BinState::Off);
    }

    #[test]
    fn test_power_on_when_charged_goes_ready() {
        let mut rig = Rig::ready();
        assert!(rig.bin.power_off(&mut rig.timers, &mut rig.events));
        assert!(rig.bin.power_on(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.state(), BinState::Ready);
    }

    #[test]
    fn test_flush_sequence_resets_reservoir() {
        let mut rig = Rig::ready();
        rig.bin
            .insert_item(Item::object(5, "toolbox"), &mut rig.timers, &mut rig.events);
        assert!(rig.bin.flush_contents(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.state(), BinState::Flushing);
        assert!(!rig.bin.has_pending_auto_flush(), "explicit flush cancels auto-flush");

        // Flush takes 1.3s; after one second it is still running.
        rig.timers.advance(1.0);
        assert!(rig.timers.pop_due().is_none());
        assert_eq!(rig.bin.state(), BinState::Flushing);

        rig.timers.advance(0.5);
        let p = rig.timers.pop_due().unwrap();
        rig.bin.on_timer(
            p.handle,
            p.timer.kind,
            &mut rig.registry,
            &mut rig.timers,
            &mut rig.events,
        );

        assert_eq!(rig.bin.state(), BinState::Recharging);
        assert_eq!(rig.bin.charge_pressure(), 0.0);
        assert!(rig.bin.is_empty());
        assert_eq!(rig.registry.in_transit().len(), 1);
        assert_eq!(rig.registry.in_transit()[0].items[0].name, "toolbox");
    }

    #[test]
    fn test_power_off_rejected_while_flushing() {
        let mut rig = Rig::ready();
        rig.bin.flush_contents(&mut rig.timers, &mut rig.events);
        assert!(!rig.bin.power_off(&mut rig.timers, &mut rig.events));
        assert!(!rig.bin.toggle_power(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.state(), BinState::Flushing);

        rig.step();
        rig.step();
        assert_eq!(rig.bin.state(), BinState::Recharging);
    }

    #[test]
    fn test_flush_ignored_unless_ready() {
        let mut rig = Rig::new();
        assert!(!rig.bin.flush_contents(&mut rig.timers, &mut rig.events));
        rig.power_on();
        assert!(!rig.bin.flush_contents(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.state(), BinState::Recharging);
    }

    #[test]
    fn test_auto_flush_after_delay() {
        let mut rig = Rig::ready();
        rig.bin
            .insert_item(Item::object(1, "paper"), &mut rig.timers, &mut rig.events);
        rig.step();
        assert_eq!(rig.bin.state(), BinState::Ready);
        rig.step();
        assert_eq!(rig.bin.state(), BinState::Flushing);
    }

    #[test]
    fn test_power_off_cancels_auto_flush() {
        let mut rig = Rig::ready();
        rig.bin
            .insert_item(Item::object(1, "paper"), &mut rig.timers, &mut rig.events);
        rig.bin.power_off(&mut rig.timers, &mut rig.events);
        assert!(rig.timers.is_empty());
        for _ in 0..5 {
            rig.step();
        }
        assert_eq!(rig.bin.state(), BinState::Off);
        assert_eq!(rig.bin.contents().len(), 1);
    }

    #[test]
    fn test_eject_cancels_auto_flush() {
        let mut rig = Rig::ready();
        rig.bin
            .insert_item(Item::object(1, "paper"), &mut rig.timers, &mut rig.events);
        let items = rig.bin.eject_contents(&mut rig.timers, &mut rig.events);
        assert_eq!(items.len(), 1);
        assert!(rig.timers.is_empty());
        assert!(rig.bin.is_empty());
    }

    #[test]
    fn test_escape_blocked_while_flushing() {
        let mut rig = Rig::ready();
        rig.bin
            .insert_item(Item::player(42, "assistant"), &mut rig.timers, &mut rig.events);
        rig.bin.flush_contents(&mut rig.timers, &mut rig.events);
        assert!(rig.bin.try_escape(42, &mut rig.events).is_none());
        assert!(rig.events.contains(&DeviceEvent::EscapeFailed {
            device: DeviceId(1),
            entity: 42
        }));
        assert!(rig
            .bin
            .eject_contents(&mut rig.timers, &mut rig.events)
            .is_empty());
    }

    #[test]
    fn test_escape_when_idle() {
        let mut rig = Rig::ready();
        rig.bin
            .insert_item(Item::player(42, "assistant"), &mut rig.timers, &mut rig.events);
        let out = rig.bin.try_escape(42, &mut rig.events).unwrap();
        assert!(out.is_player);
        assert!(rig.bin.try_escape(42, &mut rig.events).is_none());
    }

    #[test]
    fn test_dunk_outcomes() {
        let mut config = BinConfig::default();
        config.dunk_miss_chance = 100;
        let mut bin =
            DisposalBin::spawn_installed(DeviceId(2), TilePos::new(0, 0), config, ROOM_TEMPERATURE)
                .unwrap();
        let mut timers = TimerQueue::new();
        let mut events: Vec<DeviceEvent> = Vec::new();
        let mut rng = StdRng::seed_from_u64(7);

        let out = bin.try_dunk(Item::object(1, "can"), &mut rng, &mut timers, &mut events);
        assert!(matches!(out, DunkOutcome::Missed(_)));
        assert!(bin.is_empty());

        let mut config = BinConfig::default();
        config.dunk_miss_chance = 0;
        let mut bin =
            DisposalBin::spawn_installed(DeviceId(3), TilePos::new(0, 0), config, ROOM_TEMPERATURE)
                .unwrap();
        let out = bin.try_dunk(Item::object(1, "can"), &mut rng, &mut timers, &mut events);
        assert_eq!(out, DunkOutcome::Scored);
        assert_eq!(bin.contents().len(), 1);
    }

    #[test]
    fn test_power_off_ignored_when_disconnected() {
        let mut rig = Rig::new();
        assert!(!rig.bin.power_off(&mut rig.timers, &mut rig.events));
        assert!(!rig.bin.toggle_power(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.state(), BinState::Disconnected);
        assert!(rig.events.is_empty());
    }

    #[test]
    fn test_disconnect_only_from_off() {
        let mut rig = Rig::ready();
        assert!(!rig.bin.disconnect_power(&mut rig.timers, &mut rig.events));
        rig.bin.power_off(&mut rig.timers, &mut rig.events);
        assert!(rig.bin.disconnect_power(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.state(), BinState::Disconnected);
        assert!(!rig.bin.toggle_power(&mut rig.timers, &mut rig.events));
        assert_eq!(rig.bin.examine(), "It is disconnected from the power.");
    }

    #[test]
    fn test_stale_timer_ignored() {
        let mut rig = Rig::ready();
        rig.bin
            .insert_item(Item::object(1, "paper"), &mut rig.timers, &mut rig.events);
        rig.bin.on_timer(
            TimerHandle(999),
            TimerKind::AutoFlush,
            &mut rig.registry,
            &mut rig.timers,
            &mut rig.events,
        );
        assert_eq!(rig.bin.state(), BinState::Ready);
        assert!(rig.bin.has_pending_auto_flush());
    }
}
