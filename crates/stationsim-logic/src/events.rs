//! State-change notifications for presentation layers.
//!
//! The core never touches sprites, sounds or UI. It emits a
//! [`DeviceEvent`] into an [`EventSink`] and whoever renders the station
//! reacts to it.

use serde::{Deserialize, Serialize};

use crate::disposal::{BinState, DeviceId, Item};
use crate::registry::DisposalId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeviceEvent {
    /// The bin moved between states.
    StateChanged {
        device: DeviceId,
        from: BinState,
        to: BinState,
    },
    /// One pump tick ran; carries the new charge pressure (kPa).
    ChargeChanged { device: DeviceId, pressure: f32 },
    /// Recharge finished and the intake flap closed.
    AirFlapClosed { device: DeviceId },
    ItemStored { device: DeviceId, item: Item },
    /// A thrown item bounced off the rim.
    DunkMissed { device: DeviceId, item: Item },
    ContentsEjected { device: DeviceId, count: usize },
    /// The payload left through the disposal network.
    Flushed {
        device: DeviceId,
        disposal: DisposalId,
        items: usize,
    },
    /// An entity tried to climb out mid-flush.
    EscapeFailed { device: DeviceId, entity: u64 },
}

/// Consumer of device events.
pub trait EventSink {
    fn emit(&mut self, event: DeviceEvent);
}

impl EventSink for Vec<DeviceEvent> {
    fn emit(&mut self, event: DeviceEvent) {
        self.push(event);
    }
}

/// Buffered events, drained by the presentation layer once per frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<DeviceEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[DeviceEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<DeviceEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: DeviceEvent) {
        self.events.push(event);
    }
}
