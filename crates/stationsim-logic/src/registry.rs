//! Disposal network registry.
//!
//! Flushed payloads are handed to a [`DisposalRegistry`] that the host
//! owns and passes in explicitly. It records each packet leaving a bin
//! until the host's pipe network delivers it.

use serde::{Deserialize, Serialize};

use crate::disposal::{DeviceId, Item};
use crate::tiles::TilePos;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisposalId(pub u64);

/// A payload in transit through the disposal pipes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisposalPacket {
    pub id: DisposalId,
    pub source: DeviceId,
    pub origin: TilePos,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisposalRegistry {
    next_id: u64,
    in_transit: Vec<DisposalPacket>,
}

impl DisposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new packet leaving `source`. Empty flushes still get an
    /// id; the bin flushes air even with nothing inside.
    pub fn new_disposal(&mut self, source: DeviceId, origin: TilePos, items: Vec<Item>) -> DisposalId {
        let id = DisposalId(self.next_id);
        self.next_id += 1;
        log::info!(
            "disposal {:?} from bin {:?} carrying {} item(s)",
            id,
            source,
            items.len()
        );
        self.in_transit.push(DisposalPacket {
            id,
            source,
            origin,
            items,
        });
        id
    }

    pub fn in_transit(&self) -> &[DisposalPacket] {
        &self.in_transit
    }

    /// Hand a packet to its destination, removing it from the registry.
    pub fn deliver(&mut self, id: DisposalId) -> Option<DisposalPacket> {
        let idx = self.in_transit.iter().position(|p| p.id == id)?;
        Some(self.in_transit.remove(idx))
    }

    /// Hand over every packet still in transit.
    pub fn deliver_all(&mut self) -> Vec<DisposalPacket> {
        std::mem::take(&mut self.in_transit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_deliverable() {
        let mut reg = DisposalRegistry::new();
        let a = reg.new_disposal(DeviceId(1), TilePos::new(0, 0), vec![Item::object(7, "crate")]);
        let b = reg.new_disposal(DeviceId(1), TilePos::new(0, 0), Vec::new());
        assert_ne!(a, b);
        assert_eq!(reg.in_transit().len(), 2);

        let packet = reg.deliver(a).unwrap();
        assert_eq!(packet.items.len(), 1);
        assert!(reg.deliver(a).is_none());
        assert_eq!(reg.in_transit().len(), 1);
    }
}
