//! Timer scheduling between the core and its host.
//!
//! Device controllers never sleep or spawn; they ask a [`Scheduler`] for a
//! timer and receive the expiry later through their `on_timer` entry point.
//! The host contract:
//!
//! - expiries are delivered no earlier than their delay, in due order;
//! - a cancelled timer is never delivered;
//! - all deliveries for one device happen on the simulation thread, between
//!   ticks, never concurrently.
//!
//! [`TimerQueue`] is the reference implementation used by
//! [`crate::station::Station`].

use serde::{Deserialize, Serialize};

use crate::disposal::DeviceId;

/// Opaque handle identifying one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// What a device timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Delayed automatic flush after an item lands in the bin.
    AutoFlush,
    /// End of the flush sequence.
    FlushComplete,
}

/// A timer addressed to one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timer {
    pub device: DeviceId,
    pub kind: TimerKind,
}

/// Host-side timer service the core requests delays from.
pub trait Scheduler {
    /// Arrange for `timer` to be delivered after `delay` seconds.
    fn schedule_timer(&mut self, delay: f32, timer: Timer) -> TimerHandle;
    /// Prevent a pending timer from firing. Unknown handles are ignored.
    fn cancel_timer(&mut self, handle: TimerHandle);
}

/// A timer waiting in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingTimer {
    pub handle: TimerHandle,
    /// Absolute due time in seconds.
    pub due: f64,
    pub timer: Timer,
}

/// Clock-driven timer queue. Ties on due time resolve in scheduling order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimerQueue {
    now: f64,
    next_handle: u64,
    pending: Vec<PendingTimer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock in seconds.
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Move the clock forward. The clock never runs backwards.
    pub fn advance(&mut self, seconds: f32) {
        if seconds.is_finite() && seconds > 0.0 {
            self.now += seconds as f64;
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    /// Remove and return the earliest timer due at the current clock.
    ///
    /// Delivered one at a time so that timers scheduled by a delivery
    /// (with zero delay) are still seen in order within the same tick.
    pub fn pop_due(&mut self) -> Option<PendingTimer> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= self.now)
            .min_by(|(_, a), (_, b)| {
                a.due
                    .total_cmp(&b.due)
                    .then_with(|| a.handle.cmp(&b.handle))
            })
            .map(|(i, _)| i)?;
        Some(self.pending.remove(idx))
    }

    /// Drop every pending timer addressed to `device`.
    pub fn cancel_device(&mut self, device: DeviceId) {
        self.pending.retain(|p| p.timer.device != device);
    }
}

impl Scheduler for TimerQueue {
    fn schedule_timer(&mut self, delay: f32, timer: Timer) -> TimerHandle {
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.pending.push(PendingTimer {
            handle,
            due: self.now + delay as f64,
            timer,
        });
        log::trace!(
            "scheduled {:?} for device {:?} in {:.2}s",
            timer.kind,
            timer.device,
            delay
        );
        handle
    }

    fn cancel_timer(&mut self, handle: TimerHandle) {
        self.pending.retain(|p| p.handle != handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(device: u32, kind: TimerKind) -> Timer {
        Timer {
            device: DeviceId(device),
            kind,
        }
    }

    #[test]
    fn test_timer_not_delivered_early() {
        let mut q = TimerQueue::new();
        q.schedule_timer(2.0, timer(1, TimerKind::AutoFlush));
        q.advance(1.0);
        assert!(q.pop_due().is_none());
        q.advance(1.0);
        let fired = q.pop_due().unwrap();
        assert_eq!(fired.timer.kind, TimerKind::AutoFlush);
        assert!(q.is_empty());
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let h = q.schedule_timer(1.0, timer(1, TimerKind::AutoFlush));
        assert!(q.is_pending(h));
        q.cancel_timer(h);
        q.advance(5.0);
        assert!(q.pop_due().is_none());
    }

    #[test]
    fn test_due_order_with_ties() {
        let mut q = TimerQueue::new();
        q.schedule_timer(2.0, timer(1, TimerKind::AutoFlush));
        q.schedule_timer(1.0, timer(2, TimerKind::FlushComplete));
        q.schedule_timer(1.0, timer(3, TimerKind::AutoFlush));
        q.advance(3.0);

        let order: Vec<u32> = std::iter::from_fn(|| q.pop_due())
            .map(|p| p.timer.device.0)
            .collect();
        assert_eq!(order, vec![2, 3, 1]);
    }

    #[test]
    fn test_cancel_device() {
        let mut q = TimerQueue::new();
        q.schedule_timer(1.0, timer(1, TimerKind::AutoFlush));
        q.schedule_timer(1.0, timer(2, TimerKind::AutoFlush));
        q.cancel_device(DeviceId(1));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_clock_never_runs_backwards() {
        let mut q = TimerQueue::new();
        q.advance(1.5);
        q.advance(-4.0);
        q.advance(f32::NAN);
        assert_eq!(q.now(), 1.5);
    }
}
