//! Observable contract of a circular DMA receive buffer.
//!
//! On the microcontroller a DMA engine writes incoming UART bytes into a
//! fixed ring and counts its remaining-transfer register down; it reloads at
//! zero, so the write index advances monotonically and wraps at the ring
//! size. Interrupts (line idle, half/full transfer) announce progress, but a
//! consumer must also be able to poll the register if an interrupt is lost.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tracing::trace;

/// Read-side view of a DMA-filled ring buffer.
pub trait DmaRing: Send + Sync {
    /// Ring size in bytes.
    fn capacity(&self) -> usize;

    /// Current value of the remaining-count register (`1..=capacity`).
    fn remaining(&self) -> usize;

    /// Byte stored at `index` (`index < capacity`).
    fn byte_at(&self, index: usize) -> u8;

    /// Next position the engine will write, derived from the remaining count.
    fn write_index(&self) -> usize {
        let capacity = self.capacity();
        (capacity - self.remaining().min(capacity)) % capacity
    }

    /// Interrupt notification, if the ring raises one.
    fn signal(&self) -> Option<&DmaSignal> {
        None
    }
}

#[derive(Debug, Default)]
struct SignalState {
    pending: bool,
    write_index: usize,
}

/// Notification posted from interrupt context to the receive task.
///
/// The interrupt side only records the write index and wakes the waiter; no
/// parsing happens in interrupt context.
#[derive(Debug, Default)]
pub struct DmaSignal {
    state: Mutex<SignalState>,
    ready: Condvar,
}

impl DmaSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new write index and wake the receive task.
    pub fn post(&self, write_index: usize) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.pending = true;
        state.write_index = write_index;
        drop(state);
        self.ready.notify_all();
    }

    /// Wait up to `timeout` for a posted write index.
    ///
    /// Returns `None` on timeout; the caller should then poll the ring's
    /// remaining-count register directly.
    pub fn wait(&self, timeout: Duration) -> Option<usize> {
        let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let (mut state, _) = self
            .ready
            .wait_timeout_while(state, timeout, |s| !s.pending)
            .unwrap_or_else(|p| p.into_inner());
        if !state.pending {
            return None;
        }
        state.pending = false;
        Some(state.write_index)
    }
}

/// Host-side stand-in for the UART DMA engine.
///
/// `receive` plays the hardware: it stores bytes at the write position,
/// counts the remaining register down (reloading at zero) and posts the
/// idle-line interrupt unless interrupts are suppressed.
pub struct SimulatedDma {
    ring: Box<[AtomicU8]>,
    remaining: AtomicUsize,
    interrupts: AtomicBool,
    signal: DmaSignal,
}

impl SimulatedDma {
    /// Create a ring of `capacity` bytes (`capacity > 0`).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let ring = (0..capacity).map(|_| AtomicU8::new(0)).collect();
        Self {
            ring,
            remaining: AtomicUsize::new(capacity),
            interrupts: AtomicBool::new(true),
            signal: DmaSignal::new(),
        }
    }

    /// The interrupt notification for this engine.
    pub fn interrupt(&self) -> &DmaSignal {
        &self.signal
    }

    /// Enable or suppress the idle-line interrupt.
    pub fn set_interrupts(&self, enabled: bool) {
        self.interrupts.store(enabled, Ordering::SeqCst);
    }

    /// Receive a burst of bytes followed by an idle line.
    pub fn receive(&self, bytes: &[u8]) {
        let capacity = self.ring.len();
        for &byte in bytes {
            let remaining = self.remaining.load(Ordering::Acquire);
            let index = capacity - remaining;
            self.ring[index].store(byte, Ordering::Relaxed);
            let next = if remaining == 1 { capacity } else { remaining - 1 };
            self.remaining.store(next, Ordering::Release);
        }
        trace!(len = bytes.len(), write_index = self.write_index(), "dma burst");
        if self.interrupts.load(Ordering::SeqCst) {
            self.signal.post(self.write_index());
        }
    }
}

impl DmaRing for SimulatedDma {
    fn capacity(&self) -> usize {
        self.ring.len()
    }

    fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    fn byte_at(&self, index: usize) -> u8 {
        self.ring[index % self.ring.len()].load(Ordering::Relaxed)
    }

    fn signal(&self) -> Option<&DmaSignal> {
        Some(&self.signal)
    }
}

impl<T: DmaRing + ?Sized> DmaRing for std::sync::Arc<T> {
    fn capacity(&self) -> usize {
        (**self).capacity()
    }

    fn remaining(&self) -> usize {
        (**self).remaining()
    }

    fn byte_at(&self, index: usize) -> u8 {
        (**self).byte_at(index)
    }

    fn signal(&self) -> Option<&DmaSignal> {
        (**self).signal()
    }
}

impl std::fmt::Debug for SimulatedDma {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedDma")
            .field("capacity", &self.ring.len())
            .field("remaining", &self.remaining())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_index_tracks_remaining_register() {
        let dma = SimulatedDma::new(8);
        assert_eq!(dma.write_index(), 0);
        dma.receive(&[1, 2, 3]);
        assert_eq!(dma.remaining(), 5);
        assert_eq!(dma.write_index(), 3);
        assert_eq!(dma.byte_at(2), 3);
    }

    #[test]
    fn write_index_wraps_at_capacity() {
        let dma = SimulatedDma::new(4);
        dma.receive(&[1, 2, 3, 4]);
        assert_eq!(dma.remaining(), 4);
        assert_eq!(dma.write_index(), 0);
        dma.receive(&[5, 6]);
        assert_eq!(dma.write_index(), 2);
        assert_eq!(dma.byte_at(0), 5);
        assert_eq!(dma.byte_at(3), 4);
    }

    #[test]
    fn receive_posts_interrupt() {
        let dma = SimulatedDma::new(16);
        dma.receive(&[9, 9]);
        assert_eq!(dma.interrupt().wait(Duration::from_millis(10)), Some(2));
        assert_eq!(dma.interrupt().wait(Duration::from_millis(10)), None);
    }

    #[test]
    fn suppressed_interrupt_leaves_register_pollable() {
        let dma = SimulatedDma::new(16);
        dma.set_interrupts(false);
        dma.receive(&[1, 2, 3, 4, 5]);
        assert_eq!(dma.interrupt().wait(Duration::from_millis(10)), None);
        assert_eq!(dma.write_index(), 5);
    }
}
