use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Default read timeout for in-memory ends.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

#[derive(Default)]
struct Pipe {
    bytes: Mutex<VecDeque<u8>>,
    readable: Condvar,
}

impl Pipe {
    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        self.bytes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One end of an in-memory, full-speed serial link.
///
/// Created in connected pairs by [`MemoryTransport::pair`]. Bytes written on
/// one end become readable on the other. Reads block for at most the
/// configured read timeout and return `Ok(0)` when nothing arrived, like a
/// serial port opened with `VMIN=0`.
pub struct MemoryTransport {
    rx: Arc<Pipe>,
    tx: Arc<Pipe>,
    open: AtomicBool,
    broken: AtomicBool,
    read_timeout: Duration,
}

impl MemoryTransport {
    /// Create two connected ends, both closed.
    pub fn pair() -> (Self, Self) {
        Self::pair_with_timeout(DEFAULT_READ_TIMEOUT)
    }

    /// Create two connected ends with an explicit read timeout.
    pub fn pair_with_timeout(read_timeout: Duration) -> (Self, Self) {
        let a_to_b = Arc::new(Pipe::default());
        let b_to_a = Arc::new(Pipe::default());
        let a = Self {
            rx: Arc::clone(&b_to_a),
            tx: Arc::clone(&a_to_b),
            open: AtomicBool::new(false),
            broken: AtomicBool::new(false),
            read_timeout,
        };
        let b = Self {
            rx: a_to_b,
            tx: b_to_a,
            open: AtomicBool::new(false),
            broken: AtomicBool::new(false),
            read_timeout,
        };
        (a, b)
    }

    /// Place raw bytes in this end's receive buffer as if they came off the wire.
    pub fn inject(&self, bytes: &[u8]) {
        let mut rx = self.rx.lock();
        rx.extend(bytes.iter().copied());
        drop(rx);
        self.rx.readable.notify_all();
    }

    /// Make every subsequent read and write fail, simulating a dead device.
    pub fn break_link(&self) {
        debug!("memory transport link broken");
        self.broken.store(true, Ordering::SeqCst);
        self.rx.readable.notify_all();
    }

    /// Number of bytes waiting to be read on this end.
    pub fn pending(&self) -> usize {
        self.rx.lock().len()
    }

    fn check_usable(&self) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "link broken",
            )));
        }
        if !self.open.load(Ordering::SeqCst) {
            return Err(TransportError::NotOpen);
        }
        Ok(())
    }
}

impl Transport for MemoryTransport {
    fn open(&self) -> Result<()> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        self.rx.readable.notify_all();
        Ok(())
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.check_usable()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut rx = self.rx.lock();
        while rx.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                return Ok(0);
            }
            let (guard, _) = self
                .rx
                .readable
                .wait_timeout(rx, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            rx = guard;
            self.check_usable()?;
        }

        let n = rx.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        self.check_usable()?;
        let mut tx = self.tx.lock();
        tx.extend(buf.iter().copied());
        drop(tx);
        self.tx.readable.notify_all();
        Ok(buf.len())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("open", &self.is_open())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
