//! Byte-stream transport abstraction for the host/MCU serial link.
//!
//! Provides a unified interface over the ways bytes reach the protocol layer:
//! - A termios-configured serial device (Linux/macOS)
//! - An in-memory connected pair (tests, demos, loopback)
//! - A circular DMA receive window (the microcontroller's observable contract)
//!
//! This is the lowest layer of pacerlink. Everything else builds on top of
//! the [`Transport`] trait and the [`DmaRing`] contract provided here.

pub mod dma;
pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use dma::{DmaRing, DmaSignal, SimulatedDma};
pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use traits::Transport;

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort};
