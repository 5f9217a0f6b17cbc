//! Host/MCU serial link for the PacerBot robot.
//!
//! pacerlink carries small typed messages between the host computer and the
//! motor-control microcontroller over a UART, framed with a SYNC byte and a
//! CRC-8/OpenSafety trailer.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte transports (serial device, in-memory pair, DMA ring)
//! - [`frame`]: Packet codec, resynchronizing stream parser, reader/writer
//! - [`channel`]: Send/receive workers, bounded queues and event notification

/// Re-export transport types.
pub mod transport {
    pub use pacerlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use pacerlink_frame::*;
}

/// Re-export channel types.
pub mod channel {
    pub use pacerlink_channel::*;
}
