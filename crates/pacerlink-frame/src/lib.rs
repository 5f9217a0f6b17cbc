//! Framed packet codec and stream parser for the host/MCU serial link.
//!
//! This is the core value-add layer of pacerlink. Every message is framed with:
//! - A 1-byte SYNC marker identifying the direction (`0xA5` host to MCU, `0x5A` MCU to host)
//! - A 1-byte kind tag from a closed set
//! - An optional 4-byte little-endian millisecond timestamp
//! - A 1-byte payload length (at most 100 bytes)
//! - A trailing CRC-8/OpenSafety over everything before it
//!
//! The [`StreamParser`] turns an arbitrary byte stream (read() chunks or a
//! circular DMA window) back into validated messages, resynchronizing on noise.

pub mod codec;
pub mod crc;
pub mod error;
pub mod kind;
pub mod parser;
pub mod payload;
pub mod reader;
pub mod ring;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use codec::{
    decode_exact, decode_frame, encode_frame, encode_to, frame_len, header_len, Decoded,
    FrameFormat, Message, MAX_FRAME_LEN, MAX_PAYLOAD, TIMESTAMP_LEN,
};
pub use crc::{crc8, Crc8};
pub use error::{FrameError, Result};
pub use kind::{Category, Direction, Kind, UnknownKind, HOST_SYNC, MCU_SYNC};
pub use parser::{ParseState, ParserStats, StreamParser};
pub use payload::{debug_text, ImuSample, MotorDuty};
pub use reader::{FrameReader, DEFAULT_READ_CHUNK};
pub use ring::RingCursor;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::LinkCodec;
