use bytes::{BufMut, Bytes, BytesMut};

use crate::crc::{crc8, Crc8};
use crate::error::{FrameError, Result};
use crate::kind::{Category, Direction, Kind};

/// Largest payload a frame can carry.
pub const MAX_PAYLOAD: usize = 100;

/// Size of the optional timestamp field.
pub const TIMESTAMP_LEN: usize = 4;

/// Largest encoded frame: sync + kind + timestamp + length + payload + crc.
pub const MAX_FRAME_LEN: usize = 1 + 1 + TIMESTAMP_LEN + 1 + MAX_PAYLOAD + 1;

/// Optional parts of the frame layout. Both ends of a link must agree.
///
/// The default carries no timestamp and forbids zero-length payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFormat {
    /// Insert a 4-byte little-endian millisecond timestamp after KIND.
    pub timestamp: bool,
    /// Accept `LENGTH = 0`.
    pub allow_empty: bool,
}

impl FrameFormat {
    /// Frame format carrying a timestamp.
    pub const fn timestamped() -> Self {
        Self {
            timestamp: true,
            allow_empty: false,
        }
    }

    /// Bytes before the payload, up to and including LENGTH.
    pub const fn header_len(self) -> usize {
        if self.timestamp {
            3 + TIMESTAMP_LEN
        } else {
            3
        }
    }

    /// Encoded size of a frame with `payload_len` payload bytes.
    pub const fn frame_len(self, payload_len: usize) -> usize {
        self.header_len() + payload_len + 1
    }

    /// Size of the shortest legal frame.
    pub const fn min_frame_len(self) -> usize {
        if self.allow_empty {
            self.frame_len(0)
        } else {
            self.frame_len(1)
        }
    }

    /// Whether a LENGTH byte is legal under this format.
    pub const fn accepts_length(self, len: usize) -> bool {
        len <= MAX_PAYLOAD && (len > 0 || self.allow_empty)
    }
}

/// Bytes before the payload for `format`.
pub const fn header_len(format: FrameFormat) -> usize {
    format.header_len()
}

/// Encoded size of a frame with `payload_len` payload bytes.
pub const fn frame_len(payload_len: usize, format: FrameFormat) -> usize {
    format.frame_len(payload_len)
}

/// A typed packet.
///
/// Immutable after construction; the payload never exceeds [`MAX_PAYLOAD`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    kind: Kind,
    payload: Bytes,
    timestamp: Option<u32>,
}

impl Message {
    /// Create a message, rejecting payloads over [`MAX_PAYLOAD`].
    pub fn new(kind: Kind, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD,
            });
        }
        Ok(Self {
            kind,
            payload,
            timestamp: None,
        })
    }

    /// Caller guarantees `payload.len() <= MAX_PAYLOAD`.
    pub(crate) fn bounded(kind: Kind, payload: Bytes) -> Self {
        debug_assert!(payload.len() <= MAX_PAYLOAD);
        Self {
            kind,
            payload,
            timestamp: None,
        }
    }

    /// The same message stamped with `millis`.
    pub fn with_timestamp(mut self, millis: u32) -> Self {
        self.timestamp = Some(millis);
        self
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn payload_bytes(&self) -> &Bytes {
        &self.payload
    }

    pub fn timestamp(&self) -> Option<u32> {
        self.timestamp
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Event category this message raises on the receiving side.
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// The payload as UTF-8, if it is valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Encoded size of this message under `format`.
    pub fn wire_size(&self, format: FrameFormat) -> usize {
        format.frame_len(self.payload.len())
    }
}

/// A frame recovered by [`decode_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// Direction announced by the SYNC byte.
    pub direction: Direction,
    pub message: Message,
    /// Bytes of `src` the frame occupied.
    pub frame_len: usize,
}

/// Encode a frame into `dst`, returning the number of bytes written.
///
/// Wire format:
/// ```text
/// ┌──────┬──────┬──────────────────┬────────┬─────────────┬──────┐
/// │ SYNC │ KIND │ TIMESTAMP (4B LE)│ LENGTH │ PAYLOAD     │ CRC8 │
/// │ (1B) │ (1B) │ optional         │ (1B)   │ LENGTH bytes│ (1B) │
/// └──────┴──────┴──────────────────┴────────┴─────────────┴──────┘
/// ```
///
/// `dst` is left untouched on error. A message without a timestamp is
/// encoded with `0` when the format carries one.
pub fn encode_frame(
    direction: Direction,
    message: &Message,
    format: FrameFormat,
    dst: &mut [u8],
) -> Result<usize> {
    let len = message.len();
    if len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD,
        });
    }
    if !format.accepts_length(len) {
        return Err(FrameError::EmptyPayload);
    }
    let total = format.frame_len(len);
    if dst.len() < total {
        return Err(FrameError::BufferTooSmall {
            needed: total,
            available: dst.len(),
        });
    }

    dst[0] = direction.sync();
    dst[1] = message.kind().tag();
    let mut at = 2;
    if format.timestamp {
        let stamp = message.timestamp().unwrap_or(0);
        dst[at..at + TIMESTAMP_LEN].copy_from_slice(&stamp.to_le_bytes());
        at += TIMESTAMP_LEN;
    }
    dst[at] = len as u8;
    at += 1;
    dst[at..at + len].copy_from_slice(message.payload());
    at += len;
    dst[at] = crc8(&dst[..at]);

    Ok(total)
}

/// Encode a frame and append it to `dst`.
pub fn encode_to(
    direction: Direction,
    message: &Message,
    format: FrameFormat,
    dst: &mut BytesMut,
) -> Result<usize> {
    let mut frame = [0u8; MAX_FRAME_LEN];
    let written = encode_frame(direction, message, format, &mut frame)?;
    dst.reserve(written);
    dst.put_slice(&frame[..written]);
    Ok(written)
}

/// Decode the frame at the start of `src`.
///
/// Bytes after the frame are ignored; [`Decoded::frame_len`] says where it
/// ended. Checks run in wire order: size, sync, kind, length, checksum.
pub fn decode_frame(src: &[u8], format: FrameFormat) -> Result<Decoded> {
    let min = format.min_frame_len();
    if src.len() < min {
        return Err(FrameError::Truncated {
            len: src.len(),
            min,
        });
    }

    let direction = Direction::from_sync(src[0]).ok_or(FrameError::BadSync(src[0]))?;
    let kind = Kind::try_from(src[1])?;

    let header = format.header_len();
    let declared = src[header - 1] as usize;
    let available = src.len() - header - 1;
    if !format.accepts_length(declared) || declared > available {
        return Err(FrameError::BadLength {
            declared,
            available,
        });
    }

    let body_end = header + declared;
    let mut digest = Crc8::new();
    digest.update_slice(&src[..body_end]);
    let expected = digest.value();
    let actual = src[body_end];
    if expected != actual {
        return Err(FrameError::BadChecksum { expected, actual });
    }

    let payload = Bytes::copy_from_slice(&src[header..body_end]);
    let mut message = Message::new(kind, payload)?;
    if format.timestamp {
        let mut stamp = [0u8; TIMESTAMP_LEN];
        stamp.copy_from_slice(&src[2..2 + TIMESTAMP_LEN]);
        message = message.with_timestamp(u32::from_le_bytes(stamp));
    }

    Ok(Decoded {
        direction,
        message,
        frame_len: body_end + 1,
    })
}

/// Decode `src` as exactly one frame; trailing bytes are a length error.
pub fn decode_exact(src: &[u8], format: FrameFormat) -> Result<Decoded> {
    let decoded = decode_frame(src, format)?;
    if decoded.frame_len != src.len() {
        return Err(FrameError::BadLength {
            declared: decoded.message.len(),
            available: src.len() - format.header_len() - 1,
        });
    }
    Ok(decoded)
}
