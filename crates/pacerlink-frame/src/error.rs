use crate::kind::Kind;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame format forbids zero-length payloads.
    #[error("empty payload not allowed by frame format")]
    EmptyPayload,

    /// The destination buffer cannot hold the encoded frame.
    #[error("buffer too small ({available} bytes, need {needed})")]
    BufferTooSmall { needed: usize, available: usize },

    /// Fewer bytes than the smallest possible frame.
    #[error("truncated frame ({len} bytes, min {min})")]
    Truncated { len: usize, min: usize },

    /// The first byte is neither SYNC value.
    #[error("invalid sync byte 0x{0:02X}")]
    BadSync(u8),

    /// The kind tag is outside the known set.
    #[error("invalid kind tag 0x{0:02X}")]
    BadKind(u8),

    /// The declared length is illegal or overruns the supplied bytes.
    #[error("invalid length {declared} ({available} payload bytes available)")]
    BadLength { declared: usize, available: usize },

    /// The trailing CRC-8 does not match the frame contents.
    #[error("checksum mismatch (computed 0x{expected:02X}, frame carries 0x{actual:02X})")]
    BadChecksum { expected: u8, actual: u8 },

    /// A typed payload view was requested on a payload of the wrong shape.
    #[error("{kind} payload must be {expected} bytes, got {actual}")]
    UnexpectedPayload {
        kind: Kind,
        expected: usize,
        actual: usize,
    },

    /// The transport accepted zero bytes of a frame.
    #[error("link closed (transport accepted no bytes)")]
    LinkClosed,

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] pacerlink_transport::TransportError),

    /// An I/O error surfaced through a stream adapter.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
