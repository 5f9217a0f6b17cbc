use std::io::ErrorKind;

use pacerlink_transport::{Transport, TransportError};

use crate::codec::{encode_frame, FrameFormat, Message, MAX_FRAME_LEN};
use crate::error::{FrameError, Result};
use crate::kind::Direction;

/// Writes complete frames to a [`Transport`].
pub struct FrameWriter<T> {
    inner: T,
    direction: Direction,
    format: FrameFormat,
    buf: [u8; MAX_FRAME_LEN],
}

impl<T: Transport> FrameWriter<T> {
    /// Writer stamping frames with the SYNC byte of `direction`.
    pub fn new(inner: T, direction: Direction, format: FrameFormat) -> Self {
        Self {
            inner,
            direction,
            format,
            buf: [0u8; MAX_FRAME_LEN],
        }
    }

    /// Encode and send one message (blocking).
    ///
    /// Returns the number of bytes put on the wire.
    pub fn write_message(&mut self, message: &Message) -> Result<usize> {
        let len = encode_frame(self.direction, message, self.format, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < len {
            match self.inner.write(&self.buf[offset..len]) {
                Ok(0) => return Err(FrameError::LinkClosed),
                Ok(n) => offset += n,
                Err(TransportError::Io(err)) if err.kind() == ErrorKind::Interrupted => continue,
                Err(TransportError::Io(err)) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(err.into()),
            }
        }
        Ok(len)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for FrameWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("direction", &self.direction)
            .field("format", &self.format)
            .finish()
    }
}
