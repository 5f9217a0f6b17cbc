use std::sync::Arc;

use crate::error::Result;

/// A half-duplex byte stream shared by the receive and send workers.
///
/// All methods take `&self`: one handle is lent to both workers at once, so
/// implementations synchronize internally. `read` must return within a
/// bounded time (the implementation's read timeout) so that a worker can
/// observe cancellation between calls.
pub trait Transport: Send + Sync {
    /// Open and configure the underlying device.
    fn open(&self) -> Result<()>;

    /// Close the device. Closing an already closed transport is a no-op.
    fn close(&self) -> Result<()>;

    /// Read up to `buf.len()` bytes.
    ///
    /// Returns `Ok(0)` when the read timeout elapsed with no data.
    fn read(&self, buf: &mut [u8]) -> Result<usize>;

    /// Write some prefix of `buf`, returning how many bytes were accepted.
    fn write(&self, buf: &[u8]) -> Result<usize>;

    /// Whether the transport is currently open.
    fn is_open(&self) -> bool;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn open(&self) -> Result<()> {
        (**self).open()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn open(&self) -> Result<()> {
        (**self).open()
    }

    fn close(&self) -> Result<()> {
        (**self).close()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
