use std::collections::VecDeque;
use std::time::{Duration, Instant};

use pacerlink_transport::Transport;

use crate::codec::{FrameFormat, Message};
use crate::error::Result;
use crate::kind::Direction;
use crate::parser::{ParserStats, StreamParser};

/// Bytes requested from the transport per read.
pub const DEFAULT_READ_CHUNK: usize = 100;

/// Reads complete messages from a [`Transport`].
///
/// Handles partial frames and line noise internally; callers only ever see
/// validated messages.
pub struct FrameReader<T> {
    inner: T,
    parser: StreamParser,
    pending: VecDeque<Message>,
    chunk: Vec<u8>,
}

impl<T: Transport> FrameReader<T> {
    /// Reader for frames travelling in `expected` direction.
    pub fn new(inner: T, expected: Direction, format: FrameFormat) -> Self {
        Self {
            inner,
            parser: StreamParser::new(expected, format),
            pending: VecDeque::new(),
            chunk: vec![0u8; DEFAULT_READ_CHUNK],
        }
    }

    /// Use reads of `len` bytes (at least one).
    pub fn with_chunk_len(mut self, len: usize) -> Self {
        self.chunk = vec![0u8; len.max(1)];
        self
    }

    /// Perform one read and hand every completed message to `emit`.
    ///
    /// Messages buffered by an earlier [`read_message`](Self::read_message)
    /// are delivered first. A read timeout is not an error and yields `Ok(0)`.
    pub fn poll_messages<F>(&mut self, emit: &mut F) -> Result<usize>
    where
        F: FnMut(Message),
    {
        let mut delivered = 0;
        while let Some(message) = self.pending.pop_front() {
            emit(message);
            delivered += 1;
        }

        let read = match self.inner.read(&mut self.chunk) {
            Ok(n) => n,
            Err(err) if err.is_transient() => 0,
            Err(err) => return Err(err.into()),
        };
        if read > 0 {
            delivered += self.parser.feed(&self.chunk[..read], emit);
        }
        Ok(delivered)
    }

    /// Return the next message, performing at most one read.
    ///
    /// Returns `Ok(None)` if the read timed out before a frame completed.
    pub fn read_message(&mut self) -> Result<Option<Message>> {
        if let Some(message) = self.pending.pop_front() {
            return Ok(Some(message));
        }
        let mut ready = VecDeque::new();
        self.poll_messages(&mut |message| ready.push_back(message))?;
        self.pending.append(&mut ready);
        Ok(self.pending.pop_front())
    }

    /// Keep reading until a message completes or `timeout` elapses.
    pub fn read_message_timeout(&mut self, timeout: Duration) -> Result<Option<Message>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(message) = self.read_message()? {
                return Ok(Some(message));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    /// Parser state and counters.
    pub fn parser(&self) -> &StreamParser {
        &self.parser
    }

    /// Mutably borrow the parser.
    pub fn parser_mut(&mut self) -> &mut StreamParser {
        &mut self.parser
    }

    pub fn stats(&self) -> ParserStats {
        self.parser.stats()
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for FrameReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("parser", &self.parser)
            .field("pending", &self.pending.len())
            .field("chunk_len", &self.chunk.len())
            .finish()
    }
}
