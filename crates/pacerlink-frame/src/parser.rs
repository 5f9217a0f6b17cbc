//! Byte-at-a-time frame recovery.
//!
//! The parser accepts one byte at a time and validates each field as it
//! arrives. A header rejected on its kind or length byte is abandoned, and
//! the bytes after its SYNC byte are run through the machine again, so a
//! spurious SYNC in line noise cannot swallow a real frame that began inside
//! the abandoned prefix. A frame that fails its checksum is discarded whole;
//! its payload is never rescanned for a SYNC byte.

use bytes::Bytes;
use tracing::{debug, trace};

use crate::codec::{FrameFormat, Message, MAX_FRAME_LEN, TIMESTAMP_LEN};
use crate::crc::Crc8;
use crate::kind::{Direction, Kind};

/// Field the parser expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    Sync,
    Kind,
    Timestamp,
    Length,
    Payload,
    Checksum,
}

/// Counters kept by a [`StreamParser`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Frames that passed the checksum.
    pub frames: u64,
    /// Bytes discarded while hunting for SYNC.
    pub noise_bytes: u64,
    pub bad_kind: u64,
    pub bad_length: u64,
    pub bad_checksum: u64,
}

impl ParserStats {
    /// Every rejection, of any cause.
    pub fn rejected(&self) -> u64 {
        self.noise_bytes + self.bad_kind + self.bad_length + self.bad_checksum
    }
}

enum Step {
    Pending,
    Complete,
    /// Header field rejected; replay the bytes after SYNC.
    Rejected,
    /// Checksum failed; drop the whole frame.
    Discarded,
}

/// Incremental parser for frames travelling in one direction.
///
/// Holds one frame-sized buffer and no heap state. Owned by a single
/// receive worker.
pub struct StreamParser {
    expected: Direction,
    format: FrameFormat,
    state: ParseState,
    buf: [u8; MAX_FRAME_LEN],
    cursor: usize,
    declared: usize,
    crc: Crc8,
    stats: ParserStats,
}

impl StreamParser {
    /// Parser accepting frames whose SYNC byte announces `expected`.
    pub fn new(expected: Direction, format: FrameFormat) -> Self {
        Self {
            expected,
            format,
            state: ParseState::Sync,
            buf: [0u8; MAX_FRAME_LEN],
            cursor: 0,
            declared: 0,
            crc: Crc8::new(),
            stats: ParserStats::default(),
        }
    }

    pub fn expected(&self) -> Direction {
        self.expected
    }

    pub fn format(&self) -> FrameFormat {
        self.format
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn stats(&self) -> ParserStats {
        self.stats
    }

    /// Abandon any partial frame. Statistics are kept.
    pub fn reset(&mut self) {
        self.state = ParseState::Sync;
        self.cursor = 0;
        self.declared = 0;
        self.crc = Crc8::new();
    }

    /// Run one byte through the parser, calling `emit` for each completed
    /// frame. Returns the number of messages emitted.
    pub fn push<F>(&mut self, byte: u8, emit: &mut F) -> usize
    where
        F: FnMut(Message),
    {
        // Bytes awaiting processing, next byte on top. Buffered plus pending
        // bytes never exceed one frame, so the stack cannot overflow.
        let mut pending = [0u8; MAX_FRAME_LEN];
        pending[0] = byte;
        let mut depth = 1;
        let mut emitted = 0;

        while depth > 0 {
            depth -= 1;
            let byte = pending[depth];
            match self.step(byte) {
                Step::Pending => {}
                Step::Complete => {
                    if let Some(message) = self.finish() {
                        self.stats.frames += 1;
                        trace!(kind = %message.kind(), len = message.len(), "frame");
                        emit(message);
                        emitted += 1;
                    }
                    self.reset();
                }
                Step::Rejected => {
                    let buffered = self.cursor;
                    if buffered > 0 {
                        pending[depth] = byte;
                        depth += 1;
                        for i in (1..buffered).rev() {
                            pending[depth] = self.buf[i];
                            depth += 1;
                        }
                    }
                    self.reset();
                }
                Step::Discarded => self.reset(),
            }
        }

        emitted
    }

    /// Run a chunk through the parser. Returns the number of messages emitted.
    pub fn feed<F>(&mut self, bytes: &[u8], emit: &mut F) -> usize
    where
        F: FnMut(Message),
    {
        bytes.iter().map(|&byte| self.push(byte, emit)).sum()
    }

    /// Feed `bytes` and return the completed messages.
    pub fn collect(&mut self, bytes: &[u8]) -> Vec<Message> {
        let mut out = Vec::new();
        self.feed(bytes, &mut |message| out.push(message));
        out
    }

    fn store(&mut self, byte: u8) {
        self.buf[self.cursor] = byte;
        self.cursor += 1;
        self.crc.update(byte);
    }

    fn step(&mut self, byte: u8) -> Step {
        match self.state {
            ParseState::Sync => {
                if byte != self.expected.sync() {
                    self.stats.noise_bytes += 1;
                    return Step::Rejected;
                }
                self.store(byte);
                self.state = ParseState::Kind;
            }
            ParseState::Kind => {
                if Kind::from_tag(byte).is_none() {
                    self.stats.bad_kind += 1;
                    return Step::Rejected;
                }
                self.store(byte);
                self.state = if self.format.timestamp {
                    ParseState::Timestamp
                } else {
                    ParseState::Length
                };
            }
            ParseState::Timestamp => {
                self.store(byte);
                if self.cursor == 2 + TIMESTAMP_LEN {
                    self.state = ParseState::Length;
                }
            }
            ParseState::Length => {
                let declared = byte as usize;
                if !self.format.accepts_length(declared) {
                    self.stats.bad_length += 1;
                    return Step::Rejected;
                }
                self.store(byte);
                self.declared = declared;
                self.state = if declared == 0 {
                    ParseState::Checksum
                } else {
                    ParseState::Payload
                };
            }
            ParseState::Payload => {
                self.store(byte);
                if self.cursor == self.format.header_len() + self.declared {
                    self.state = ParseState::Checksum;
                }
            }
            ParseState::Checksum => {
                let expected = self.crc.value();
                if byte != expected {
                    self.stats.bad_checksum += 1;
                    debug!(
                        expected = format_args!("0x{expected:02X}"),
                        actual = format_args!("0x{byte:02X}"),
                        kind = self.buf[1],
                        len = self.declared,
                        "checksum mismatch, frame discarded"
                    );
                    return Step::Discarded;
                }
                return Step::Complete;
            }
        }
        Step::Pending
    }

    fn finish(&self) -> Option<Message> {
        let kind = Kind::from_tag(self.buf[1])?;
        let header = self.format.header_len();
        let payload = Bytes::copy_from_slice(&self.buf[header..header + self.declared]);
        let message = Message::new(kind, payload).ok()?;
        if self.format.timestamp {
            let mut stamp = [0u8; TIMESTAMP_LEN];
            stamp.copy_from_slice(&self.buf[2..2 + TIMESTAMP_LEN]);
            Some(message.with_timestamp(u32::from_le_bytes(stamp)))
        } else {
            Some(message)
        }
    }
}

impl std::fmt::Debug for StreamParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamParser")
            .field("expected", &self.expected)
            .field("format", &self.format)
            .field("state", &self.state)
            .field("cursor", &self.cursor)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_frame;
    use crate::crc::crc8;
    use crate::kind::MCU_SYNC;

    fn frame(kind: Kind, payload: &[u8]) -> Vec<u8> {
        let msg = Message::new(kind, payload.to_vec()).unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = encode_frame(Direction::McuToHost, &msg, FrameFormat::default(), &mut buf).unwrap();
        buf[..n].to_vec()
    }

    fn parser() -> StreamParser {
        StreamParser::new(Direction::McuToHost, FrameFormat::default())
    }

    #[test]
    fn test_single_frame() {
        let mut p = parser();
        let out = p.collect(&frame(Kind::McuAck, &[1, 2, 3]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), Kind::McuAck);
        assert_eq!(out[0].payload(), &[1, 2, 3]);
        assert_eq!(p.state(), ParseState::Sync);
        assert_eq!(p.stats().frames, 1);
        assert_eq!(p.stats().rejected(), 0);
    }

    #[test]
    fn test_field_states() {
        let mut p = parser();
        let bytes = frame(Kind::McuAck, &[1, 2]);
        let mut sink = |_m: Message| {};
        p.push(bytes[0], &mut sink);
        assert_eq!(p.state(), ParseState::Kind);
        p.push(bytes[1], &mut sink);
        assert_eq!(p.state(), ParseState::Length);
        p.push(bytes[2], &mut sink);
        assert_eq!(p.state(), ParseState::Payload);
        p.push(bytes[3], &mut sink);
        p.push(bytes[4], &mut sink);
        assert_eq!(p.state(), ParseState::Checksum);
    }

    #[test]
    fn test_garbage_around_frames() {
        let mut stream = vec![0x00, 0xFF, 0x13, 0xA5];
        stream.extend(frame(Kind::TelemetryImu, &[7; 12]));
        stream.extend([0x42, 0x5B, 0x00]);
        stream.extend(frame(Kind::McuStatus, b"ok"));
        stream.extend([0xEE, 0xEE]);

        let mut p = parser();
        let out = p.collect(&stream);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].kind(), Kind::TelemetryImu);
        assert_eq!(out[1].payload(), b"ok");
        assert_eq!(p.stats().noise_bytes, 9);
    }

    #[test]
    fn test_sync_byte_in_noise_does_not_swallow_frame() {
        // A stray SYNC directly before a real frame: the real SYNC is rejected
        // as a kind tag and must be replayed.
        let mut stream = vec![MCU_SYNC];
        stream.extend(frame(Kind::McuAck, &[1, 2, 3]));

        let mut p = parser();
        let out = p.collect(&stream);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload(), &[1, 2, 3]);
        assert_eq!(p.stats().bad_kind, 1);
    }

    #[test]
    fn test_plausible_header_in_noise() {
        // A spurious header declares two payload bytes and swallows the start
        // of the next frame. Its checksum fails, the overlapped frame is lost
        // with it and the parser picks up again at the following frame.
        let overlapped = frame(Kind::McuAck, &[1, 2, 3]);
        let mut stream = vec![MCU_SYNC, 0x06, 0x02];
        stream.extend(&overlapped);
        stream.extend(frame(Kind::McuStatus, &[9]));

        let mut p = parser();
        let out = p.collect(&stream);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), Kind::McuStatus);
        assert_eq!(out[0].payload(), &[9]);
        assert_eq!(p.stats().bad_checksum, 1);
        // 01 02 03 and the CRC byte of the overlapped frame.
        assert_eq!(p.stats().noise_bytes, 4);
    }

    #[test]
    fn test_sync_inside_corrupted_payload_is_not_rescanned() {
        let host = |payload: &[u8]| {
            let msg = Message::new(Kind::MotorCommand, payload.to_vec()).unwrap();
            let mut buf = [0u8; MAX_FRAME_LEN];
            let n =
                encode_frame(Direction::HostToMcu, &msg, FrameFormat::default(), &mut buf).unwrap();
            buf[..n].to_vec()
        };
        let clean = host(&[0x12, 0x34, 0xA5, 0x08]);
        let mut corrupted = clean.clone();
        let last = corrupted.len() - 1;
        corrupted[last] = 0x09;
        assert_ne!(clean[last], 0x09);

        let mut p = StreamParser::new(Direction::HostToMcu, FrameFormat::default());
        let mut out = Vec::new();
        for &byte in &corrupted {
            p.push(byte, &mut |m| out.push(m));
        }
        assert!(out.is_empty());
        assert_eq!(p.state(), ParseState::Sync);
        assert_eq!(p.stats().bad_checksum, 1);

        for &byte in &clean {
            p.push(byte, &mut |m| out.push(m));
        }
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), Kind::MotorCommand);
        assert_eq!(out[0].payload(), &[0x12, 0x34, 0xA5, 0x08]);
        assert_eq!(p.state(), ParseState::Sync);
    }

    #[test]
    fn test_bad_length_rejected() {
        let mut stream = vec![MCU_SYNC, 0x01, 0x65, 0x00];
        stream.extend(frame(Kind::TelemetryBattery, &[0x10, 0x27]));

        let mut p = parser();
        let out = p.collect(&stream);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind(), Kind::TelemetryBattery);
        assert_eq!(p.stats().bad_length, 1);
    }

    #[test]
    fn test_zero_length_rejected_by_default() {
        let mut p = parser();
        let empty = [MCU_SYNC, 0x06, 0x00, crc8(&[MCU_SYNC, 0x06, 0x00])];
        assert!(p.collect(&empty).is_empty());
        assert_eq!(p.stats().bad_length, 1);
        assert_eq!(p.state(), ParseState::Sync);
    }

    #[test]
    fn test_zero_length_when_allowed() {
        let format = FrameFormat {
            allow_empty: true,
            ..FrameFormat::default()
        };
        let mut p = StreamParser::new(Direction::McuToHost, format);
        let empty = [MCU_SYNC, 0x06, 0x00, crc8(&[MCU_SYNC, 0x06, 0x00])];
        let out = p.collect(&empty);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_empty());
    }

    #[test]
    fn test_corrupted_checksum_then_clean_frame() {
        let clean = frame(Kind::McuAck, &[1, 2, 3]);
        let mut corrupted = clean.clone();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0x01;

        let mut p = parser();
        assert!(p.collect(&corrupted).is_empty());
        assert_eq!(p.state(), ParseState::Sync);
        assert_eq!(p.stats().bad_checksum, 1);

        let out = p.collect(&clean);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload(), &[1, 2, 3]);
    }

    #[test]
    fn test_wrong_direction_is_noise() {
        let msg = Message::new(Kind::MotorCommand, vec![1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = encode_frame(Direction::HostToMcu, &msg, FrameFormat::default(), &mut buf).unwrap();

        let mut p = parser();
        assert!(p.collect(&buf[..n]).is_empty());
        assert_eq!(p.stats().frames, 0);
    }

    #[test]
    fn test_split_across_chunks() {
        let mut stream = frame(Kind::TelemetryEncoder, &[1, 2, 3, 4, 5, 6, 7, 8]);
        stream.extend(frame(Kind::McuDebug, b"hi"));

        for split in 0..=stream.len() {
            let mut p = parser();
            let mut out = p.collect(&stream[..split]);
            out.extend(p.collect(&stream[split..]));
            assert_eq!(out.len(), 2, "split at {split}");
        }
    }

    #[test]
    fn test_timestamped_frames() {
        let format = FrameFormat::timestamped();
        let msg = Message::new(Kind::TelemetryPid, vec![3; 6])
            .unwrap()
            .with_timestamp(123_456);
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = encode_frame(Direction::McuToHost, &msg, format, &mut buf).unwrap();

        let mut p = StreamParser::new(Direction::McuToHost, format);
        let out = p.collect(&buf[..n]);
        assert_eq!(out, vec![msg]);
    }

    #[test]
    fn test_max_payload_frame() {
        let payload = [0x7Eu8; 100];
        let mut p = parser();
        let out = p.collect(&frame(Kind::McuDebug, &payload));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 100);
    }

    #[test]
    fn test_reset_drops_partial_frame() {
        let bytes = frame(Kind::McuAck, &[1, 2, 3]);
        let mut p = parser();
        p.collect(&bytes[..4]);
        assert_eq!(p.state(), ParseState::Payload);
        p.reset();
        assert_eq!(p.state(), ParseState::Sync);
        assert!(p.collect(&bytes[4..]).is_empty());
        assert_eq!(p.collect(&bytes).len(), 1);
    }
}
