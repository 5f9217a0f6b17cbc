use pacerlink_transport::DmaRing;

use crate::codec::Message;
use crate::parser::StreamParser;

/// Read position over a circular DMA buffer.
///
/// The cursor only ever moves towards the engine's write index; bytes the
/// engine has not written are never consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingCursor {
    read: usize,
    capacity: usize,
}

impl RingCursor {
    /// Cursor at position 0 of a ring of `capacity` bytes (`capacity > 0`).
    pub fn new(capacity: usize) -> Self {
        Self {
            read: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn position(&self) -> usize {
        self.read
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written but not yet consumed.
    pub fn unread(&self, write_index: usize) -> usize {
        let write_index = write_index % self.capacity;
        (write_index + self.capacity - self.read) % self.capacity
    }

    /// Feed every unread byte up to `write_index` to `parser`.
    ///
    /// Returns the number of messages emitted.
    pub fn drain<R, F>(
        &mut self,
        ring: &R,
        write_index: usize,
        parser: &mut StreamParser,
        emit: &mut F,
    ) -> usize
    where
        R: DmaRing + ?Sized,
        F: FnMut(Message),
    {
        let mut emitted = 0;
        for _ in 0..self.unread(write_index) {
            emitted += parser.push(ring.byte_at(self.read), emit);
            self.read = (self.read + 1) % self.capacity;
        }
        emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_frame, FrameFormat, MAX_FRAME_LEN};
    use crate::kind::{Direction, Kind};
    use pacerlink_transport::SimulatedDma;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let msg = Message::new(Kind::MotorCommand, payload.to_vec()).unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = encode_frame(Direction::HostToMcu, &msg, FrameFormat::default(), &mut buf).unwrap();
        buf[..n].to_vec()
    }

    fn parser() -> StreamParser {
        StreamParser::new(Direction::HostToMcu, FrameFormat::default())
    }

    #[test]
    fn test_unread_wraps() {
        let mut cursor = RingCursor::new(10);
        assert_eq!(cursor.unread(0), 0);
        assert_eq!(cursor.unread(4), 4);
        cursor.read = 8;
        assert_eq!(cursor.unread(2), 4);
        assert_eq!(cursor.unread(8), 0);
    }

    #[test]
    fn test_drain_stops_at_write_index() {
        let dma = SimulatedDma::new(32);
        let bytes = frame(&[1, 2, 3, 4]);
        dma.receive(&bytes[..5]);

        let mut cursor = RingCursor::new(dma.capacity());
        let mut p = parser();
        let mut out = Vec::new();
        assert_eq!(cursor.drain(&dma, dma.write_index(), &mut p, &mut |m| out.push(m)), 0);
        assert_eq!(cursor.position(), 5);

        dma.receive(&bytes[5..]);
        assert_eq!(cursor.drain(&dma, dma.write_index(), &mut p, &mut |m| out.push(m)), 1);
        assert_eq!(cursor.position(), bytes.len());
        assert_eq!(out[0].payload(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_frame_across_wraparound() {
        let dma = SimulatedDma::new(16);
        let mut cursor = RingCursor::new(dma.capacity());
        let mut p = parser();
        let mut out = Vec::new();

        // Move both the engine and the cursor close to the end of the ring.
        dma.receive(&[0u8; 13]);
        cursor.drain(&dma, dma.write_index(), &mut p, &mut |m| out.push(m));
        assert_eq!(cursor.position(), 13);

        let bytes = frame(&[9, 8, 7, 6, 5]);
        dma.receive(&bytes);
        assert!(dma.write_index() < cursor.position());
        let emitted = cursor.drain(&dma, dma.write_index(), &mut p, &mut |m| out.push(m));
        assert_eq!(emitted, 1);
        assert_eq!(out[0].payload(), &[9, 8, 7, 6, 5]);
        assert_eq!(cursor.position(), (13 + bytes.len()) % 16);
    }
}
