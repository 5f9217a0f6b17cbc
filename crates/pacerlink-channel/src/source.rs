//! Where the receive worker gets its bytes.

use std::time::Duration;

use pacerlink_frame::{
    Direction, FrameFormat, FrameReader, Message, ParserStats, RingCursor, StreamParser,
};
use pacerlink_transport::{DmaRing, Transport};
use tracing::trace;

/// Byte source driven by the receive worker.
///
/// Each source owns its parser. `pump` waits at most about `timeout` for
/// input, feeds what arrived to the parser and hands every completed message
/// to `emit`. A timeout is `Ok(0)`; an error ends the worker.
pub trait RxSource: Send {
    fn pump(
        &mut self,
        timeout: Duration,
        emit: &mut dyn FnMut(Message),
    ) -> pacerlink_frame::Result<usize>;

    /// Counters of the source's parser.
    fn parser_stats(&self) -> ParserStats;
}

impl<T: Transport> RxSource for FrameReader<T> {
    /// One transport read; the transport's own read timeout bounds the wait.
    fn pump(
        &mut self,
        _timeout: Duration,
        emit: &mut dyn FnMut(Message),
    ) -> pacerlink_frame::Result<usize> {
        self.poll_messages(&mut |message| emit(message))
    }

    fn parser_stats(&self) -> ParserStats {
        self.stats()
    }
}

/// Receive source over a circular DMA buffer.
///
/// Waits for the ring's interrupt signal, then reads the remaining-count
/// register. When no interrupt arrives within the timeout the register is
/// polled anyway, so bytes are never stranded by a lost interrupt.
pub struct DmaReader<R> {
    ring: R,
    cursor: RingCursor,
    parser: StreamParser,
    polled_bursts: u64,
}

impl<R: DmaRing> DmaReader<R> {
    pub fn new(ring: R, expected: Direction, format: FrameFormat) -> Self {
        let cursor = RingCursor::new(ring.capacity());
        Self {
            ring,
            cursor,
            parser: StreamParser::new(expected, format),
            polled_bursts: 0,
        }
    }

    /// Bursts picked up by polling because no interrupt announced them.
    pub fn polled_bursts(&self) -> u64 {
        self.polled_bursts
    }

    pub fn cursor(&self) -> RingCursor {
        self.cursor
    }

    pub fn get_ref(&self) -> &R {
        &self.ring
    }
}

impl<R: DmaRing> RxSource for DmaReader<R> {
    fn pump(
        &mut self,
        timeout: Duration,
        emit: &mut dyn FnMut(Message),
    ) -> pacerlink_frame::Result<usize> {
        // A posted index can be older than the cursor when polling already
        // consumed its bytes, so the signal only wakes; the register decides.
        let signalled = match self.ring.signal() {
            Some(signal) => signal.wait(timeout).is_some(),
            None => {
                std::thread::sleep(timeout);
                false
            }
        };
        let write_index = self.ring.write_index();
        if !signalled && self.cursor.unread(write_index) > 0 {
            self.polled_bursts += 1;
            trace!(write_index, "dma data found by polling");
        }
        let mut forward = |message: Message| emit(message);
        Ok(self
            .cursor
            .drain(&self.ring, write_index, &mut self.parser, &mut forward))
    }

    fn parser_stats(&self) -> ParserStats {
        self.parser.stats()
    }
}

impl<R> std::fmt::Debug for DmaReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmaReader")
            .field("cursor", &self.cursor)
            .field("parser", &self.parser)
            .field("polled_bursts", &self.polled_bursts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pacerlink_frame::{encode_frame, Kind, MAX_FRAME_LEN};
    use pacerlink_transport::{MemoryTransport, SimulatedDma};

    use super::*;

    fn host_frame(payload: &[u8]) -> Vec<u8> {
        let msg = Message::new(Kind::NavCommand, payload.to_vec()).unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = encode_frame(Direction::HostToMcu, &msg, FrameFormat::default(), &mut buf).unwrap();
        buf[..n].to_vec()
    }

    fn dma_reader(dma: &Arc<SimulatedDma>) -> DmaReader<Arc<SimulatedDma>> {
        DmaReader::new(Arc::clone(dma), Direction::HostToMcu, FrameFormat::default())
    }

    #[test]
    fn interrupt_path_delivers() {
        let dma = Arc::new(SimulatedDma::new(64));
        let mut reader = dma_reader(&dma);
        dma.receive(&host_frame(&[1, 2]));

        let mut out = Vec::new();
        let n = reader
            .pump(Duration::from_millis(100), &mut |m| out.push(m))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(out[0].payload(), &[1, 2]);
        assert_eq!(reader.polled_bursts(), 0);
    }

    #[test]
    fn missed_interrupt_is_recovered_by_polling() {
        let dma = Arc::new(SimulatedDma::new(64));
        dma.set_interrupts(false);
        let mut reader = dma_reader(&dma);
        dma.receive(&host_frame(&[3, 4, 5]));

        let mut out = Vec::new();
        let n = reader
            .pump(Duration::from_millis(20), &mut |m| out.push(m))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(out[0].payload(), &[3, 4, 5]);
        assert_eq!(reader.polled_bursts(), 1);
    }

    #[test]
    fn late_interrupt_after_poll_delivers_nothing_twice() {
        let dma = Arc::new(SimulatedDma::new(64));
        dma.set_interrupts(false);
        let mut reader = dma_reader(&dma);
        let frame = host_frame(&[7, 7, 7]);
        dma.receive(&frame[..frame.len() - 2]);
        let stale = dma.write_index();
        dma.receive(&frame[frame.len() - 2..]);

        let mut out = Vec::new();
        let n = reader
            .pump(Duration::from_millis(20), &mut |m| out.push(m))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(reader.cursor().position(), frame.len());

        // The interrupt for the first half of the burst shows up late.
        dma.interrupt().post(stale);
        let n = reader
            .pump(Duration::from_millis(20), &mut |m| out.push(m))
            .unwrap();
        assert_eq!(n, 0);
        assert_eq!(out.len(), 1);
        assert_eq!(reader.cursor().position(), dma.write_index());
        assert_eq!(reader.parser_stats().noise_bytes, 0);
        assert_eq!(reader.parser_stats().frames, 1);
    }

    #[test]
    fn interrupt_ahead_of_register_reads_register() {
        let dma = Arc::new(SimulatedDma::new(64));
        dma.set_interrupts(false);
        let mut reader = dma_reader(&dma);
        dma.receive(&host_frame(&[1]));
        dma.interrupt().post(40);

        let mut out = Vec::new();
        let n = reader
            .pump(Duration::from_millis(20), &mut |m| out.push(m))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(reader.cursor().position(), dma.write_index());
        assert_eq!(reader.polled_bursts(), 0);
    }

    #[test]
    fn idle_ring_times_out() {
        let dma = Arc::new(SimulatedDma::new(64));
        let mut reader = dma_reader(&dma);
        let n = reader.pump(Duration::from_millis(10), &mut |_| {}).unwrap();
        assert_eq!(n, 0);
        assert_eq!(reader.cursor().position(), 0);
    }

    #[test]
    fn frame_reader_is_a_source() {
        let (host, mcu) = MemoryTransport::pair();
        host.open().unwrap();
        mcu.open().unwrap();
        host.write(&host_frame(&[9])).unwrap();

        let mut source: Box<dyn RxSource> = Box::new(FrameReader::new(
            mcu,
            Direction::HostToMcu,
            FrameFormat::default(),
        ));
        let mut out = Vec::new();
        let n = source
            .pump(Duration::from_millis(100), &mut |m| out.push(m))
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(source.parser_stats().frames, 1);
    }
}
