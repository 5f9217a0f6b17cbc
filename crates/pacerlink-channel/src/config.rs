use std::time::Duration;

use pacerlink_frame::{Direction, FrameFormat, DEFAULT_READ_CHUNK};

/// Default capacity of both queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// How long a blocking send-side push waits for room by default.
pub const DEFAULT_SEND_BLOCK: Duration = Duration::from_millis(50);

/// Default upper bound on one blocking wait inside a worker.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What a push does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Fail immediately.
    Reject,
    /// Wait up to the given time for room, then fail.
    Block(Duration),
}

/// Configuration for one end of the link.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Direction of the frames this end sends.
    pub local: Direction,
    pub format: FrameFormat,
    pub recv_capacity: usize,
    pub send_capacity: usize,
    /// Applied by the receive worker when the receive queue is full.
    pub recv_policy: OverflowPolicy,
    /// Applied by [`ChannelHandle::enqueue`](crate::ChannelHandle::enqueue).
    pub send_policy: OverflowPolicy,
    /// Upper bound on a worker's blocking wait; bounds `stop()` latency.
    pub poll_interval: Duration,
    /// Bytes requested per transport read.
    pub read_chunk: usize,
    /// Line speed, used to pace consecutive frames.
    pub baud_rate: u32,
    /// Minimum idle time between two transmitted frames.
    pub min_frame_gap: Duration,
}

impl ChannelConfig {
    /// Host end: sends `0xA5` frames, receives `0x5A` frames.
    pub fn host() -> Self {
        Self {
            local: Direction::HostToMcu,
            format: FrameFormat::default(),
            recv_capacity: DEFAULT_QUEUE_CAPACITY,
            send_capacity: DEFAULT_QUEUE_CAPACITY,
            recv_policy: OverflowPolicy::Reject,
            send_policy: OverflowPolicy::Block(DEFAULT_SEND_BLOCK),
            poll_interval: DEFAULT_POLL_INTERVAL,
            read_chunk: DEFAULT_READ_CHUNK,
            baud_rate: 115_200,
            min_frame_gap: Duration::ZERO,
        }
    }

    /// Microcontroller end: sends `0x5A` frames and leaves the DMA engine
    /// 10 ms per frame.
    pub fn mcu() -> Self {
        Self {
            local: Direction::McuToHost,
            min_frame_gap: Duration::from_millis(10),
            ..Self::host()
        }
    }

    /// Direction of the frames this end receives.
    pub fn remote(&self) -> Direction {
        self.local.reverse()
    }

    /// Idle time after sending a frame of `frame_len` bytes.
    ///
    /// One byte on an 8N1 line takes ten bit times.
    pub fn pacing(&self, frame_len: usize) -> Duration {
        let wire = if self.baud_rate == 0 {
            Duration::ZERO
        } else {
            let micros = frame_len as u64 * 10 * 1_000_000 / u64::from(self.baud_rate);
            Duration::from_micros(micros)
        };
        wire.max(self.min_frame_gap)
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_mirror_each_other() {
        let host = ChannelConfig::host();
        let mcu = ChannelConfig::mcu();
        assert_eq!(host.local, mcu.remote());
        assert_eq!(mcu.local, host.remote());
        assert_eq!(host.recv_capacity, 100);
        assert_eq!(host.send_policy, OverflowPolicy::Block(Duration::from_millis(50)));
        assert_eq!(host.recv_policy, OverflowPolicy::Reject);
    }

    #[test]
    fn pacing_uses_line_time_or_gap() {
        let host = ChannelConfig::host();
        // 104 bytes at 115200 baud: 1040 bits, about 9 ms.
        assert_eq!(host.pacing(104), Duration::from_micros(9027));

        let mcu = ChannelConfig::mcu();
        assert_eq!(mcu.pacing(104), Duration::from_millis(10));

        let slow = ChannelConfig {
            baud_rate: 9_600,
            ..ChannelConfig::mcu()
        };
        assert_eq!(slow.pacing(12), Duration::from_micros(12_500));
    }
}
