use std::sync::atomic::{AtomicU64, Ordering};

use pacerlink_frame::ParserStats;
use serde::Serialize;

/// Counters updated by the workers and the application handle.
#[derive(Debug, Default)]
pub struct LinkStats {
    rx_frames: AtomicU64,
    rx_dropped: AtomicU64,
    rx_errors: AtomicU64,
    noise_bytes: AtomicU64,
    bad_kind: AtomicU64,
    bad_length: AtomicU64,
    bad_checksum: AtomicU64,
    tx_frames: AtomicU64,
    tx_bytes: AtomicU64,
    tx_dropped: AtomicU64,
    tx_errors: AtomicU64,
}

/// Point-in-time copy of [`LinkStats`] plus queue depths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatsSnapshot {
    /// Messages delivered to the receive queue.
    pub rx_frames: u64,
    /// Valid messages dropped because the receive queue was full.
    pub rx_dropped: u64,
    /// Fatal receive-side transport failures.
    pub rx_errors: u64,
    pub noise_bytes: u64,
    pub bad_kind: u64,
    pub bad_length: u64,
    pub bad_checksum: u64,
    pub tx_frames: u64,
    pub tx_bytes: u64,
    /// Messages refused by the send queue or the encoder.
    pub tx_dropped: u64,
    /// Fatal send-side transport failures.
    pub tx_errors: u64,
    pub recv_len: usize,
    pub send_len: usize,
}

impl LinkStats {
    pub(crate) fn record_received(&self) {
        self.rx_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rx_dropped(&self) {
        self.rx_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rx_error(&self) {
        self.rx_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        self.tx_frames.fetch_add(1, Ordering::Relaxed);
        self.tx_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_tx_dropped(&self) {
        self.tx_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_tx_error(&self) {
        self.tx_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish the receive parser's counters.
    pub(crate) fn record_parser(&self, parser: ParserStats) {
        self.noise_bytes.store(parser.noise_bytes, Ordering::Relaxed);
        self.bad_kind.store(parser.bad_kind, Ordering::Relaxed);
        self.bad_length.store(parser.bad_length, Ordering::Relaxed);
        self.bad_checksum.store(parser.bad_checksum, Ordering::Relaxed);
    }

    pub fn snapshot(&self, recv_len: usize, send_len: usize) -> LinkStatsSnapshot {
        LinkStatsSnapshot {
            rx_frames: self.rx_frames.load(Ordering::Relaxed),
            rx_dropped: self.rx_dropped.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            noise_bytes: self.noise_bytes.load(Ordering::Relaxed),
            bad_kind: self.bad_kind.load(Ordering::Relaxed),
            bad_length: self.bad_length.load(Ordering::Relaxed),
            bad_checksum: self.bad_checksum.load(Ordering::Relaxed),
            tx_frames: self.tx_frames.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            tx_dropped: self.tx_dropped.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            recv_len,
            send_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_counters() {
        let stats = LinkStats::default();
        stats.record_received();
        stats.record_received();
        stats.record_sent(7);
        stats.record_rx_dropped();
        stats.record_parser(ParserStats {
            bad_checksum: 3,
            ..ParserStats::default()
        });

        let snap = stats.snapshot(1, 2);
        assert_eq!(snap.rx_frames, 2);
        assert_eq!(snap.tx_bytes, 7);
        assert_eq!(snap.rx_dropped, 1);
        assert_eq!(snap.bad_checksum, 3);
        assert_eq!(snap.recv_len, 1);
        assert_eq!(snap.send_len, 2);
    }

    #[test]
    fn snapshot_serializes() {
        let snap = LinkStats::default().snapshot(0, 0);
        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json["rx_frames"], 0);
        assert_eq!(json["bad_checksum"], 0);
    }
}
