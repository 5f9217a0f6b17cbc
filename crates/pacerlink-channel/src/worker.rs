//! Receive and send loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use pacerlink_frame::{FrameError, FrameWriter, Message};
use pacerlink_transport::Transport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::ChannelConfig;
use crate::event::EventFlag;
use crate::queue::BoundedQueue;
use crate::source::RxSource;
use crate::stats::LinkStats;

/// Slot holding the receive source while no worker owns it.
pub(crate) type SourceSlot = Arc<Mutex<Option<Box<dyn RxSource>>>>;

/// State shared by the manager, both workers and every handle.
pub(crate) struct Shared {
    pub(crate) config: ChannelConfig,
    pub(crate) recv: BoundedQueue<Message>,
    pub(crate) send: BoundedQueue<Message>,
    pub(crate) events: Arc<EventFlag>,
    pub(crate) stats: LinkStats,
    pub(crate) rx_running: AtomicBool,
    pub(crate) tx_running: AtomicBool,
    pub(crate) started_at: Instant,
}

impl Shared {
    pub(crate) fn new(config: ChannelConfig) -> Self {
        Self {
            recv: BoundedQueue::new(config.recv_capacity),
            send: BoundedQueue::new(config.send_capacity),
            events: EventFlag::new(),
            stats: LinkStats::default(),
            rx_running: AtomicBool::new(false),
            tx_running: AtomicBool::new(false),
            started_at: Instant::now(),
            config,
        }
    }

    /// Milliseconds since the channel was initialized, wrapping at `u32`.
    pub(crate) fn elapsed_millis(&self) -> u32 {
        self.started_at.elapsed().as_millis() as u32
    }

    /// Hand a received message to consumers.
    fn deliver(&self, message: Message) {
        let category = message.category();
        let kind = message.kind();
        match self.recv.push(message, self.config.recv_policy) {
            Ok(()) => {
                self.stats.record_received();
                trace!(%kind, "message received");
                self.events.notify(category);
            }
            Err(_) => {
                self.stats.record_rx_dropped();
                warn!(
                    %kind,
                    capacity = self.recv.capacity(),
                    "receive queue full, dropping message"
                );
            }
        }
    }
}

/// Clears a worker's running flag however the worker exits.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub(crate) fn receive_loop(shared: Arc<Shared>, slot: SourceSlot, token: CancellationToken) {
    let _running = RunningGuard(&shared.rx_running);

    let taken = slot
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .take();
    let Some(mut source) = taken else {
        warn!("receive worker has no source; a previous worker panicked");
        return;
    };

    let poll = shared.config.poll_interval;
    while !token.is_cancelled() {
        let result = source.pump(poll, &mut |message| shared.deliver(message));
        shared.stats.record_parser(source.parser_stats());
        if let Err(err) = result {
            shared.stats.record_rx_error();
            warn!(error = %err, "receive worker stopping on transport failure");
            break;
        }
    }

    *slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(source);
    debug!("receive worker exited");
}

pub(crate) fn send_loop(
    shared: Arc<Shared>,
    transport: Arc<dyn Transport>,
    token: CancellationToken,
) {
    let _running = RunningGuard(&shared.tx_running);

    let config = &shared.config;
    let mut writer = FrameWriter::new(transport, config.local, config.format);
    while !token.is_cancelled() {
        let Some(message) = shared.send.pop_timeout(config.poll_interval) else {
            continue;
        };
        let message = if config.format.timestamp && message.timestamp().is_none() {
            message.with_timestamp(shared.elapsed_millis())
        } else {
            message
        };

        match writer.write_message(&message) {
            Ok(len) => {
                shared.stats.record_sent(len);
                trace!(kind = %message.kind(), len, "message sent");
                thread::sleep(config.pacing(len));
            }
            Err(err @ (FrameError::EmptyPayload | FrameError::PayloadTooLarge { .. })) => {
                shared.stats.record_tx_dropped();
                warn!(kind = %message.kind(), error = %err, "dropping unencodable message");
            }
            Err(err) => {
                shared.stats.record_tx_error();
                warn!(error = %err, "send worker stopping on transport failure");
                break;
            }
        }
    }
    debug!("send worker exited");
}
