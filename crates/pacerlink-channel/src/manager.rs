use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pacerlink_frame::{FrameError, FrameReader, Message};
use pacerlink_transport::Transport;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::event::Subscription;
use crate::source::RxSource;
use crate::stats::LinkStatsSnapshot;
use crate::worker::{self, Shared, SourceSlot};

/// Liveness of the two workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Running,
    ReceiveStopped,
    SendStopped,
    BothStopped,
}

impl RunStatus {
    fn compose(rx: bool, tx: bool) -> Self {
        match (rx, tx) {
            (true, true) => RunStatus::Running,
            (false, true) => RunStatus::ReceiveStopped,
            (true, false) => RunStatus::SendStopped,
            (false, false) => RunStatus::BothStopped,
        }
    }
}

struct Workers {
    token: CancellationToken,
    rx: JoinHandle<()>,
    tx: JoinHandle<()>,
}

struct Link {
    transport: Arc<dyn Transport>,
    shared: Arc<Shared>,
    source: SourceSlot,
    workers: Option<Workers>,
}

/// Owns one send pipeline and one receive pipeline over a transport.
///
/// Lifecycle: `new` → `init` → `start` → `stop` → `deinit`, where
/// `start`/`stop` may repeat. Misuse returns an error and changes nothing.
pub struct ChannelManager {
    config: ChannelConfig,
    link: Option<Link>,
}

impl ChannelManager {
    pub fn new(config: ChannelConfig) -> Self {
        Self { config, link: None }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Open `transport` and allocate the queues. Received frames are read
    /// from the same transport.
    pub fn init(&mut self, transport: Arc<dyn Transport>) -> Result<()> {
        if self.link.is_some() {
            return Err(ChannelError::AlreadyInitialized);
        }
        let reader = FrameReader::new(
            Arc::clone(&transport),
            self.config.remote(),
            self.config.format,
        )
        .with_chunk_len(self.config.read_chunk);
        self.init_with_source(transport, reader)
    }

    /// Open `transport` for sending and receive from `source` instead.
    pub fn init_with_source<S>(&mut self, transport: Arc<dyn Transport>, source: S) -> Result<()>
    where
        S: RxSource + 'static,
    {
        if self.link.is_some() {
            return Err(ChannelError::AlreadyInitialized);
        }
        transport.open()?;

        let source: Box<dyn RxSource> = Box::new(source);
        self.link = Some(Link {
            transport,
            shared: Arc::new(Shared::new(self.config.clone())),
            source: Arc::new(Mutex::new(Some(source))),
            workers: None,
        });
        info!(
            local = %self.config.local,
            recv_capacity = self.config.recv_capacity,
            send_capacity = self.config.send_capacity,
            "channel initialized"
        );
        Ok(())
    }

    /// Spawn the receive and send workers.
    pub fn start(&mut self) -> Result<()> {
        let link = self.link.as_mut().ok_or(ChannelError::NotInitialized)?;
        if link.workers.is_some() {
            return Err(ChannelError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        link.shared.rx_running.store(true, Ordering::SeqCst);
        link.shared.tx_running.store(true, Ordering::SeqCst);

        let rx = {
            let shared = Arc::clone(&link.shared);
            let slot = Arc::clone(&link.source);
            let token = token.clone();
            thread::Builder::new()
                .name("pacerlink-rx".into())
                .spawn(move || worker::receive_loop(shared, slot, token))
        };
        let rx = match rx {
            Ok(handle) => handle,
            Err(err) => {
                link.shared.rx_running.store(false, Ordering::SeqCst);
                link.shared.tx_running.store(false, Ordering::SeqCst);
                return Err(ChannelError::WorkerSpawn(err));
            }
        };

        let tx = {
            let shared = Arc::clone(&link.shared);
            let transport = Arc::clone(&link.transport);
            let token = token.clone();
            thread::Builder::new()
                .name("pacerlink-tx".into())
                .spawn(move || worker::send_loop(shared, transport, token))
        };
        let tx = match tx {
            Ok(handle) => handle,
            Err(err) => {
                token.cancel();
                link.shared.recv.wake_all();
                link.shared.tx_running.store(false, Ordering::SeqCst);
                if rx.join().is_err() {
                    warn!("receive worker panicked during aborted start");
                }
                return Err(ChannelError::WorkerSpawn(err));
            }
        };

        link.workers = Some(Workers { token, rx, tx });
        info!(local = %self.config.local, "channel started");
        Ok(())
    }

    /// Cancel both workers and wait for them to exit.
    pub fn stop(&mut self) -> Result<()> {
        let link = self.link.as_mut().ok_or(ChannelError::NotRunning)?;
        let workers = link.workers.take().ok_or(ChannelError::NotRunning)?;

        workers.token.cancel();
        link.shared.recv.wake_all();
        link.shared.send.wake_all();

        let rx = workers.rx.join();
        let tx = workers.tx.join();
        info!(local = %self.config.local, "channel stopped");

        if rx.is_err() {
            return Err(ChannelError::WorkerPanicked("receive"));
        }
        if tx.is_err() {
            return Err(ChannelError::WorkerPanicked("send"));
        }
        Ok(())
    }

    /// Close the transport and release the queues.
    ///
    /// If the transport fails to close the manager stays initialized, with
    /// its queues intact, so `deinit` can be retried.
    pub fn deinit(&mut self) -> Result<()> {
        let link = match &self.link {
            None => return Err(ChannelError::NotInitialized),
            Some(link) if link.workers.is_some() => return Err(ChannelError::StillRunning),
            Some(link) => link,
        };
        link.transport.close()?;

        if let Some(link) = self.link.take() {
            link.shared.events.close();
            link.shared.recv.clear();
            link.shared.send.clear();
        }
        info!(local = %self.config.local, "channel deinitialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.link.is_some()
    }

    /// Whether `start` succeeded and `stop` has not been called. A worker may
    /// still have exited on its own; see [`run_status`](Self::run_status).
    pub fn is_running(&self) -> bool {
        self.link.as_ref().is_some_and(|link| link.workers.is_some())
    }

    /// Which workers are alive.
    pub fn run_status(&self) -> RunStatus {
        match &self.link {
            Some(link) => link.shared.run_status(),
            None => RunStatus::BothStopped,
        }
    }

    /// Application-side handle to the queues.
    pub fn handle(&self) -> Result<ChannelHandle> {
        let link = self.link.as_ref().ok_or(ChannelError::NotInitialized)?;
        Ok(ChannelHandle {
            shared: Arc::clone(&link.shared),
        })
    }
}

impl Drop for ChannelManager {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                warn!(error = %err, "channel stop during drop failed");
            }
        }
        if self.is_initialized() {
            if let Err(err) = self.deinit() {
                warn!(error = %err, "channel deinit during drop failed");
            }
        }
    }
}

impl std::fmt::Debug for ChannelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelManager")
            .field("local", &self.config.local)
            .field("initialized", &self.is_initialized())
            .field("run_status", &self.run_status())
            .finish()
    }
}

impl Shared {
    fn run_status(&self) -> RunStatus {
        RunStatus::compose(
            self.rx_running.load(Ordering::SeqCst),
            self.tx_running.load(Ordering::SeqCst),
        )
    }
}

/// Cloneable access to a channel's queues, events and statistics.
///
/// Stays usable after the manager stops; messages then simply wait in the
/// queues.
#[derive(Clone)]
pub struct ChannelHandle {
    shared: Arc<Shared>,
}

impl ChannelHandle {
    /// Queue `message` for sending, applying the configured send policy.
    pub fn enqueue(&self, message: Message) -> Result<()> {
        let format = self.shared.config.format;
        if !format.accepts_length(message.len()) {
            self.shared.stats.record_tx_dropped();
            return Err(FrameError::EmptyPayload.into());
        }
        let kind = message.kind();
        self.shared
            .send
            .push(message, self.shared.config.send_policy)
            .map_err(|_| {
                self.shared.stats.record_tx_dropped();
                warn!(%kind, capacity = self.shared.send.capacity(), "send queue full");
                ChannelError::QueueFull {
                    capacity: self.shared.send.capacity(),
                }
            })
    }

    /// Oldest received message, if any.
    pub fn dequeue(&self) -> Option<Message> {
        self.shared.recv.try_pop()
    }

    /// Oldest received message, waiting up to `timeout`.
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<Message> {
        self.shared.recv.pop_timeout(timeout)
    }

    pub fn recv_len(&self) -> usize {
        self.shared.recv.len()
    }

    pub fn send_len(&self) -> usize {
        self.shared.send.len()
    }

    pub fn is_recv_empty(&self) -> bool {
        self.shared.recv.is_empty()
    }

    pub fn is_send_empty(&self) -> bool {
        self.shared.send.is_empty()
    }

    /// Drop every received message, returning how many were removed.
    pub fn clear_recv(&self) -> usize {
        self.shared.recv.clear()
    }

    /// Drop every queued outgoing message, returning how many were removed.
    pub fn clear_send(&self) -> usize {
        self.shared.send.clear()
    }

    /// Register for new-data notifications.
    pub fn subscribe(&self) -> Subscription {
        self.shared.events.subscribe()
    }

    pub fn stats(&self) -> LinkStatsSnapshot {
        self.shared
            .stats
            .snapshot(self.shared.recv.len(), self.shared.send.len())
    }

    pub fn run_status(&self) -> RunStatus {
        self.shared.run_status()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.shared.config
    }
}

impl std::fmt::Debug for ChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelHandle")
            .field("recv_len", &self.recv_len())
            .field("send_len", &self.send_len())
            .finish()
    }
}
