//! Last-reader-clears notification of newly received data.
//!
//! A notification stays raised until every registered subscriber has
//! observed it once. Each [`Subscription`] remembers the last notification
//! it saw, so it never observes the same one twice.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use pacerlink_frame::Category;
use tokio_util::sync::CancellationToken;

/// Slice used when waiting on a cancellation token.
const CANCEL_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct FlagState {
    category: Category,
    seq: u64,
    acks: usize,
    subscribers: usize,
    closed: bool,
}

impl FlagState {
    fn clear_if_acknowledged(&mut self) {
        if self.category != Category::None && self.acks >= self.subscribers {
            self.category = Category::None;
        }
    }
}

/// Notification shared by the receive worker and all consumers.
#[derive(Debug, Default)]
pub struct EventFlag {
    state: Mutex<FlagState>,
    changed: Condvar,
}

impl EventFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, FlagState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a subscriber.
    ///
    /// A notification raised before the call and not yet cleared is still
    /// observable by the new subscriber.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let mut state = self.lock();
        state.subscribers += 1;
        let last_seen = if state.category != Category::None {
            state.seq.wrapping_sub(1)
        } else {
            state.seq
        };
        drop(state);
        Subscription {
            flag: Arc::clone(self),
            last_seen,
        }
    }

    /// Raise `category` and wake every waiter.
    pub fn notify(&self, category: Category) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.category = category;
        state.seq = state.seq.wrapping_add(1);
        state.acks = 0;
        drop(state);
        self.changed.notify_all();
    }

    /// Currently raised category.
    pub fn category(&self) -> Category {
        self.lock().category
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers
    }

    /// Clear the notification without acknowledgements.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.category = Category::None;
        state.acks = 0;
    }

    /// Wake every waiter with `None`; later waits return `None` immediately.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.category = Category::None;
        drop(state);
        self.changed.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// One consumer's registration on an [`EventFlag`]. Unsubscribes on drop.
#[derive(Debug)]
pub struct Subscription {
    flag: Arc<EventFlag>,
    last_seen: u64,
}

impl Subscription {
    /// Take the pending notification, if this subscription has not seen it.
    fn observe(&mut self, state: &mut FlagState) -> Option<Category> {
        if state.closed || state.seq == self.last_seen {
            return None;
        }
        self.last_seen = state.seq;
        if state.category == Category::None {
            return None;
        }
        let category = state.category;
        state.acks += 1;
        state.clear_if_acknowledged();
        Some(category)
    }

    /// Observe a pending notification without blocking.
    pub fn try_wait(&mut self) -> Option<Category> {
        let flag = Arc::clone(&self.flag);
        let mut state = flag.lock();
        self.observe(&mut state)
    }

    /// Wait up to `timeout` for a notification this subscription has not seen.
    ///
    /// Returns `None` on timeout or once the flag is closed.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<Category> {
        let deadline = Instant::now() + timeout;
        let flag = Arc::clone(&self.flag);
        let mut state = flag.lock();
        loop {
            if state.closed {
                return None;
            }
            if let Some(category) = self.observe(&mut state) {
                return Some(category);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = flag
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
    }

    /// Wait until a notification arrives, the flag closes or `token` is cancelled.
    pub fn wait_until_cancelled(&mut self, token: &CancellationToken) -> Option<Category> {
        while !token.is_cancelled() {
            if let Some(category) = self.wait_timeout(CANCEL_POLL) {
                return Some(category);
            }
            if self.flag.is_closed() {
                return None;
            }
        }
        None
    }

    /// The flag this subscription listens on.
    pub fn flag(&self) -> &Arc<EventFlag> {
        &self.flag
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut state = self.flag.lock();
        state.subscribers = state.subscribers.saturating_sub(1);
        if state.seq == self.last_seen && state.category != Category::None {
            // This subscriber's acknowledgement no longer counts.
            state.acks = state.acks.saturating_sub(1);
        }
        state.clear_if_acknowledged();
    }
}
