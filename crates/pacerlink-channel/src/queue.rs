use std::collections::VecDeque;
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::OverflowPolicy;

/// A push was refused because the queue was full. Carries the item back.
pub struct QueueFull<T>(pub T);

impl<T> QueueFull<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueFull(..)")
    }
}

impl<T> fmt::Display for QueueFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue full")
    }
}

impl<T> std::error::Error for QueueFull<T> {}

struct State<T> {
    items: VecDeque<T>,
    /// Bumped by `wake_all` so blocked callers give up their wait.
    wake_epoch: u64,
}

/// Fixed-capacity FIFO shared between threads.
///
/// Every operation runs under one mutex, so `clear` never interleaves with a
/// push or pop and `len() <= capacity()` always holds.
pub struct BoundedQueue<T> {
    state: Mutex<State<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> BoundedQueue<T> {
    /// Queue holding at most `capacity` items (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                wake_epoch: 0,
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Append `item` if there is room.
    pub fn try_push(&self, item: T) -> Result<(), QueueFull<T>> {
        let mut state = self.lock();
        if state.items.len() >= self.capacity {
            return Err(QueueFull(item));
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append `item`, waiting up to `timeout` for room.
    ///
    /// Gives up early if [`wake_all`](Self::wake_all) is called.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), QueueFull<T>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        let epoch = state.wake_epoch;
        while state.items.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline || state.wake_epoch != epoch {
                return Err(QueueFull(item));
            }
            let (guard, _) = self
                .not_full
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
        state.items.push_back(item);
        drop(state);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Append `item` according to `policy`.
    pub fn push(&self, item: T, policy: OverflowPolicy) -> Result<(), QueueFull<T>> {
        match policy {
            OverflowPolicy::Reject => self.try_push(item),
            OverflowPolicy::Block(timeout) => self.push_timeout(item, timeout),
        }
    }

    /// Remove the oldest item, if any.
    pub fn try_pop(&self) -> Option<T> {
        let item = self.lock().items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Remove the oldest item, waiting up to `timeout` for one to arrive.
    ///
    /// Returns `None` on timeout or when [`wake_all`](Self::wake_all) is called.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        let epoch = state.wake_epoch;
        loop {
            if let Some(item) = state.items.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(item);
            }
            let now = Instant::now();
            if now >= deadline || state.wake_epoch != epoch {
                return None;
            }
            let (guard, _) = self
                .not_empty
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
        }
    }

    /// Drop every queued item, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let removed = state.items.len();
        state.items.clear();
        drop(state);
        if removed > 0 {
            self.not_full.notify_all();
        }
        removed
    }

    /// Release every blocked push and pop.
    pub fn wake_all(&self) {
        let mut state = self.lock();
        state.wake_epoch = state.wake_epoch.wrapping_add(1);
        drop(state);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }
}

impl<T> fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
