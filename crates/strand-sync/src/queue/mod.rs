//! Shutdown-aware queue
//!
//! [`ShutdownableQueue`] is an unbounded queue with a one-shot, permanent
//! shutdown. Consumers can wait for items in two ways that share one
//! wait-set:
//!
//! - [`ShutdownableQueue::get`] returns a future (suspending convention)
//! - [`ShutdownableQueue::get_blocking`] parks the calling thread
//!
//! After [`shutdown`](ShutdownableQueue::shutdown) no new items are accepted.
//! Items already queued are still delivered until the queue is exhausted,
//! unless the shutdown was immediate, in which case they are discarded.

mod blocking;
mod container;
mod wait_set;

pub use blocking::BlockingIter;
pub use container::Discipline;

use container::Container;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};
use tracing::{debug, trace};
use wait_set::WaitSet;

/// Raised by `put`/`get` once the queue has been shut down
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("queue has been shut down")]
pub struct QueueShutDown;

/// Errors from [`ShutdownableQueue::try_get`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryGetError {
    /// No item is available right now
    #[error("queue is empty")]
    Empty,

    /// No item is available and none will ever be
    #[error("queue has been shut down")]
    ShutDown,
}

impl From<QueueShutDown> for TryGetError {
    fn from(_: QueueShutDown) -> Self {
        TryGetError::ShutDown
    }
}

struct State<T> {
    items: Container<T>,
    shut_down: bool,
    waiters: WaitSet,
}

/// Unbounded queue with permanent shutdown and dual blocking/async access
pub struct ShutdownableQueue<T> {
    discipline: Discipline,
    state: Mutex<State<T>>,
}

impl<T> ShutdownableQueue<T> {
    /// Create an open, empty queue
    pub fn new(discipline: Discipline) -> Self {
        Self {
            discipline,
            state: Mutex::new(State {
                items: Container::new(discipline),
                shut_down: false,
                waiters: WaitSet::default(),
            }),
        }
    }

    /// First in, first out
    pub fn fifo() -> Self {
        Self::new(Discipline::Fifo)
    }

    /// Last in, first out
    pub fn lifo() -> Self {
        Self::new(Discipline::Lifo)
    }

    /// Lowest priority value first
    pub fn priority() -> Self {
        Self::new(Discipline::Priority)
    }

    /// The delivery discipline
    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// Enqueue an item with the default priority (0)
    pub fn put(&self, item: T) -> Result<(), QueueShutDown> {
        self.put_with_priority(item, 0)
    }

    /// Enqueue an item; `priority` is ignored unless the discipline is
    /// [`Discipline::Priority`]
    ///
    /// Never blocks. Wakes one parked consumer.
    pub fn put_with_priority(&self, item: T, priority: i64) -> Result<(), QueueShutDown> {
        let waker = {
            let mut state = self.state.lock();
            if state.shut_down {
                return Err(QueueShutDown);
            }
            state.items.push(item, priority);
            state.waiters.pop_first()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
        Ok(())
    }

    /// Wait for an item
    ///
    /// Resolves to an item whenever one is available, even after shutdown.
    /// Resolves to [`QueueShutDown`] once the queue is shut down and empty.
    /// Dropping the future before it resolves cancels the wait.
    pub fn get(&self) -> Get<'_, T> {
        Get {
            queue: self,
            key: None,
        }
    }

    /// Take an item without waiting
    pub fn try_get(&self) -> Result<T, TryGetError> {
        let mut state = self.state.lock();
        match state.items.pop() {
            Some(item) => Ok(item),
            None if state.shut_down => Err(TryGetError::ShutDown),
            None => Err(TryGetError::Empty),
        }
    }

    /// Stop accepting items and wake every parked consumer
    ///
    /// The shut-down flag flips once; later calls are no-ops apart from
    /// draining when `immediate` is set. With `immediate`, queued items are
    /// discarded so every consumer fails with [`QueueShutDown`]. Returns the
    /// number of discarded items.
    pub fn shutdown(&self, immediate: bool) -> usize {
        let (first, discarded, waiters) = {
            let mut state = self.state.lock();
            let first = !state.shut_down;
            state.shut_down = true;
            let discarded = if immediate { state.items.clear() } else { 0 };
            (first, discarded, state.waiters.take_all())
        };
        if first || discarded > 0 {
            debug!(
                immediate,
                discarded,
                woken = waiters.len(),
                "queue shut down"
            );
        }
        for waker in waiters {
            waker.wake();
        }
        discarded
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    /// Number of queued items
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether no items are queued
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Number of consumers parked and not yet notified
    pub fn waiting_count(&self) -> usize {
        self.state.lock().waiters.len()
    }

    /// Re-evaluate a pending `get`
    ///
    /// A queued item always wins over shutdown.
    fn poll_get(&self, key: &mut Option<u64>, waker: &Waker) -> Poll<Result<T, QueueShutDown>> {
        let mut state = self.state.lock();

        let ready = match state.items.pop() {
            Some(item) => Some(Ok(item)),
            None if state.shut_down => Some(Err(QueueShutDown)),
            None => None,
        };
        if let Some(result) = ready {
            if let Some(key) = key.take() {
                state.waiters.remove(key);
            }
            return Poll::Ready(result);
        }

        match *key {
            Some(parked) if state.waiters.refresh(parked, waker) => {}
            _ => {
                let parked = state.waiters.register(waker);
                trace!(key = parked, "consumer parked");
                *key = Some(parked);
            }
        }
        Poll::Pending
    }

    /// Withdraw a pending `get` that is being dropped
    ///
    /// If it had already been notified, the wake-up is handed to the next
    /// parked consumer so an available item is not left unclaimed.
    fn cancel(&self, key: u64) {
        let forward = {
            let mut state = self.state.lock();
            if state.waiters.remove(key) || state.items.is_empty() {
                None
            } else {
                state.waiters.pop_first()
            }
        };
        if let Some(waker) = forward {
            trace!(key, "forwarding wake-up of cancelled consumer");
            waker.wake();
        }
    }
}

impl<T> Default for ShutdownableQueue<T> {
    fn default() -> Self {
        Self::fifo()
    }
}

impl<T> fmt::Debug for ShutdownableQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ShutdownableQueue")
            .field("discipline", &self.discipline)
            .field("len", &state.items.len())
            .field("shut_down", &state.shut_down)
            .field("waiting", &state.waiters.len())
            .finish()
    }
}

/// Future returned by [`ShutdownableQueue::get`]
#[must_use = "futures do nothing unless polled"]
pub struct Get<'a, T> {
    queue: &'a ShutdownableQueue<T>,
    /// Wait-set entry while parked
    key: Option<u64>,
}

impl<T> Future for Get<'_, T> {
    type Output = Result<T, QueueShutDown>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        this.queue.poll_get(&mut this.key, cx.waker())
    }
}

impl<T> Drop for Get<'_, T> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.queue.cancel(key);
        }
    }
}
