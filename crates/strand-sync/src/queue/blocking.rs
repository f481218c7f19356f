//! Thread-parking front-end over the shared wait-set

use super::{QueueShutDown, ShutdownableQueue};
use parking_lot::{Condvar, Mutex};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

/// Wake-up flag a blocked thread sleeps on
#[derive(Default)]
struct Signal {
    notified: Mutex<bool>,
    cond: Condvar,
}

impl Signal {
    fn wait(&self) {
        let mut notified = self.notified.lock();
        while !*notified {
            self.cond.wait(&mut notified);
        }
        *notified = false;
    }
}

impl Wake for Signal {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        *self.notified.lock() = true;
        self.cond.notify_one();
    }
}

impl<T> ShutdownableQueue<T> {
    /// Wait for an item, parking the calling thread
    ///
    /// Same semantics as [`get`](Self::get). The thread registers in the
    /// same wait-set as suspended tasks and sleeps on a condition variable
    /// until a producer or a shutdown wakes it.
    pub fn get_blocking(&self) -> Result<T, QueueShutDown> {
        let signal = Arc::new(Signal::default());
        let waker = Waker::from(Arc::clone(&signal));
        let mut cx = Context::from_waker(&waker);

        let mut get = self.get();
        loop {
            if let Poll::Ready(result) = Pin::new(&mut get).poll(&mut cx) {
                return result;
            }
            signal.wait();
        }
    }

    /// Iterate over items with [`get_blocking`](Self::get_blocking) until the
    /// queue is shut down and exhausted
    pub fn iter_blocking(&self) -> BlockingIter<'_, T> {
        BlockingIter { queue: self }
    }
}

/// Iterator returned by [`ShutdownableQueue::iter_blocking`]
pub struct BlockingIter<'a, T> {
    queue: &'a ShutdownableQueue<T>,
}

impl<T> Iterator for BlockingIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.get_blocking().ok()
    }
}
