//! Parked consumers, ordered by arrival

use std::collections::BTreeMap;
use std::task::Waker;

/// Wakers of parked `get` calls
///
/// Entries are keyed by a monotonically increasing arrival number. Waking an
/// entry removes it, so "still registered" means "not yet notified".
#[derive(Default)]
pub(crate) struct WaitSet {
    waiters: BTreeMap<u64, Waker>,
    next_key: u64,
}

impl WaitSet {
    /// Park a waker at the back of the set
    pub(crate) fn register(&mut self, waker: &Waker) -> u64 {
        let key = self.next_key;
        self.next_key += 1;
        self.waiters.insert(key, waker.clone());
        key
    }

    /// Refresh the waker of a still-parked entry; false if it was notified
    pub(crate) fn refresh(&mut self, key: u64, waker: &Waker) -> bool {
        match self.waiters.get_mut(&key) {
            Some(parked) => {
                if !parked.will_wake(waker) {
                    parked.clone_from(waker);
                }
                true
            }
            None => false,
        }
    }

    /// Remove an entry; false if it was already notified
    pub(crate) fn remove(&mut self, key: u64) -> bool {
        self.waiters.remove(&key).is_some()
    }

    /// Take the longest-parked waker
    pub(crate) fn pop_first(&mut self) -> Option<Waker> {
        self.waiters.pop_first().map(|(_, waker)| waker)
    }

    /// Take every parked waker, in arrival order
    pub(crate) fn take_all(&mut self) -> Vec<Waker> {
        std::mem::take(&mut self.waiters).into_values().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.waiters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::task::noop_waker;

    #[test]
    fn test_wait_set_arrival_order() {
        let waker = noop_waker();
        let mut set = WaitSet::default();

        let first = set.register(&waker);
        let second = set.register(&waker);
        assert!(first < second);
        assert_eq!(set.len(), 2);

        assert!(set.pop_first().is_some());
        assert!(!set.refresh(first, &waker));
        assert!(set.refresh(second, &waker));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_wait_set_remove() {
        let waker = noop_waker();
        let mut set = WaitSet::default();

        let key = set.register(&waker);
        assert!(set.remove(key));
        assert!(!set.remove(key));
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_wait_set_take_all() {
        let waker = noop_waker();
        let mut set = WaitSet::default();
        set.register(&waker);
        set.register(&waker);

        assert_eq!(set.take_all().len(), 2);
        assert_eq!(set.len(), 0);
        assert!(set.pop_first().is_none());

        // Keys keep increasing after a drain
        assert_eq!(set.register(&waker), 2);
    }
}
