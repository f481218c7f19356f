//! Item storage for each delivery discipline

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Order in which available items are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Discipline {
    /// First in, first out
    #[default]
    Fifo,
    /// Last in, first out
    Lifo,
    /// Lowest priority value first, ties in insertion order
    Priority,
}

pub(crate) enum Container<T> {
    Fifo(VecDeque<T>),
    Lifo(Vec<T>),
    Priority {
        heap: BinaryHeap<Prioritized<T>>,
        next_seq: u64,
    },
}

impl<T> Container<T> {
    pub(crate) fn new(discipline: Discipline) -> Self {
        match discipline {
            Discipline::Fifo => Container::Fifo(VecDeque::new()),
            Discipline::Lifo => Container::Lifo(Vec::new()),
            Discipline::Priority => Container::Priority {
                heap: BinaryHeap::new(),
                next_seq: 0,
            },
        }
    }

    /// Insert an item; `priority` only matters under [`Discipline::Priority`]
    pub(crate) fn push(&mut self, item: T, priority: i64) {
        match self {
            Container::Fifo(items) => items.push_back(item),
            Container::Lifo(items) => items.push(item),
            Container::Priority { heap, next_seq } => {
                heap.push(Prioritized {
                    priority,
                    seq: *next_seq,
                    item,
                });
                *next_seq += 1;
            }
        }
    }

    pub(crate) fn pop(&mut self) -> Option<T> {
        match self {
            Container::Fifo(items) => items.pop_front(),
            Container::Lifo(items) => items.pop(),
            Container::Priority { heap, .. } => heap.pop().map(|entry| entry.item),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Container::Fifo(items) => items.len(),
            Container::Lifo(items) => items.len(),
            Container::Priority { heap, .. } => heap.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every item, returning how many were discarded
    pub(crate) fn clear(&mut self) -> usize {
        let discarded = self.len();
        match self {
            Container::Fifo(items) => items.clear(),
            Container::Lifo(items) => items.clear(),
            Container::Priority { heap, .. } => heap.clear(),
        }
        discarded
    }
}

pub(crate) struct Prioritized<T> {
    priority: i64,
    seq: u64,
    item: T,
}

// BinaryHeap pops the greatest entry, so the ordering is reversed: lower
// priority values and earlier insertions compare greater.
impl<T> Ord for Prioritized<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl<T> PartialOrd for Prioritized<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> PartialEq for Prioritized<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Prioritized<T> {}
