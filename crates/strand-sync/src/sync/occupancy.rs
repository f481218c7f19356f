//! Free/held representations behind [`ResourceGuard`](crate::sync::ResourceGuard)

use crate::sentinel::{Sentinel, TOKEN};
use crate::sync::safepoint::safepoint;
use crossbeam::atomic::AtomicCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A single-slot free/held flag
pub trait Occupancy: Send + Sync + fmt::Debug {
    /// Attempt the free -> held transition; false if already held
    fn try_claim(&self) -> bool;

    /// Perform the held -> free transition
    fn release(&self);

    /// Advisory read of the current state
    fn is_free(&self) -> bool;
}

/// Plain flag checked and set in two separate steps
///
/// Only sound under [`Regime::Cooperative`](crate::sync::Regime::Cooperative),
/// where nothing can run between the load and the store. The gap is a
/// safepoint, so a preempting scheduler can switch tasks inside it.
#[derive(Debug, Default)]
pub struct FlagOccupancy {
    held: AtomicBool,
}

impl FlagOccupancy {
    /// Create a free flag
    pub fn new() -> Self {
        Self::default()
    }
}

impl Occupancy for FlagOccupancy {
    fn try_claim(&self) -> bool {
        if self.held.load(Ordering::Relaxed) {
            return false;
        }
        safepoint();
        self.held.store(true, Ordering::Relaxed);
        true
    }

    fn release(&self) {
        self.held.store(false, Ordering::Relaxed);
    }

    fn is_free(&self) -> bool {
        !self.held.load(Ordering::Relaxed)
    }
}

/// One-element slot that holds a token while free
///
/// Claiming is a single atomic take of the token, so two callers can never
/// both observe "free" and both proceed.
pub struct TokenOccupancy {
    slot: AtomicCell<Option<&'static Sentinel>>,
}

impl TokenOccupancy {
    /// Create a free slot (token present)
    pub fn new() -> Self {
        Self {
            slot: AtomicCell::new(Some(&TOKEN)),
        }
    }
}

impl Default for TokenOccupancy {
    fn default() -> Self {
        Self::new()
    }
}

impl Occupancy for TokenOccupancy {
    fn try_claim(&self) -> bool {
        safepoint();
        self.slot.take().is_some()
    }

    fn release(&self) {
        self.slot.store(Some(&TOKEN));
    }

    fn is_free(&self) -> bool {
        self.slot.load().is_some()
    }
}

impl fmt::Debug for TokenOccupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenOccupancy")
            .field("free", &self.is_free())
            .finish()
    }
}
