//! Exclusive-access detection
//!
//! This module provides the busy-resource guard and the regime-dependent
//! free/held representations it is built on. The guard never blocks: it
//! detects concurrent reuse and fails fast.

mod guard;
mod occupancy;
mod regime;
mod safepoint;
mod serialize;

pub use guard::{BusyResource, GuardHandle, OwnedGuardHandle, ResourceGuard, DEFAULT_ACTION};
pub use occupancy::{FlagOccupancy, Occupancy, TokenOccupancy};
pub use regime::{Regime, RegimeError};
pub use safepoint::set_safepoint_hook;
pub use serialize::SerializedGuard;
