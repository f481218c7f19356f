//! Strand synchronization core
//!
//! This crate provides primitives that behave the same under every
//! scheduling regime Strand supports:
//! - True parallelism (OS threads)
//! - A single interpreter preempted between primitive steps
//! - Single-threaded cooperative tasks
//!
//! It contains:
//! - [`ResourceGuard`], a fail-fast detector of concurrent reuse
//! - [`ShutdownableQueue`], a queue with permanent shutdown and both
//!   blocking and async consumers
//! - [`Sentinel`] markers for "absent" and "terminal"

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod queue;
pub mod sentinel;
pub mod sync;

pub use config::SyncOptions;
pub use queue::{Discipline, Get, QueueShutDown, ShutdownableQueue, TryGetError};
pub use sentinel::{Sentinel, ABSENT, TERMINAL};
pub use sync::{BusyResource, GuardHandle, OwnedGuardHandle, Regime, RegimeError, ResourceGuard};
