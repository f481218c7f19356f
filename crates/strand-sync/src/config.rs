//! Start-up configuration for the synchronization core

use crate::sync::{Regime, RegimeError};

/// Environment variable consulted by [`SyncOptions::from_env`]
pub const REGIME_ENV: &str = "STRAND_REGIME";

/// Options read once, when the process-wide regime is first probed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Explicit scheduling regime (None = probe the host)
    pub regime: Option<Regime>,
}

impl SyncOptions {
    /// Options pinned to a single-threaded cooperative executor
    pub fn cooperative() -> Self {
        Self {
            regime: Some(Regime::Cooperative),
        }
    }

    /// Options pinned to true parallelism
    pub fn parallel() -> Self {
        Self {
            regime: Some(Regime::Parallel),
        }
    }

    /// Read options from the process environment
    pub fn from_env() -> Result<Self, RegimeError> {
        Self::from_value(std::env::var(REGIME_ENV).ok().as_deref())
    }

    /// Build options from the raw value of [`REGIME_ENV`]
    pub fn from_value(value: Option<&str>) -> Result<Self, RegimeError> {
        let regime = match value.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse()?),
        };
        Ok(Self { regime })
    }

    /// Decide the regime these options describe
    ///
    /// `Cooperative` is never inferred: the cheap flag it selects is only
    /// sound when the caller guarantees a single-threaded executor.
    pub fn resolve(&self) -> Regime {
        self.regime.unwrap_or_else(|| {
            if num_cpus::get() > 1 {
                Regime::Parallel
            } else {
                Regime::Interleaved
            }
        })
    }
}
