//! Process-wide scheduling regime
//!
//! The regime is probed once, the first time anything asks for it, and never
//! changes afterwards. Primitives read it at construction to pick the
//! cheapest representation that is still correct for the host.

use crate::config::{SyncOptions, REGIME_ENV};
use crate::sync::{FlagOccupancy, Occupancy, TokenOccupancy};
use once_cell::sync::OnceCell;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

static REGIME: OnceCell<Regime> = OnceCell::new();

/// How tasks in this process may interleave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    /// Tasks run simultaneously on independent hardware threads
    Parallel,
    /// One task runs at a time but may be preempted between any two steps
    Interleaved,
    /// One task runs at a time and only switches at explicit suspension points
    Cooperative,
}

/// Errors raised while configuring the regime
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegimeError {
    /// The process-wide regime was already probed or installed
    #[error("regime already set to {current}, cannot switch to {requested}")]
    AlreadySet {
        /// Regime in effect
        current: Regime,
        /// Regime that was asked for
        requested: Regime,
    },

    /// Unrecognized regime name
    #[error("unknown regime {0:?} (expected parallel, interleaved or cooperative)")]
    Unknown(String),
}

impl Regime {
    /// The regime in effect for this process, probing it on first use
    ///
    /// An unrecognized [`REGIME_ENV`] value is not an error here: it is logged
    /// with `warn!` and the probe falls back to the host default, as if the
    /// variable were unset. Use [`SyncOptions::from_env`] to reject it instead.
    pub fn current() -> Regime {
        *REGIME.get_or_init(|| {
            let regime = probe(SyncOptions::from_env());
            debug!(%regime, "probed concurrency regime");
            regime
        })
    }

    /// Pin the process-wide regime before anything probes it
    ///
    /// Installing the regime that is already in effect is a no-op.
    pub fn install(requested: Regime) -> Result<(), RegimeError> {
        let current = *REGIME.get_or_init(|| {
            debug!(regime = %requested, "installed concurrency regime");
            requested
        });
        if current == requested {
            Ok(())
        } else {
            Err(RegimeError::AlreadySet { current, requested })
        }
    }

    /// Whether a plain load-then-store pair is indivisible under this regime
    pub fn steps_are_atomic(self) -> bool {
        matches!(self, Regime::Cooperative)
    }

    /// Build the free/held representation for this regime
    pub fn occupancy(self) -> Box<dyn Occupancy> {
        if self.steps_are_atomic() {
            Box::new(FlagOccupancy::new())
        } else {
            Box::new(TokenOccupancy::new())
        }
    }

    /// Lower-case name, as accepted by [`FromStr`]
    pub fn as_str(self) -> &'static str {
        match self {
            Regime::Parallel => "parallel",
            Regime::Interleaved => "interleaved",
            Regime::Cooperative => "cooperative",
        }
    }
}

/// Resolve configured options, treating a bad configuration as unset
fn probe(options: Result<SyncOptions, RegimeError>) -> Regime {
    options
        .unwrap_or_else(|err| {
            warn!(%err, "ignoring {}", REGIME_ENV);
            SyncOptions::default()
        })
        .resolve()
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Regime {
    type Err = RegimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parallel" => Ok(Regime::Parallel),
            "interleaved" => Ok(Regime::Interleaved),
            "cooperative" => Ok(Regime::Cooperative),
            _ => Err(RegimeError::Unknown(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_from_str() {
        assert_eq!("parallel".parse::<Regime>().unwrap(), Regime::Parallel);
        assert_eq!("INTERLEAVED".parse::<Regime>().unwrap(), Regime::Interleaved);
        assert_eq!("Cooperative".parse::<Regime>().unwrap(), Regime::Cooperative);
        assert!("threads".parse::<Regime>().is_err());
    }

    #[test]
    fn test_regime_display_round_trip() {
        for regime in [Regime::Parallel, Regime::Interleaved, Regime::Cooperative] {
            assert_eq!(regime.to_string().parse::<Regime>().unwrap(), regime);
        }
    }

    #[test]
    fn test_regime_current_is_stable() {
        let first = Regime::current();
        assert_eq!(Regime::current(), first);
    }

    #[test]
    fn test_regime_install_after_probe() {
        let current = Regime::current();
        assert!(Regime::install(current).is_ok());

        let other = if current == Regime::Parallel {
            Regime::Interleaved
        } else {
            Regime::Parallel
        };
        assert_eq!(
            Regime::install(other),
            Err(RegimeError::AlreadySet {
                current,
                requested: other,
            })
        );
        assert_eq!(Regime::current(), current);
    }

    #[test]
    fn test_probe_ignores_invalid_setting() {
        let invalid = SyncOptions::from_value(Some("green-threads"));
        assert!(invalid.is_err());
        assert_eq!(probe(invalid), SyncOptions::default().resolve());
        assert_eq!(
            probe(SyncOptions::from_value(Some("cooperative"))),
            Regime::Cooperative
        );
    }

    #[test]
    fn test_regime_selects_representation() {
        assert!(Regime::Cooperative.steps_are_atomic());
        assert!(!Regime::Interleaved.steps_are_atomic());
        assert!(!Regime::Parallel.steps_are_atomic());
        assert!(Regime::Parallel.occupancy().is_free());
        assert!(Regime::Cooperative.occupancy().is_free());
    }
}
