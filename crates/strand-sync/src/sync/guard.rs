//! Busy-resource detector with scoped, drop-released acquisition

use crate::sync::{Occupancy, Regime};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Action label used when none is given
pub const DEFAULT_ACTION: &str = "using";

/// Raised when a [`ResourceGuard`] is acquired while already held
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("another task is already {action} this resource")]
pub struct BusyResource {
    action: String,
}

impl BusyResource {
    /// The action label of the guard that was busy
    pub fn action(&self) -> &str {
        &self.action
    }
}

/// Single-slot exclusive-access detector
///
/// Unlike a mutex, the guard never waits: acquiring it while another task
/// holds it fails immediately with [`BusyResource`]. It exists to catch
/// illegal concurrent reuse of a resource that only supports one user at a
/// time.
///
/// Equality and serialization only look at the action label; the held/free
/// state is never compared or persisted.
pub struct ResourceGuard {
    /// Human-readable description of what the holder is doing
    action: String,

    /// Free/held state, represented per the regime at construction
    occupancy: Box<dyn Occupancy>,
}

impl ResourceGuard {
    /// Create a free guard for the process-wide regime
    pub fn new(action: impl Into<String>) -> Self {
        Self::with_regime(action, Regime::current())
    }

    /// Create a free guard whose representation suits `regime`
    pub fn with_regime(action: impl Into<String>, regime: Regime) -> Self {
        Self {
            action: action.into(),
            occupancy: regime.occupancy(),
        }
    }

    /// The action label
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Advisory check; only [`acquire`](Self::acquire) is authoritative
    pub fn is_free(&self) -> bool {
        self.occupancy.is_free()
    }

    /// Claim the guard for the lifetime of the returned handle
    pub fn acquire(&self) -> Result<GuardHandle<'_>, BusyResource> {
        self.claim()?;
        Ok(GuardHandle { guard: self })
    }

    /// Claim the guard through an `Arc`, for handles that must outlive a borrow
    pub fn acquire_owned(self: &Arc<Self>) -> Result<OwnedGuardHandle, BusyResource> {
        self.claim()?;
        Ok(OwnedGuardHandle {
            guard: Arc::clone(self),
        })
    }

    /// Run `f` while holding the guard
    pub fn scoped<R>(&self, f: impl FnOnce() -> R) -> Result<R, BusyResource> {
        let _handle = self.acquire()?;
        Ok(f())
    }

    fn claim(&self) -> Result<(), BusyResource> {
        if self.occupancy.try_claim() {
            Ok(())
        } else {
            trace!(action = %self.action, "resource busy");
            Err(BusyResource {
                action: self.action.clone(),
            })
        }
    }
}

impl Default for ResourceGuard {
    fn default() -> Self {
        Self::new(DEFAULT_ACTION)
    }
}

impl PartialEq for ResourceGuard {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
    }
}

impl Eq for ResourceGuard {}

impl fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("action", &self.action)
            .field("free", &self.is_free())
            .finish()
    }
}

/// Proof of holding a [`ResourceGuard`]; releases it when dropped
#[derive(Debug)]
#[must_use = "the guard is released as soon as the handle is dropped"]
pub struct GuardHandle<'a> {
    guard: &'a ResourceGuard,
}

impl GuardHandle<'_> {
    /// The guard this handle holds
    pub fn guard(&self) -> &ResourceGuard {
        self.guard
    }

    /// Release early; equivalent to dropping the handle
    pub fn release(self) {}
}

impl Drop for GuardHandle<'_> {
    fn drop(&mut self) {
        self.guard.occupancy.release();
    }
}

/// Owned counterpart of [`GuardHandle`]
#[derive(Debug)]
#[must_use = "the guard is released as soon as the handle is dropped"]
pub struct OwnedGuardHandle {
    guard: Arc<ResourceGuard>,
}

impl OwnedGuardHandle {
    /// The guard this handle holds
    pub fn guard(&self) -> &Arc<ResourceGuard> {
        &self.guard
    }

    /// Release early; equivalent to dropping the handle
    pub fn release(self) {}
}

impl Drop for OwnedGuardHandle {
    fn drop(&mut self) {
        self.guard.occupancy.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{self, AssertUnwindSafe};

    const ALL_REGIMES: [Regime; 3] = [Regime::Parallel, Regime::Interleaved, Regime::Cooperative];

    #[test]
    fn test_guard_acquire_release() {
        for regime in ALL_REGIMES {
            let guard = ResourceGuard::with_regime("using", regime);
            assert!(guard.is_free());

            let handle = guard.acquire().unwrap();
            assert!(!guard.is_free());
            assert!(guard.acquire().is_err());

            drop(handle);
            assert!(guard.is_free());
            assert!(guard.acquire().is_ok());
        }
    }

    #[test]
    fn test_guard_busy_message() {
        let guard = ResourceGuard::with_regime("reading from", Regime::Parallel);
        let _handle = guard.acquire().unwrap();

        let err = guard.acquire().unwrap_err();
        assert_eq!(err.action(), "reading from");
        assert_eq!(
            err.to_string(),
            "another task is already reading from this resource"
        );
    }

    #[test]
    fn test_guard_default_action() {
        let guard = ResourceGuard::default();
        assert_eq!(guard.action(), DEFAULT_ACTION);
        let _handle = guard.acquire().unwrap();
        assert_eq!(
            guard.acquire().unwrap_err().to_string(),
            "another task is already using this resource"
        );
    }

    #[test]
    fn test_guard_manual_release() {
        let guard = ResourceGuard::with_regime("using", Regime::Cooperative);
        let handle = guard.acquire().unwrap();
        assert!(std::ptr::eq(handle.guard(), &guard));

        handle.release();
        assert!(guard.is_free());
    }

    #[test]
    fn test_guard_released_on_early_return() {
        fn fails_midway(guard: &ResourceGuard) -> Result<(), BusyResource> {
            let _first = guard.acquire()?;
            let _second = guard.acquire()?;
            Ok(())
        }

        let guard = ResourceGuard::with_regime("using", Regime::Parallel);
        assert!(fails_midway(&guard).is_err());
        assert!(guard.is_free());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let guard = ResourceGuard::with_regime("using", Regime::Parallel);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _handle = guard.acquire().unwrap();
            panic!("boom");
        }));

        assert!(result.is_err());
        assert!(guard.is_free());
    }

    #[test]
    fn test_guard_scoped() {
        let guard = ResourceGuard::with_regime("using", Regime::Interleaved);

        let value = guard.scoped(|| {
            assert!(!guard.is_free());
            assert!(guard.scoped(|| ()).is_err());
            42
        });

        assert_eq!(value.unwrap(), 42);
        assert!(guard.is_free());
    }

    #[test]
    fn test_owned_guard_handle() {
        let guard = Arc::new(ResourceGuard::with_regime("using", Regime::Parallel));

        let handle = guard.acquire_owned().unwrap();
        assert!(guard.acquire_owned().is_err());
        assert!(Arc::ptr_eq(handle.guard(), &guard));

        let moved = std::thread::spawn(move || {
            let still_held = !handle.guard().is_free();
            drop(handle);
            still_held
        })
        .join()
        .unwrap();

        assert!(moved);
        assert!(guard.is_free());
    }

    #[test]
    fn test_guard_equality_by_action() {
        let a = ResourceGuard::with_regime("sending on", Regime::Parallel);
        let b = ResourceGuard::with_regime("sending on", Regime::Cooperative);
        let c = ResourceGuard::with_regime("receiving on", Regime::Parallel);

        let _held = a.acquire().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_guard_debug() {
        let guard = ResourceGuard::with_regime("using", Regime::Parallel);
        let handle = guard.acquire().unwrap();
        assert_eq!(
            format!("{:?}", guard),
            r#"ResourceGuard { action: "using", free: false }"#
        );
        assert_eq!(
            format!("{:?}", handle),
            r#"GuardHandle { guard: ResourceGuard { action: "using", free: false } }"#
        );
    }

    #[test]
    fn test_busy_acquire_reports_error() {
        let guard = Arc::new(ResourceGuard::with_regime("writing to", Regime::Parallel));
        let _held = guard.acquire_owned().unwrap();

        let err = guard.acquire_owned().unwrap_err();
        assert_eq!(err.action(), "writing to");
        let busy = format!("{:?}", guard.acquire_owned());
        assert!(busy.starts_with("Err(BusyResource"));
    }
}
