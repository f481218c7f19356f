//! Safepoints between the primitive steps of multi-step operations
//!
//! Claiming a guard is a short sequence of steps. Between them the
//! occupancies poll [`safepoint`], which is a single atomic load when no hook
//! is installed. A scheduler simulation can install a hook that switches to
//! another task right there, which is where a preemptive interpreter could
//! switch too.
//!
//! The hook runs on whatever thread reached the safepoint, so it decides for
//! itself whether that thread is one it schedules.

use crossbeam::atomic::AtomicCell;

static HOOK: AtomicCell<Option<fn()>> = AtomicCell::new(None);

/// Install (or with `None`, remove) the process-wide safepoint hook
pub fn set_safepoint_hook(hook: Option<fn()>) {
    HOOK.store(hook);
}

/// Poll the installed hook, if any
pub(crate) fn safepoint() {
    if let Some(hook) = HOOK.load() {
        hook();
    }
}
