//! Process-wide marker values
//!
//! A [`Sentinel`] is a placeholder that can never collide with a legitimate
//! value: there is exactly one instance per purpose, it lives for the whole
//! process, and it is compared by identity. The type has private fields and no
//! constructor, so no crate outside this one can define another marker; the
//! only instances are the statics below.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Unique, non-reconstructible placeholder value
///
/// Only ever handled as `&'static Sentinel`. Equality and hashing go through
/// the address, and the value is always false when read as a boolean.
///
/// No other crate can define a marker of its own:
///
/// ```compile_fail,E0451
/// let forged = strand_sync::Sentinel { label: "absent" };
/// ```
pub struct Sentinel {
    label: &'static str,
}

/// Marks a value that was never provided
pub static ABSENT: Sentinel = Sentinel { label: "absent" };

/// Marks the end of a stream of values
pub static TERMINAL: Sentinel = Sentinel { label: "terminal" };

/// Parked in a free token slot; see [`TokenOccupancy`](crate::sync::TokenOccupancy)
pub(crate) static TOKEN: Sentinel = Sentinel { label: "token" };

/// Markers reachable by label. `TOKEN` stays out so it cannot leak through
/// deserialization.
static PUBLIC: [&Sentinel; 2] = [&ABSENT, &TERMINAL];

impl Sentinel {
    /// Resolve a label to its canonical marker
    pub fn named(label: &str) -> Option<&'static Sentinel> {
        PUBLIC
            .iter()
            .copied()
            .find(|sentinel| sentinel.label == label)
    }

    /// The fixed label of this marker
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Markers are always false in a boolean context
    pub const fn is_truthy(&self) -> bool {
        false
    }
}

impl PartialEq for Sentinel {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for Sentinel {}

impl Hash for Sentinel {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

impl From<&Sentinel> for bool {
    fn from(sentinel: &Sentinel) -> bool {
        sentinel.is_truthy()
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.label)
    }
}

impl fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sentinel_identity() {
        assert_eq!(&ABSENT, &ABSENT);
        assert_ne!(&ABSENT, &TERMINAL);
        assert!(std::ptr::eq(Sentinel::named("absent").unwrap(), &ABSENT));
        assert!(std::ptr::eq(
            Sentinel::named("terminal").unwrap(),
            &TERMINAL
        ));
    }

    #[test]
    fn test_sentinel_named_unknown() {
        assert!(Sentinel::named("missing").is_none());
        // The internal token is not reachable by label
        assert!(Sentinel::named("token").is_none());
    }

    #[test]
    fn test_sentinel_falsy() {
        assert!(!ABSENT.is_truthy());
        assert!(!bool::from(&TERMINAL));
        assert!(!bool::from(&TOKEN));
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(ABSENT.to_string(), "<absent>");
        assert_eq!(format!("{:?}", TERMINAL), "<terminal>");
        assert_eq!(TERMINAL.label(), "terminal");
    }

    #[test]
    fn test_sentinel_hash_by_identity() {
        let mut seen = HashSet::new();
        assert!(seen.insert(&ABSENT));
        assert!(seen.insert(&TERMINAL));
        assert!(!seen.insert(Sentinel::named("absent").unwrap()));
        assert_eq!(seen.len(), 2);
    }
}
