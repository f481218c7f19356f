//! Serialized forms of guards and sentinels

use crate::sentinel::Sentinel;
use crate::sync::ResourceGuard;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Persisted form of a [`ResourceGuard`]
///
/// Only the action label is kept. Restoring always yields a free guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedGuard {
    /// Action label of the guard
    pub action: String,
}

impl ResourceGuard {
    /// Capture the persistent part of the guard
    pub fn snapshot(&self) -> SerializedGuard {
        SerializedGuard {
            action: self.action().to_string(),
        }
    }

    /// Rebuild a free guard from its persisted form
    pub fn restore(data: SerializedGuard) -> Self {
        Self::new(data.action)
    }
}

impl Serialize for ResourceGuard {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ResourceGuard {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SerializedGuard::deserialize(deserializer).map(Self::restore)
    }
}

impl Serialize for Sentinel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

struct SentinelVisitor;

impl Visitor<'_> for SentinelVisitor {
    type Value = &'static Sentinel;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the label of a known sentinel")
    }

    fn visit_str<E: de::Error>(self, label: &str) -> Result<Self::Value, E> {
        Sentinel::named(label).ok_or_else(|| E::unknown_variant(label, &["absent", "terminal"]))
    }
}

/// Deserializing resolves to the canonical instance, never a copy
impl<'de> Deserialize<'de> for &'static Sentinel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(SentinelVisitor)
    }
}
