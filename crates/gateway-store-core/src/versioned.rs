use serde::{Deserialize, Serialize};

/// Wraps a stored value with an opaque version, giving every mutable-state
/// document (circuit state, token cache, scheduled item, DLQ entry,
/// pending delivery) compare-and-swap semantics even on stores without a
/// native `findAndModify`.
///
/// A caller reads a `Versioned<T>`, computes the next value, and submits it
/// back through an `update_if(id, expected_version, next)` call; the store
/// rejects the write if the version has moved since the read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Versioned<T> {
    /// The stored value.
    pub value: T,
    /// Opaque version, incremented on every successful write.
    pub version: u64,
}

impl<T> Versioned<T> {
    /// Wraps a freshly created value at version 0.
    pub fn new(value: T) -> Self {
        Self { value, version: 0 }
    }

    /// Returns a copy bumped to the next version, for submission through a
    /// compare-and-swap update.
    pub fn bump(&self, value: T) -> Self {
        Self { value, version: self.version + 1 }
    }
}
