use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ids::EventId;

/// Stable hash of `(eventType, payload, tenantId)`, used to recognize the
/// same logical event seen more than once.
///
/// Bit-exact composition is a compatibility requirement: the hash input is
/// the UTF-8 bytes of `eventType`, a `\0` separator, the payload's
/// canonical JSON serialization, a second `\0` separator, and the tenant
/// id, hashed with SHA-256 and hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventFingerprint(
    /// The hex-encoded hash string.
    pub String,
);

impl EventFingerprint {
    /// Computes the fingerprint for an event type, payload and tenant id.
    ///
    /// `payload` is serialized via `serde_json::to_vec`, which canonicalizes
    /// field order by object-key insertion order of the `Value` tree; callers
    /// that need cross-process stability should build payloads through
    /// [`serde_json::Map`] with a deterministic key order upstream.
    pub fn compute(event_type: &str, payload: &serde_json::Value, tenant_id: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(event_type.as_bytes());
        hasher.update(b"\0");
        hasher.update(serde_json::to_vec(payload).unwrap_or_default());
        hasher.update(b"\0");
        hasher.update(tenant_id.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for EventFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Durable dedup record, consulted in addition to the in-memory TTL cache
/// so a fingerprint seen before a restart is still recognized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupRecord {
    /// The fingerprint this record guards.
    pub fingerprint: EventFingerprint,
    /// When this fingerprint was first observed.
    pub first_seen_at: DateTime<Utc>,
    /// The event id that produced the first sighting.
    pub event_id: EventId,
}
