use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, TenantId};

/// Where an [`Event`] was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    /// Relational-table polling adapter.
    Mysql,
    /// Stream broker consumer adapter.
    Kafka,
    /// Passive HTTP push endpoint.
    HttpPush,
}

/// Terminal state an [`Event`] can reach. Never mutated again once terminal,
/// except by the stuck-watchdog promoting `Processing` to `Stuck`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Just ingested, not yet picked up by the pipeline.
    Received,
    /// Pipeline is actively working the event.
    Processing,
    /// At least one integration delivered successfully (and none failed).
    Delivered,
    /// At least one integration delivered or scheduled successfully, and at
    /// least one other failed.
    PartialSuccess,
    /// No delivery was attempted, or every attempt was a benign skip.
    Skipped(SkipReason),
    /// At least one delivery attempt failed without a compensating success.
    Failed,
    /// Reclaimed by the stuck-watchdog after exceeding the stuck threshold
    /// while `Processing`.
    Stuck,
}

/// Why an event was skipped rather than delivered or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// The event carried no resolvable tenant id.
    NoEntityContext,
    /// Payload exceeded `maxPayloadSize`.
    PayloadTooLarge,
    /// Fingerprint matched an in-memory or durable dedup record.
    Duplicate,
    /// No active integration matched `(tenant, eventType)`.
    NoWebhook,
    /// A scheduled item's computed due time was more than 60s in the past.
    ScheduledTimePassed,
    /// The event was a cancellation/reschedule signal; matching scheduled
    /// items were cancelled instead of the event being delivered.
    CancellationProcessed,
}

/// The unprocessed shape a source adapter hands to the event handler, before
/// tenant resolution, fingerprinting, and id assignment turn it into an
/// [`Event`]. `tenant_id` and `id` are `None` when the source cannot supply
/// them on its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// The source's own id for this event, if it assigns one.
    pub id: Option<EventId>,
    /// Logical event type.
    pub event_type: String,
    /// Tenant id, if the source can resolve one without help.
    pub tenant_id: Option<TenantId>,
    /// Opaque application payload.
    pub payload: serde_json::Value,
    /// Which adapter produced this event.
    pub source_name: SourceName,
    /// Adapter-specific metadata, carried through unchanged.
    pub source_metadata: serde_json::Value,
    /// When the adapter received it.
    pub received_at: DateTime<Utc>,
    /// True when produced by a manual replay rather than a live source.
    pub is_replay: bool,
}

/// A received unit of work. Attributes mirror the data model's event entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Stable identifier: the source's own id, or the `source-fingerprint`
    /// fallback computed by the event handler.
    pub id: EventId,
    /// Logical event type, matched against integration trigger lists.
    pub event_type: String,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Opaque application payload.
    pub payload: serde_json::Value,
    /// Which adapter produced this event.
    pub source_name: SourceName,
    /// Adapter-specific metadata (offsets, row ids, headers) carried through
    /// unchanged for diagnostics.
    pub source_metadata: serde_json::Value,
    /// When the event was received by the adapter.
    pub received_at: DateTime<Utc>,
    /// Number of delivery attempts made for this event so far.
    pub attempt_count: u32,
    /// True when this event was produced by a manual replay rather than a
    /// live source.
    pub is_replay: bool,
    /// Current lifecycle status.
    pub status: EventStatus,
}

impl Event {
    /// Returns true once the event has reached any terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            EventStatus::Delivered
                | EventStatus::PartialSuccess
                | EventStatus::Skipped(_)
                | EventStatus::Failed
                | EventStatus::Stuck
        )
    }
}
