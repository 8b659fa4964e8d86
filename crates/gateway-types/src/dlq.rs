use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryErrorCode;
use crate::ids::{IntegrationId, TenantId, TraceId};
use crate::integration::Direction;

/// Error detail attached to a [`DlqEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqError {
    /// Human-readable message.
    pub message: String,
    /// Stable error code.
    pub code: DeliveryErrorCode,
    /// HTTP status code, when the failure came from an HTTP response.
    pub status_code: Option<u16>,
}

/// Lifecycle state of a [`DlqEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DlqStatus {
    /// Waiting for the DLQ worker's next cadence.
    Pending,
    /// Claimed by the DLQ worker and being retried.
    Retrying,
    /// Retried successfully.
    Resolved,
    /// Exceeded its retry budget.
    Abandoned,
}

/// Final failure record: what the delivery engine produces when a delivery
/// reaches `FAILED` or `ABANDONED` outside of test events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    /// Unique id.
    pub id: uuid::Uuid,
    /// Correlation id of the originating delivery attempt.
    pub trace_id: TraceId,
    /// Integration this entry belongs to.
    pub integration_id: IntegrationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Which side of the pipeline produced this entry.
    pub direction: Direction,
    /// The payload that was attempted, sufficient to reconstruct the
    /// delivery.
    pub payload: serde_json::Value,
    /// Error detail.
    pub error: DlqError,
    /// How many times the DLQ worker has retried this entry.
    pub retry_count: u32,
    /// Maximum retries before this entry is abandoned.
    pub max_retries: u32,
    /// Earliest time the DLQ worker should retry this entry.
    pub next_retry_at: DateTime<Utc>,
    /// Current lifecycle state.
    pub status: DlqStatus,
    /// When this entry was created.
    pub created_at: DateTime<Utc>,
}

impl DlqEntry {
    /// True once `retry_count` has reached `max_retries`.
    pub fn exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}
