use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DeliveryErrorCode;
use crate::ids::{EventId, IntegrationId, TenantId, TraceId};
use crate::integration::Direction;

/// What originally caused a delivery attempt to be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    /// A live event matched the integration.
    Event,
    /// Fired by the scheduler worker from a scheduled item.
    Scheduled,
    /// A manual replay of a previously received event.
    Replay,
    /// Invoked directly, outside the event pipeline.
    Manual,
    /// Re-invoked by the DLQ worker.
    DlqRetry,
    /// Fired by the scheduled-job worker's cron/interval tick.
    ScheduledJob,
}

/// Outcome of one delivery attempt (or the aggregate of one multi-action
/// sequence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// The attempt succeeded.
    Success,
    /// The attempt failed and will not be retried.
    Failed,
    /// The attempt failed in a way eligible for another attempt.
    Retrying,
    /// A RETRYING attempt exhausted `maxRetries`.
    Abandoned,
    /// No attempt was made (null transform, dedup-adjacent, etc).
    Skipped,
    /// Multi-action only: some actions succeeded, some failed.
    PartialSuccess,
}

/// Signing metadata recorded on a log row when signing was enabled for the
/// attempt, for audit purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningAudit {
    /// The `X-Integration-ID` value used.
    pub message_id: String,
    /// The `X-Integration-Timestamp` value used.
    pub timestamp: i64,
    /// The head-of-rotation signature actually sent.
    pub signature: String,
}

/// One record per delivery attempt. Append-only by id: retries reuse the
/// same id via `existing_log_id` to coalesce attempts onto a single row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLog {
    /// Stable log id, reused across retries of the same logical attempt.
    pub id: uuid::Uuid,
    /// Correlation id shared by every log row produced from one event.
    pub trace_id: TraceId,
    /// Integration this attempt was made against.
    pub integration_id: IntegrationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Source event.
    pub event_id: EventId,
    /// Which side of the pipeline produced this attempt.
    pub direction: Direction,
    /// What triggered this attempt.
    pub trigger_type: TriggerType,
    /// Action name, for multi-action integrations.
    pub action_name: Option<String>,
    /// Zero-based action index, for multi-action integrations.
    pub action_index: Option<usize>,
    /// Current outcome.
    pub status: DeliveryStatus,
    /// HTTP response status code, when an HTTP call was made.
    pub response_status: Option<u16>,
    /// Wall-clock time the outbound call took, in milliseconds.
    pub response_time_ms: Option<u64>,
    /// How many attempts have been made for this logical delivery.
    pub attempt_count: u32,
    /// The payload as received, before transformation.
    pub original_payload: serde_json::Value,
    /// The payload as sent, after transformation.
    pub transformed_payload: Option<serde_json::Value>,
    /// Request headers sent, for diagnostics (secrets redacted by callers
    /// before persistence).
    pub request_headers: serde_json::Value,
    /// Response body received, truncated by callers as needed.
    pub response_body: Option<String>,
    /// Human-readable error description, when not SUCCESS.
    pub error_message: Option<String>,
    /// Stable machine-readable error code, when not SUCCESS.
    pub error_code: Option<DeliveryErrorCode>,
    /// Signing details, when signing was enabled for this attempt.
    pub signing_audit: Option<SigningAudit>,
    /// When this row was first created.
    pub created_at: DateTime<Utc>,
    /// When this row was last updated (most recent attempt).
    pub updated_at: DateTime<Utc>,
}

impl DeliveryLog {
    /// True once this log has reached a status that will never again be
    /// advanced by a retry.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            DeliveryStatus::Success
                | DeliveryStatus::Failed
                | DeliveryStatus::Abandoned
                | DeliveryStatus::Skipped
        )
    }
}
