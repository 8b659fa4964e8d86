use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, IntegrationId, TenantId};

/// Recurrence rule for a RECURRING scheduled item, as returned by a
/// scheduling script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    /// Interval between occurrences, in milliseconds.
    pub interval_ms: u64,
    /// Optional cutoff; no successor is scheduled once `now >= until`.
    pub until: Option<DateTime<Utc>>,
    /// Optional total occurrence count; no successor once reached.
    pub count: Option<u32>,
    /// 1-based occurrence number of this item within the recurrence.
    pub occurrence_number: u32,
}

/// Lifecycle state of a [`ScheduledItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledItemState {
    /// Waiting for `scheduled_for` to arrive.
    Pending,
    /// Claimed by a scheduler worker and being delivered.
    Processing,
    /// Delivered successfully.
    Sent,
    /// Delivery failed (not retryable at the scheduled-item level; see the
    /// retry processor for RETRYING logs).
    Failed,
    /// Cancelled by a matching cancellation event before it fired.
    Cancelled,
}

/// A future delivery persisted by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledItem {
    /// Unique id.
    pub id: uuid::Uuid,
    /// Integration this item will deliver through.
    pub integration_id: IntegrationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// The event that produced this scheduled item.
    pub original_event_id: EventId,
    /// When this item becomes eligible for claim.
    pub scheduled_for: DateTime<Utc>,
    /// Payload already transformed at schedule-time.
    pub transformed_payload: serde_json::Value,
    /// Target URL to deliver to.
    pub target_url: String,
    /// Recurrence details, present only for RECURRING items.
    pub recurrence: Option<Recurrence>,
    /// Opaque key used by `cancelScheduledIntegrationsByMatch` to cancel
    /// this item in response to a later cancellation event.
    pub cancellation_match_key: Option<String>,
    /// Current lifecycle state.
    pub state: ScheduledItemState,
    /// Delivery attempts made while in `Processing`, used to compute
    /// retry backoff on RETRYING outcomes.
    pub attempt_count: u32,
    /// When the most recent attempt was made, if any.
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// When this row was created.
    pub created_at: DateTime<Utc>,
}

impl ScheduledItem {
    /// Computes the next occurrence for a recurring item whose current
    /// occurrence just completed `Sent`, returning `None` when `count` has
    /// been reached or `until` has passed.
    pub fn next_occurrence(&self, now: DateTime<Utc>) -> Option<Recurrence> {
        let rec = self.recurrence.as_ref()?;
        let next_number = rec.occurrence_number + 1;
        if let Some(count) = rec.count {
            if next_number > count {
                return None;
            }
        }
        let next_due = self.scheduled_for + chrono::Duration::milliseconds(rec.interval_ms as i64);
        if let Some(until) = rec.until {
            if next_due > until || now >= until {
                return None;
            }
        }
        Some(Recurrence {
            interval_ms: rec.interval_ms,
            until: rec.until,
            count: rec.count,
            occurrence_number: next_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(rec: Recurrence) -> ScheduledItem {
        ScheduledItem {
            id: uuid::Uuid::new_v4(),
            integration_id: crate::ids::IntegrationId::new(),
            tenant_id: crate::ids::TenantId::new(),
            original_event_id: EventId::from("src-abc"),
            scheduled_for: Utc::now(),
            transformed_payload: serde_json::json!({}),
            target_url: "https://example.com".to_string(),
            recurrence: Some(rec),
            cancellation_match_key: None,
            state: ScheduledItemState::Sent,
            attempt_count: 1,
            last_attempt_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn stops_at_count() {
        let it = item(Recurrence {
            interval_ms: 60_000,
            until: None,
            count: Some(3),
            occurrence_number: 3,
        });
        assert!(it.next_occurrence(Utc::now()).is_none());
    }

    #[test]
    fn continues_under_count() {
        let it = item(Recurrence {
            interval_ms: 60_000,
            until: None,
            count: Some(3),
            occurrence_number: 1,
        });
        let next = it.next_occurrence(Utc::now()).expect("successor");
        assert_eq!(next.occurrence_number, 2);
    }
}
