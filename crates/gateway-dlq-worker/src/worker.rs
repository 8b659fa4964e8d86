use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use gateway_delivery::{DeliveryEngine, DeliveryOptions, DeliveryStore};
use gateway_rate_limiter::RateLimitStorage;
use gateway_scheduler::backoff_base_seconds;
use gateway_store_core::{DlqStore, IntegrationConfigStore, StoreError};
use gateway_types::{
    DeliveryStatus, DlqEntry, DlqStatus, Direction, Event, EventId, EventStatus, SourceName,
    TriggerType,
};
use tokio::task::JoinHandle;

use crate::error::DlqWorkerError;

/// Tunables for one DLQ worker instance (§4.14).
#[derive(Debug, Clone)]
pub struct DlqWorkerConfig {
    /// How often `tick` runs when driven by `spawn_loop`.
    pub interval_ms: u64,
    /// Maximum number of due entries claimed per tick.
    pub batch: usize,
}

impl Default for DlqWorkerConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000, batch: 50 }
    }
}

/// Cron-cadence retry of dead-lettered deliveries. `OUTBOUND`/`SCHEDULED`
/// entries are reconstructed and re-delivered; `COMMUNICATION` entries flow
/// through the same HTTP-agnostic single-action path since
/// `deliver_single_action` already branches on channel vs. HTTP transport
/// internally. `INBOUND` has no delivery to retry and is a standing
/// placeholder that always fails.
pub struct DlqWorker<Store, RL>
where
    Store: DeliveryStore + Send + Sync,
    RL: RateLimitStorage,
{
    store: Arc<Store>,
    delivery: Arc<DeliveryEngine<Store, RL>>,
    config: DlqWorkerConfig,
}

impl<Store, RL> DlqWorker<Store, RL>
where
    Store: DeliveryStore + Send + Sync + 'static,
    RL: RateLimitStorage + Send + Sync + 'static,
{
    /// Builds a worker with default tunables.
    pub fn new(store: Arc<Store>, delivery: Arc<DeliveryEngine<Store, RL>>) -> Self {
        Self { store, delivery, config: DlqWorkerConfig::default() }
    }

    /// Overrides the default tunables.
    pub fn with_config(mut self, config: DlqWorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawns a background task ticking every `interval_ms`.
    pub fn spawn_loop(self: Arc<Self>) -> JoinHandle<()> {
        let interval = StdDuration::from_millis(self.config.interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.tick().await {
                    tracing::error!(%err, "dlq worker tick failed");
                }
            }
        })
    }

    /// Runs one pass over the due DLQ batch.
    pub async fn tick(&self) -> Result<(), DlqWorkerError> {
        let now = Utc::now();
        let batch = self.store.claim_due_batch(now, self.config.batch).await?;
        for entry in batch {
            let id = entry.id;
            if let Err(err) = self.process_entry(entry).await {
                tracing::error!(dlq_entry_id = %id, %err, "dlq entry processing failed");
            }
        }
        Ok(())
    }

    async fn process_entry(&self, entry: DlqEntry) -> Result<(), DlqWorkerError> {
        if entry.direction == Direction::Inbound {
            return self.reschedule_or_abandon(entry, false).await;
        }

        let integration = match self.store.get(&entry.integration_id).await {
            Ok(versioned) => versioned,
            Err(StoreError::NotFound(_)) => return self.reschedule_or_abandon(entry, false).await,
            Err(err) => return Err(err.into()),
        };

        if !integration.value.active {
            return self.reschedule_or_abandon(entry, false).await;
        }

        let event = Event {
            id: EventId::new(),
            event_type: "dlq_retry".to_string(),
            tenant_id: entry.tenant_id,
            payload: entry.payload.clone(),
            source_name: SourceName::HttpPush,
            source_metadata: serde_json::Value::Null,
            received_at: entry.created_at,
            attempt_count: entry.retry_count,
            is_replay: false,
            status: EventStatus::Processing,
        };

        let options = DeliveryOptions {
            trace_id: entry.trace_id,
            trigger_type: TriggerType::DlqRetry,
            existing_log_id: None,
            is_test_event: false,
            force_delivery: false,
        };

        let attempt_count = entry.retry_count + 1;
        let outcome = self
            .delivery
            .deliver_single_action(&integration, None, &event, attempt_count, &options)
            .await?;

        let succeeded = matches!(outcome.status, DeliveryStatus::Success | DeliveryStatus::Skipped);
        self.reschedule_or_abandon(entry, succeeded).await
    }

    async fn reschedule_or_abandon(&self, entry: DlqEntry, succeeded: bool) -> Result<(), DlqWorkerError> {
        if succeeded {
            self.store.update_status(&entry.id, DlqStatus::Resolved, entry.retry_count, None).await?;
            return Ok(());
        }

        let next_retry_count = entry.retry_count + 1;
        if next_retry_count >= entry.max_retries {
            self.store.update_status(&entry.id, DlqStatus::Abandoned, next_retry_count, None).await?;
            return Ok(());
        }

        let base = backoff_base_seconds(next_retry_count);
        let next_retry_at = Utc::now() + chrono::Duration::seconds(base as i64);
        self.store
            .update_status(&entry.id, DlqStatus::Pending, next_retry_count, Some(next_retry_at))
            .await?;
        Ok(())
    }
}
