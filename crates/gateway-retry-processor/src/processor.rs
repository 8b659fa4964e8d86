use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::Utc;
use gateway_delivery::{DeliveryEngine, DeliveryOptions, DeliveryStore};
use gateway_rate_limiter::RateLimitStorage;
use gateway_scheduler::backoff_base_seconds;
use gateway_store_core::{DeliveryLogStore, IntegrationConfigStore, StoreError};
use gateway_types::{DeliveryLog, DeliveryStatus, Event, EventStatus, SourceName, TriggerType};
use tokio::task::JoinHandle;

use crate::error::RetryProcessorError;

/// Tunables for one retry-processor instance (§4.13).
#[derive(Debug, Clone)]
pub struct RetryProcessorConfig {
    /// How often `tick` runs when driven by `spawn_loop`.
    pub interval_ms: u64,
    /// Maximum number of RETRYING logs considered per tick.
    pub batch: usize,
    /// Soft wall-clock budget for one tick; remaining batch items are
    /// deferred to the next tick once exceeded.
    pub max_processing_time: StdDuration,
}

impl Default for RetryProcessorConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000, batch: 50, max_processing_time: StdDuration::from_secs(120) }
    }
}

/// Re-invokes delivery for `execution_logs` rows in `RETRYING` state whose
/// backoff window has elapsed, abandoning those whose integration is gone,
/// inactive, or already out of retries.
pub struct RetryProcessor<Store, RL>
where
    Store: DeliveryStore + Send + Sync,
    RL: RateLimitStorage,
{
    store: Arc<Store>,
    delivery: Arc<DeliveryEngine<Store, RL>>,
    config: RetryProcessorConfig,
}

impl<Store, RL> RetryProcessor<Store, RL>
where
    Store: DeliveryStore + Send + Sync + 'static,
    RL: RateLimitStorage + Send + Sync + 'static,
{
    /// Builds a processor with default tunables.
    pub fn new(store: Arc<Store>, delivery: Arc<DeliveryEngine<Store, RL>>) -> Self {
        Self { store, delivery, config: RetryProcessorConfig::default() }
    }

    /// Overrides the default tunables.
    pub fn with_config(mut self, config: RetryProcessorConfig) -> Self {
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
                    tracing::error!(%err, "retry processor tick failed");
                }
            }
        })
    }

    /// Runs one pass over the RETRYING batch, re-invoking delivery for
    /// every log whose backoff window has elapsed.
    pub async fn tick(&self) -> Result<(), RetryProcessorError> {
        let started = Instant::now();
        let batch = self.store.list_retrying_batch(self.config.batch).await?;

        for log in batch {
            if started.elapsed() > self.config.max_processing_time {
                tracing::warn!("retry processor exceeded its processing budget, deferring remaining logs");
                break;
            }
            if let Err(err) = self.process_log(log).await {
                tracing::error!(%err, "retry-log processing failed");
            }
        }
        Ok(())
    }

    async fn process_log(&self, log: DeliveryLog) -> Result<(), RetryProcessorError> {
        let integration = match self.store.get(&log.integration_id).await {
            Ok(versioned) => versioned,
            Err(StoreError::NotFound(_)) => return self.abandon(log).await,
            Err(err) => return Err(err.into()),
        };

        if !integration.value.active || log.attempt_count >= integration.value.max_retries {
            return self.abandon(log).await;
        }

        let base = backoff_base_seconds(log.attempt_count);
        let next_attempt_at = log.updated_at + chrono::Duration::seconds(base as i64);
        if Utc::now() < next_attempt_at {
            return Ok(());
        }

        let action = log.action_index.and_then(|idx| integration.value.actions.get(idx));

        let event = Event {
            id: log.event_id.clone(),
            event_type: "retry".to_string(),
            tenant_id: log.tenant_id,
            payload: log.original_payload.clone(),
            source_name: SourceName::HttpPush,
            source_metadata: serde_json::Value::Null,
            received_at: log.created_at,
            attempt_count: log.attempt_count,
            is_replay: false,
            status: EventStatus::Processing,
        };

        let attempt_count = log.attempt_count + 1;
        let options = DeliveryOptions {
            trace_id: log.trace_id,
            trigger_type: log.trigger_type,
            existing_log_id: Some(log.id),
            is_test_event: false,
            force_delivery: false,
        };

        self.delivery.deliver_single_action(&integration, action, &event, attempt_count, &options).await?;
        Ok(())
    }

    async fn abandon(&self, mut log: DeliveryLog) -> Result<(), RetryProcessorError> {
        log.status = DeliveryStatus::Abandoned;
        log.updated_at = Utc::now();
        self.store.upsert(log).await?;
        Ok(())
    }
}
