use std::sync::Arc;

use chrono::Utc;
use gateway_bus_core::{GatewayBus, GatewayEvent};
use gateway_circuit_breaker::CircuitBreaker;
use gateway_delivery::{DeliveryEngine, DeliveryOptions, DeliveryStore};
use gateway_rate_limiter::RateLimitStorage;
use gateway_store_core::{IntegrationConfigStore, ScheduledItemStore, StoreError, Versioned};
use gateway_types::{
    DeliveryStatus, Event, EventStatus, IntegrationConfig, ScheduledItem, ScheduledItemState,
    SourceName, TraceId, TransformConfig, TransformMode, TriggerType,
};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::backoff;
use crate::error::SchedulerError;

/// Union of store traits the scheduler worker depends on.
pub trait SchedulerStore: DeliveryStore + ScheduledItemStore {}
impl<T: DeliveryStore + ScheduledItemStore> SchedulerStore for T {}

/// Tunables for one scheduler instance (§4.12).
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How often `tick` runs when driven by `spawn_loop`.
    pub interval_ms: u64,
    /// Maximum number of due items claimed per tick.
    pub batch: usize,
    /// A `Processing` item older than this is reclaimed back to `Pending`.
    pub stuck_after: chrono::Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000, batch: 10, stuck_after: chrono::Duration::minutes(10) }
    }
}

/// An integration's `transform` overridden to pass `transformed_payload`
/// through unchanged. `deliver_single_action` always re-transforms
/// `event.payload` using the integration's configured transform; scheduled
/// items are already transformed at schedule time, so the delivery-time
/// config substitutes this identity script to avoid transforming twice.
fn passthrough_transform() -> TransformConfig {
    TransformConfig { mode: TransformMode::Script { source: "payload".to_string() }, lookups: Vec::new() }
}

/// Claims and delivers due [`ScheduledItem`]s: delayed and recurring
/// integrations whose due time has arrived, reschedules RETRYING outcomes
/// with backoff, and enqueues the next occurrence of a recurring item once
/// it's SENT.
pub struct SchedulerWorker<Store, RL>
where
    Store: SchedulerStore + Send + Sync + 'static,
    RL: RateLimitStorage,
{
    store: Arc<Store>,
    delivery: Arc<DeliveryEngine<Store, RL>>,
    config: SchedulerConfig,
    bus: Option<Arc<GatewayBus>>,
}

impl<Store, RL> SchedulerWorker<Store, RL>
where
    Store: SchedulerStore + Send + Sync + 'static,
    RL: RateLimitStorage + Send + Sync + 'static,
{
    /// Builds a worker with default tunables.
    pub fn new(store: Arc<Store>, delivery: Arc<DeliveryEngine<Store, RL>>) -> Self {
        Self { store, delivery, config: SchedulerConfig::default(), bus: None }
    }

    /// Overrides the default tunables.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Publishes a `GatewayEvent::ScheduledItemTransitioned` for every
    /// terminal or rescheduled state change. Unset by default.
    pub fn with_bus(mut self, bus: Arc<GatewayBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    fn publish_transition(&self, item_id: Uuid, integration_id: gateway_types::IntegrationId, to: ScheduledItemState) {
        if let Some(bus) = &self.bus {
            bus.publish(GatewayEvent::ScheduledItemTransitioned { item_id, integration_id, to, at: Utc::now() });
        }
    }

    /// Spawns a background task ticking every `interval_ms`.
    pub fn spawn_loop(self: Arc<Self>) -> JoinHandle<()> {
        let interval = std::time::Duration::from_millis(self.config.interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.tick().await {
                    tracing::error!(%err, "scheduler tick failed");
                }
            }
        })
    }

    /// Runs one scheduler pass: resets stuck items, claims a due batch, and
    /// drives each claimed item's delivery.
    pub async fn tick(&self) -> Result<(), SchedulerError> {
        let now = Utc::now();

        let reset = self.store.reset_stuck_processing(now - self.config.stuck_after).await?;
        if reset > 0 {
            tracing::warn!(count = reset, "reset stuck scheduled items back to pending");
        }

        let batch = self.store.claim_due_batch(now, self.config.batch).await?;
        for claimed in batch {
            let id = claimed.value.id;
            if let Err(err) = self.process_item(claimed).await {
                tracing::error!(scheduled_item_id = %id, %err, "scheduled item processing failed");
            }
        }
        Ok(())
    }

    async fn process_item(&self, claimed: Versioned<ScheduledItem>) -> Result<(), SchedulerError> {
        let item = claimed.value;
        let version = claimed.version;

        let integration = match self.store.get(&item.integration_id).await {
            Ok(versioned) => versioned,
            Err(StoreError::NotFound(_)) => return self.finalize(item, version, ScheduledItemState::Failed).await,
            Err(err) => return Err(err.into()),
        };

        if !integration.value.active {
            return self.finalize(item, version, ScheduledItemState::Cancelled).await;
        }

        let breaker = CircuitBreaker::new(self.store.as_ref());
        if breaker.check(&integration.value.id).await?.is_open {
            return self.finalize(item, version, ScheduledItemState::Failed).await;
        }

        let delivery_cfg = Versioned {
            version: integration.version,
            value: IntegrationConfig { transform: passthrough_transform(), ..integration.value.clone() },
        };

        let event = Event {
            id: item.original_event_id.clone(),
            event_type: "scheduled".to_string(),
            tenant_id: item.tenant_id,
            payload: item.transformed_payload.clone(),
            source_name: SourceName::HttpPush,
            source_metadata: serde_json::Value::Null,
            received_at: item.created_at,
            attempt_count: item.attempt_count,
            is_replay: false,
            status: EventStatus::Processing,
        };

        let attempt_count = item.attempt_count + 1;
        let options = DeliveryOptions {
            trace_id: TraceId::new(),
            trigger_type: TriggerType::Scheduled,
            existing_log_id: None,
            is_test_event: false,
            force_delivery: false,
        };

        let outcome = self.delivery.deliver_single_action(&delivery_cfg, None, &event, attempt_count, &options).await?;

        match outcome.status {
            DeliveryStatus::Success | DeliveryStatus::Skipped => self.complete(item, version, attempt_count).await,
            DeliveryStatus::Retrying => self.reschedule(item, version, attempt_count).await,
            DeliveryStatus::Failed | DeliveryStatus::Abandoned => self.finalize(item, version, ScheduledItemState::Failed).await,
        }
    }

    async fn complete(&self, item: ScheduledItem, version: u64, attempt_count: u32) -> Result<(), SchedulerError> {
        let now = Utc::now();
        let successor_recurrence = item.next_occurrence(now);

        let mut sent = item.clone();
        sent.state = ScheduledItemState::Sent;
        sent.attempt_count = attempt_count;
        sent.last_attempt_at = Some(now);
        self.store.update_if(&item.id, version, sent).await?;
        self.publish_transition(item.id, item.integration_id, ScheduledItemState::Sent);

        if let Some(next_rec) = successor_recurrence {
            let next_due = item.scheduled_for + chrono::Duration::milliseconds(next_rec.interval_ms as i64);
            let successor = ScheduledItem {
                id: Uuid::new_v4(),
                integration_id: item.integration_id,
                tenant_id: item.tenant_id,
                original_event_id: item.original_event_id,
                scheduled_for: next_due,
                transformed_payload: item.transformed_payload,
                target_url: item.target_url,
                recurrence: Some(next_rec),
                cancellation_match_key: item.cancellation_match_key,
                state: ScheduledItemState::Pending,
                attempt_count: 0,
                last_attempt_at: None,
                created_at: now,
            };
            self.store.insert(successor).await?;
        }
        Ok(())
    }

    async fn reschedule(&self, item: ScheduledItem, version: u64, attempt_count: u32) -> Result<(), SchedulerError> {
        let now = Utc::now();
        let delay = backoff::duration(attempt_count);

        let mut retried = item;
        retried.state = ScheduledItemState::Pending;
        retried.attempt_count = attempt_count;
        retried.last_attempt_at = Some(now);
        retried.scheduled_for = now + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::seconds(240));
        let (id, integration_id) = (retried.id, retried.integration_id);
        self.store.update_if(&retried.id, version, retried).await?;
        self.publish_transition(id, integration_id, ScheduledItemState::Pending);
        Ok(())
    }

    async fn finalize(&self, item: ScheduledItem, version: u64, state: ScheduledItemState) -> Result<(), SchedulerError> {
        let mut next = item;
        next.state = state;
        next.last_attempt_at = Some(Utc::now());
        let (id, integration_id) = (next.id, next.integration_id);
        self.store.update_if(&next.id, version, next).await?;
        self.publish_transition(id, integration_id, state);
        Ok(())
    }
}
