use chrono::Utc;
use gateway_circuit_breaker::CircuitBreaker;
use gateway_delivery::{DeliveryOptions, DeliveryOutcome, MultiActionStatus};
use gateway_rate_limiter::RateLimitStorage;
use gateway_store_core::Versioned;
use gateway_transformer::NoLookups;
use gateway_types::{
    DeliveryMode, DeliveryStatus, Event, IntegrationConfig, Recurrence, ScheduledItem,
    ScheduledItemState, TraceId, TriggerType,
};
use uuid::Uuid;

use crate::error::EventHandlerError;
use crate::handler::{EventHandler, EventHandlerStore};
use crate::schedule::{self, ScheduleOutcome};

/// A scheduled item more than this far in the past is considered missed
/// rather than delivered late.
const SCHEDULED_TIME_SLACK: chrono::Duration = chrono::Duration::seconds(60);

/// Rolled-up result of processing every integration matched for one event.
#[derive(Debug, Clone, Default)]
pub struct ProcessEventSummary {
    /// Integrations that delivered (fully, or with every action succeeding
    /// or benignly skipped).
    pub delivered: usize,
    /// Integrations whose delivery was deferred to a scheduled item.
    pub scheduled: usize,
    /// Integrations that failed outright, including a circuit-open skip.
    pub failed: usize,
    /// Integrations skipped for a benign reason (null transform, scheduling
    /// script's due time already passed).
    pub skipped: usize,
    /// Every delivery-log id produced, across all integrations and actions.
    pub log_ids: Vec<Uuid>,
}

impl ProcessEventSummary {
    /// Final status per §4.10: all success/scheduled → `Delivered`;
    /// success-or-scheduled mixed with failures → `PartialSuccess`; else
    /// `Failed`.
    pub fn final_status(&self) -> gateway_types::EventStatus {
        let non_failure = self.delivered + self.scheduled + self.skipped;
        if self.failed == 0 && non_failure > 0 {
            gateway_types::EventStatus::Delivered
        } else if self.failed > 0 && non_failure > 0 {
            gateway_types::EventStatus::PartialSuccess
        } else {
            gateway_types::EventStatus::Failed
        }
    }
}

enum ScheduleResult {
    Scheduled,
    Skipped,
}

impl<Store, RL> EventHandler<Store, RL>
where
    Store: EventHandlerStore + Send + Sync + 'static,
    RL: RateLimitStorage,
{
    /// Runs §4.10 over every integration already matched for `event`:
    /// partitions into immediate vs scheduled, delivers or persists a
    /// scheduled item accordingly, and aggregates the result.
    pub(crate) async fn process_event(
        &self,
        event: &Event,
        integrations: &[Versioned<IntegrationConfig>],
    ) -> Result<ProcessEventSummary, EventHandlerError> {
        let mut summary = ProcessEventSummary::default();
        let trace_id = TraceId::new();

        for integration in integrations {
            let cfg = &integration.value;
            match cfg.delivery_mode {
                DeliveryMode::Immediate => {
                    self.process_immediate(integration, event, trace_id, &mut summary).await?;
                }
                DeliveryMode::Delayed | DeliveryMode::Recurring => match self.schedule_integration(integration, event).await? {
                    ScheduleResult::Scheduled => summary.scheduled += 1,
                    ScheduleResult::Skipped => summary.skipped += 1,
                },
                // Driven by the scheduled-job worker's own cron/interval,
                // never by an incoming event.
                DeliveryMode::ScheduledJob => summary.skipped += 1,
            }
        }

        Ok(summary)
    }

    async fn process_immediate(
        &self,
        integration: &Versioned<IntegrationConfig>,
        event: &Event,
        trace_id: TraceId,
        summary: &mut ProcessEventSummary,
    ) -> Result<(), EventHandlerError> {
        let cfg = &integration.value;

        let breaker = CircuitBreaker::new(self.store.as_ref());
        if breaker.check(&cfg.id).await?.is_open {
            summary.failed += 1;
            return Ok(());
        }

        let options = DeliveryOptions {
            trace_id,
            trigger_type: TriggerType::Event,
            existing_log_id: None,
            is_test_event: false,
            force_delivery: false,
        };
        let attempt_count = event.attempt_count + 1;

        if cfg.is_multi_action() {
            let result = self.delivery.deliver_multi_action(integration, event, attempt_count, &options).await?;
            summary.log_ids.extend(result.actions.iter().filter_map(|a| a.outcome.map(|o: DeliveryOutcome| o.log_id)));
            match result.status {
                MultiActionStatus::Success => summary.delivered += 1,
                MultiActionStatus::PartialSuccess => {
                    summary.delivered += 1;
                    summary.failed += 1;
                }
                MultiActionStatus::Skipped => summary.skipped += 1,
                MultiActionStatus::Failed => summary.failed += 1,
            }
        } else {
            let outcome = self.delivery.deliver_single_action(integration, None, event, attempt_count, &options).await?;
            summary.log_ids.push(outcome.log_id);
            match outcome.status {
                DeliveryStatus::Success => summary.delivered += 1,
                DeliveryStatus::Skipped => summary.skipped += 1,
                DeliveryStatus::Failed | DeliveryStatus::Retrying | DeliveryStatus::Abandoned => summary.failed += 1,
            }
        }
        Ok(())
    }

    async fn schedule_integration(&self, integration: &Versioned<IntegrationConfig>, event: &Event) -> Result<ScheduleResult, EventHandlerError> {
        let cfg = &integration.value;

        let Some(transformed) = self.transformer.transform(&cfg.transform, &event.payload, &NoLookups).await? else {
            return Ok(ScheduleResult::Skipped);
        };

        let script = cfg
            .schedule_script
            .as_deref()
            .ok_or_else(|| EventHandlerError::Schedule(format!("integration {} is {:?} but has no schedule_script", cfg.id, cfg.delivery_mode)))?;
        let recurring = matches!(cfg.delivery_mode, DeliveryMode::Recurring);
        let outcome = schedule::run(script, &transformed, recurring, self.http_client.clone(), gateway_transformer::DEFAULT_SCRIPT_TIMEOUT).await?;

        let (scheduled_for, recurrence) = match outcome {
            ScheduleOutcome::Delayed(due) => (due, None),
            ScheduleOutcome::Recurring { first_occurrence, interval_ms, until, count } => {
                (first_occurrence, Some(Recurrence { interval_ms, until, count, occurrence_number: 1 }))
            }
        };

        if Utc::now() - scheduled_for > SCHEDULED_TIME_SLACK {
            return Ok(ScheduleResult::Skipped);
        }

        let target_url = cfg
            .target_url
            .clone()
            .ok_or_else(|| EventHandlerError::Schedule(format!("integration {} is scheduled but has no target_url", cfg.id)))?;

        let item = ScheduledItem {
            id: Uuid::new_v4(),
            integration_id: cfg.id,
            tenant_id: cfg.tenant_id,
            original_event_id: event.id.clone(),
            scheduled_for,
            transformed_payload: transformed,
            target_url,
            recurrence,
            cancellation_match_key: self.config.cancellation.match_key(&event.payload),
            state: ScheduledItemState::Pending,
            attempt_count: 0,
            last_attempt_at: None,
            created_at: Utc::now(),
        };
        self.store.insert(item).await?;
        Ok(ScheduleResult::Scheduled)
    }
}
