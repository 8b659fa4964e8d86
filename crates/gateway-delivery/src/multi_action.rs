use gateway_store_core::Versioned;
use gateway_transformer::script::evaluate_condition;
use gateway_types::{DeliveryStatus, Event, IntegrationConfig};

use crate::engine::{DeliveryEngine, DeliveryOptions, DeliveryOutcome, DeliveryStore};
use crate::error::DeliveryError;

/// Overall status of a multi-action delivery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiActionStatus {
    /// Every non-skipped action succeeded, and at least one ran.
    Success,
    /// At least one action succeeded and at least one failed.
    PartialSuccess,
    /// Every action's condition evaluated false; none ran.
    Skipped,
    /// No action succeeded (and not every action was skipped).
    Failed,
}

/// Per-action outcome recorded alongside the aggregate result.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Index of the action in `integration.actions`.
    pub index: usize,
    /// `None` when the action's condition evaluated false (skipped before
    /// `deliver_single_action` ran at all).
    pub outcome: Option<DeliveryOutcome>,
}

/// Aggregate result of running every action of a multi-action integration.
#[derive(Debug, Clone)]
pub struct MultiActionResult {
    /// Rolled-up status across all actions.
    pub status: MultiActionStatus,
    /// Per-action results, in action order.
    pub actions: Vec<ActionOutcome>,
}

impl<Store, RL> DeliveryEngine<Store, RL>
where
    Store: DeliveryStore + Send + Sync,
    RL: gateway_rate_limiter::RateLimitStorage,
{
    /// Runs every action of a multi-action integration in order, evaluating
    /// each `action.condition` first (a parse/eval failure counts as
    /// `false`, so the action is skipped rather than erroring the whole
    /// sequence). Sleeps `multi_action_delay_ms` between actions, never
    /// after the last one. Aggregates the per-action outcomes into a single
    /// [`MultiActionStatus`] and updates the shared circuit once for the
    /// whole sequence: a circuit trip is recorded only when the aggregate is
    /// not `SUCCESS`/`SKIPPED`.
    #[tracing::instrument(skip(self, integration, event), fields(integration_id = %integration.value.id, event_id = %event.id))]
    pub async fn deliver_multi_action(
        &self,
        integration: &Versioned<IntegrationConfig>,
        event: &Event,
        attempt_count: u32,
        options: &DeliveryOptions,
    ) -> Result<MultiActionResult, DeliveryError> {
        let cfg = &integration.value;
        let event_type = event.event_type.as_str();
        let org_id = cfg.tenant_id.to_string();

        let mut results = Vec::with_capacity(cfg.actions.len());
        let mut success_count = 0usize;
        let mut failure_count = 0usize;
        let mut skipped_count = 0usize;

        let last_index = cfg.actions.len().saturating_sub(1);
        for (i, action) in cfg.actions.iter().enumerate() {
            let runs = match &action.condition {
                Some(expr) => evaluate_condition(expr, event_type, &org_id, &event.payload),
                None => true,
            };

            if !runs {
                skipped_count += 1;
                results.push(ActionOutcome { index: action.index, outcome: None });
            } else {
                let mut action_options = options.clone();
                action_options.existing_log_id = None;
                let outcome = self.deliver_single_action(integration, Some(action), event, attempt_count, &action_options).await?;
                match outcome.status {
                    DeliveryStatus::Success | DeliveryStatus::Skipped => success_count += 1,
                    _ => failure_count += 1,
                }
                results.push(ActionOutcome { index: action.index, outcome: Some(outcome) });
            }

            if i != last_index && cfg.multi_action_delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(cfg.multi_action_delay_ms)).await;
            }
        }

        let status = if skipped_count == cfg.actions.len() {
            MultiActionStatus::Skipped
        } else if failure_count == 0 && success_count > 0 {
            MultiActionStatus::Success
        } else if success_count > 0 && failure_count > 0 {
            MultiActionStatus::PartialSuccess
        } else {
            MultiActionStatus::Failed
        };

        let breaker = gateway_circuit_breaker::CircuitBreaker::new(self.store.as_ref());
        if matches!(status, MultiActionStatus::Success | MultiActionStatus::Skipped) {
            let _ = breaker.record_success(&cfg.id).await;
        } else {
            let should_trip = results
                .iter()
                .filter_map(|r| r.outcome)
                .any(|o| matches!(o.status, DeliveryStatus::Failed | DeliveryStatus::Abandoned));
            let _ = breaker
                .record_failure(&cfg.id, gateway_circuit_breaker::FailureClass { should_trip_circuit: should_trip }, "multi-action sequence had a failing action")
                .await;
        }

        Ok(MultiActionResult { status, actions: results })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gateway_rate_limiter::RateLimiter;
    use gateway_store_core::Versioned;
    use gateway_store_memory::MemoryStore;
    use gateway_types::{
        Action, ActionKind, AuthBlock, AuthKind, Direction, DeliveryMode, Event, EventId, IntegrationConfig, IntegrationId,
        SimpleMapping, StaticField, TenantId, TraceId, TransformConfig, TransformKind, TransformMode, TriggerType,
    };
    use serde_json::json;

    use super::*;

    fn sample_integration(actions: Vec<Action>) -> IntegrationConfig {
        IntegrationConfig {
            id: IntegrationId::new(),
            tenant_id: TenantId::new(),
            name: "multi-step".to_string(),
            trigger_event_types: vec!["order.created".to_string()],
            direction: Direction::Outbound,
            delivery_mode: DeliveryMode::Immediate,
            target_url: None,
            http_method: "POST".to_string(),
            timeout_ms: 5_000,
            max_retries: 3,
            auth: AuthBlock { kind: AuthKind::None, expiry_marker: None },
            signing_secrets: vec![],
            rate_limit: None,
            actions,
            transform: TransformConfig {
                mode: TransformMode::Simple { mappings: vec![], static_fields: vec![] },
                lookups: vec![],
            },
            response_transform: None,
            active: true,
            multi_action_delay_ms: 0,
            schedule_script: None,
            circuit: Default::default(),
            cached_token: None,
            data_source: None,
            job_schedule: None,
            job_params: serde_json::Value::Null,
            next_run_at: None,
        }
    }

    fn identity_transform() -> TransformConfig {
        TransformConfig {
            mode: TransformMode::Simple {
                mappings: vec![SimpleMapping {
                    source_field: "amount".to_string(),
                    target_field: "amount".to_string(),
                    transform: TransformKind::Identity,
                    default_value: None,
                    lookup_type: None,
                }],
                static_fields: vec![StaticField { key: "marker".to_string(), value: json!("hit") }],
            },
            lookups: vec![],
        }
    }

    fn sample_event(payload: serde_json::Value) -> Event {
        Event {
            id: EventId::from("evt-1"),
            event_type: "order.created".to_string(),
            tenant_id: TenantId::new(),
            payload,
            source_name: gateway_types::SourceName::HttpPush,
            source_metadata: json!({}),
            received_at: chrono::Utc::now(),
            attempt_count: 0,
            is_replay: false,
            status: gateway_types::EventStatus::Processing,
        }
    }

    #[tokio::test]
    async fn all_conditions_false_yields_skipped() {
        let store = Arc::new(MemoryStore::new());
        let action = Action {
            name: "maybe".to_string(),
            index: 0,
            kind: ActionKind::Http { target_url: "https://example.com/hook".to_string(), method: "POST".to_string() },
            transform: Some(identity_transform()),
            auth: None,
            condition: Some("payload.amount > 100000".to_string()),
        };
        let mut cfg = sample_integration(vec![action]);
        let event = sample_event(json!({"amount": 5}));
        cfg.trigger_event_types = vec![event.event_type.clone()];
        store.seed_integration(cfg.clone());
        let versioned = Versioned::new(cfg);

        let limiter = RateLimiter::in_memory();
        let engine = DeliveryEngine::new(store, limiter);
        let options = DeliveryOptions {
            trace_id: TraceId::new(),
            trigger_type: TriggerType::Event,
            existing_log_id: None,
            is_test_event: false,
            force_delivery: false,
        };

        let result = engine.deliver_multi_action(&versioned, &event, 1, &options).await.unwrap();
        assert_eq!(result.status, MultiActionStatus::Skipped);
        assert!(result.actions[0].outcome.is_none());
    }
}
