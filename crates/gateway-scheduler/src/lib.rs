#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-scheduler** – claims due [`gateway_types::ScheduledItem`]s and
//! drives their delivery, handling recurrence and retry backoff (§4.12).

mod backoff;
mod error;
mod scheduler;

pub use backoff::base_seconds as backoff_base_seconds;
pub use error::SchedulerError;
pub use scheduler::{SchedulerConfig, SchedulerStore, SchedulerWorker};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use gateway_delivery::DeliveryEngine;
    use gateway_rate_limiter::RateLimiter;
    use gateway_store_core::{ScheduledItemStore, Versioned};
    use gateway_store_memory::MemoryStore;
    use gateway_types::{
        AuthBlock, AuthKind, CircuitBreakerState, CircuitState, Direction, DeliveryMode, EventId,
        IntegrationConfig, IntegrationId, ScheduledItem, ScheduledItemState, SimpleMapping,
        TenantId, TransformConfig, TransformKind, TransformMode,
    };
    use serde_json::json;

    use super::*;

    fn sample_integration(target_url: Option<&str>, active: bool) -> IntegrationConfig {
        IntegrationConfig {
            id: IntegrationId::new(),
            tenant_id: TenantId::new(),
            name: "test".to_string(),
            trigger_event_types: vec!["order.created".to_string()],
            direction: Direction::Outbound,
            delivery_mode: DeliveryMode::Delayed,
            target_url: target_url.map(|s| s.to_string()),
            http_method: "POST".to_string(),
            timeout_ms: 5_000,
            max_retries: 3,
            auth: AuthBlock { kind: AuthKind::None, expiry_marker: None },
            signing_secrets: vec![],
            rate_limit: None,
            actions: vec![],
            transform: TransformConfig {
                mode: TransformMode::Simple {
                    mappings: vec![SimpleMapping {
                        source_field: "amount".to_string(),
                        target_field: "amount".to_string(),
                        transform: TransformKind::Identity,
                        default_value: None,
                        lookup_type: None,
                    }],
                    static_fields: vec![],
                },
                lookups: vec![],
            },
            response_transform: None,
            active,
            multi_action_delay_ms: 0,
            schedule_script: Some("due_in(0)".to_string()),
            circuit: CircuitState::default(),
            cached_token: None,
            data_source: None,
            job_schedule: None,
            job_params: serde_json::Value::Null,
            next_run_at: None,
        }
    }

    fn sample_item(integration_id: IntegrationId, tenant_id: TenantId) -> ScheduledItem {
        ScheduledItem {
            id: uuid::Uuid::new_v4(),
            integration_id,
            tenant_id,
            original_event_id: EventId::from("evt-1"),
            scheduled_for: Utc::now() - chrono::Duration::seconds(5),
            transformed_payload: json!({"amount": 5}),
            target_url: "https://example.com/hook".to_string(),
            recurrence: None,
            cancellation_match_key: None,
            state: ScheduledItemState::Pending,
            attempt_count: 0,
            last_attempt_at: None,
            created_at: Utc::now(),
        }
    }

    fn worker(store: Arc<MemoryStore>) -> SchedulerWorker<MemoryStore, gateway_rate_limiter::InMemoryRateLimitStorage> {
        let rate_limiter = RateLimiter::in_memory();
        let delivery = Arc::new(DeliveryEngine::new(store.clone(), rate_limiter));
        SchedulerWorker::new(store, delivery)
    }

    #[tokio::test]
    async fn missing_integration_finalizes_the_item_as_failed() {
        let store = Arc::new(MemoryStore::new());
        let item = sample_item(IntegrationId::new(), TenantId::new());
        store.insert(item.clone()).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        let claimed = store.claim_due_batch(Utc::now(), 10).await.unwrap();
        assert!(claimed.is_empty(), "already-finalized item must not be claimable again");
    }

    #[tokio::test]
    async fn inactive_integration_cancels_the_scheduled_item() {
        let store = Arc::new(MemoryStore::new());
        let cfg = sample_integration(Some("https://example.com/hook"), false);
        store.seed_integration(cfg.clone());
        let item = sample_item(cfg.id, cfg.tenant_id);
        store.insert(item.clone()).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        let remaining = store.claim_due_batch(Utc::now(), 10).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn open_circuit_fails_the_item_without_a_delivery_attempt() {
        let store = Arc::new(MemoryStore::new());
        let mut cfg = sample_integration(Some("https://example.com/hook"), true);
        cfg.circuit = CircuitState {
            state: CircuitBreakerState::Open,
            consecutive_failures: 5,
            opened_at: Some(Utc::now()),
            reason: Some("prior failures".to_string()),
            cooldown_until: Some(Utc::now() + chrono::Duration::hours(1)),
        };
        store.seed_integration(cfg.clone());
        let item = sample_item(cfg.id, cfg.tenant_id);
        store.insert(item.clone()).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        let remaining = store.claim_due_batch(Utc::now(), 10).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn invalid_target_url_fails_the_item_without_a_network_call() {
        let store = Arc::new(MemoryStore::new());
        let cfg = sample_integration(Some("ftp://example.com/hook"), true);
        store.seed_integration(cfg.clone());
        let item = sample_item(cfg.id, cfg.tenant_id);
        store.insert(item.clone()).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        let remaining = store.claim_due_batch(Utc::now(), 10).await.unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn finalized_item_publishes_a_transition_to_the_bus_when_configured() {
        let store = Arc::new(MemoryStore::new());
        let cfg = sample_integration(Some("ftp://example.com/hook"), true);
        store.seed_integration(cfg.clone());
        let item = sample_item(cfg.id, cfg.tenant_id);
        store.insert(item.clone()).await.unwrap();

        let bus = Arc::new(gateway_bus_core::GatewayBus::default());
        let mut rx = bus.subscribe();
        worker(store.clone()).with_bus(bus).tick().await.unwrap();

        let published = rx.recv().await.expect("bus should have received a notification");
        match published {
            gateway_bus_core::GatewayEvent::ScheduledItemTransitioned { to, integration_id, .. } => {
                assert_eq!(to, ScheduledItemState::Failed);
                assert_eq!(integration_id, cfg.id);
            }
            other => panic!("unexpected event on bus: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reset_stuck_processing_items_makes_them_claimable_again() {
        let store = Arc::new(MemoryStore::new());
        let cfg = sample_integration(Some("ftp://example.com/hook"), true);
        store.seed_integration(cfg.clone());
        let mut item = sample_item(cfg.id, cfg.tenant_id);
        item.state = ScheduledItemState::Processing;
        item.last_attempt_at = Some(Utc::now() - chrono::Duration::minutes(30));
        store.insert(item).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        // The stuck item was reset to pending, claimed, and then failed on
        // the invalid target URL within the same tick.
        let remaining = store.claim_due_batch(Utc::now(), 10).await.unwrap();
        assert!(remaining.is_empty());
    }
}
