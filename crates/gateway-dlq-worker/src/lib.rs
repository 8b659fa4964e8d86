#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-dlq-worker** – cron-cadence retry of entries in the dead-letter
//! queue (§4.14), with a standing placeholder for the inbound direction.

mod error;
mod worker;

pub use error::DlqWorkerError;
pub use worker::{DlqWorker, DlqWorkerConfig};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use gateway_delivery::DeliveryEngine;
    use gateway_rate_limiter::RateLimiter;
    use gateway_store_core::DlqStore;
    use gateway_store_memory::MemoryStore;
    use gateway_types::{
        AuthBlock, AuthKind, CircuitState, DeliveryErrorCode, Direction, DeliveryMode, DlqEntry,
        DlqError, DlqStatus, IntegrationConfig, IntegrationId, SimpleMapping, TenantId, TraceId,
        TransformConfig, TransformKind, TransformMode,
    };
    use serde_json::json;

    use super::*;

    fn sample_integration(target_url: Option<&str>, active: bool, max_retries: u32) -> IntegrationConfig {
        IntegrationConfig {
            id: IntegrationId::new(),
            tenant_id: TenantId::new(),
            name: "test".to_string(),
            trigger_event_types: vec!["order.created".to_string()],
            direction: Direction::Outbound,
            delivery_mode: DeliveryMode::Immediate,
            target_url: target_url.map(|s| s.to_string()),
            http_method: "POST".to_string(),
            timeout_ms: 5_000,
            max_retries,
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
            schedule_script: None,
            circuit: CircuitState::default(),
            cached_token: None,
            data_source: None,
            job_schedule: None,
            job_params: serde_json::Value::Null,
            next_run_at: None,
        }
    }

    fn sample_entry(integration_id: IntegrationId, tenant_id: TenantId, direction: Direction, retry_count: u32, max_retries: u32) -> DlqEntry {
        DlqEntry {
            id: uuid::Uuid::new_v4(),
            trace_id: TraceId::new(),
            integration_id,
            tenant_id,
            direction,
            payload: json!({"amount": 5}),
            error: DlqError {
                message: "server error".to_string(),
                code: DeliveryErrorCode::ServerError,
                status_code: Some(500),
            },
            retry_count,
            max_retries,
            next_retry_at: Utc::now() - chrono::Duration::seconds(5),
            status: DlqStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn worker(store: Arc<MemoryStore>) -> DlqWorker<MemoryStore, gateway_rate_limiter::InMemoryRateLimitStorage> {
        let rate_limiter = RateLimiter::in_memory();
        let delivery = Arc::new(DeliveryEngine::new(store.clone(), rate_limiter));
        DlqWorker::new(store, delivery)
    }

    #[tokio::test]
    async fn missing_integration_reschedules_with_backoff() {
        let store = Arc::new(MemoryStore::new());
        let entry = sample_entry(IntegrationId::new(), TenantId::new(), Direction::Outbound, 0, 3);
        let entry_id = entry.id;
        store.insert(entry).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        let due = store.claim_due_batch(Utc::now() + chrono::Duration::minutes(1), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, entry_id);
        assert_eq!(due[0].status, DlqStatus::Retrying);
    }

    #[tokio::test]
    async fn inactive_integration_reschedules_rather_than_retries() {
        let store = Arc::new(MemoryStore::new());
        let cfg = sample_integration(Some("https://example.com/hook"), false, 3);
        store.seed_integration(cfg.clone());
        let entry = sample_entry(cfg.id, cfg.tenant_id, Direction::Outbound, 0, 3);
        store.insert(entry).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        let due = store.claim_due_batch(Utc::now() + chrono::Duration::minutes(1), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].retry_count, 1);
    }

    #[tokio::test]
    async fn exceeding_max_retries_abandons_the_entry() {
        let store = Arc::new(MemoryStore::new());
        let cfg = sample_integration(Some("ftp://example.com/hook"), true, 1);
        store.seed_integration(cfg.clone());
        let entry = sample_entry(cfg.id, cfg.tenant_id, Direction::Outbound, 0, 1);
        store.insert(entry).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        // One attempt already consumed the retry budget (max_retries = 1),
        // so the entry must not be claimable for a further attempt.
        let due = store.claim_due_batch(Utc::now() + chrono::Duration::minutes(1), 10).await.unwrap();
        assert!(due.is_empty());
    }

    #[tokio::test]
    async fn inbound_direction_is_a_placeholder_that_always_fails() {
        let store = Arc::new(MemoryStore::new());
        let entry = sample_entry(IntegrationId::new(), TenantId::new(), Direction::Inbound, 0, 3);
        let entry_id = entry.id;
        store.insert(entry).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        let due = store.claim_due_batch(Utc::now() + chrono::Duration::minutes(1), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, entry_id);
        assert_eq!(due[0].retry_count, 1);
    }

    #[tokio::test]
    async fn invalid_target_url_reschedules_without_a_network_call() {
        let store = Arc::new(MemoryStore::new());
        let cfg = sample_integration(Some("ftp://example.com/hook"), true, 5);
        store.seed_integration(cfg.clone());
        let entry = sample_entry(cfg.id, cfg.tenant_id, Direction::Outbound, 0, 5);
        store.insert(entry).await.unwrap();

        worker(store.clone()).tick().await.unwrap();

        let due = store.claim_due_batch(Utc::now() + chrono::Duration::minutes(1), 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].retry_count, 1);
    }
}
