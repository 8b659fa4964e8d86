#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-adapters** – one source-adapter instance per tenant
//! (table-poll, stream-consumer, HTTP-push), reconciled against the
//! store's per-tenant and default source configs every two minutes.

mod adapter;
mod config_resolution;
mod error;
mod http_push;
mod identifier;
mod loop_control;
mod manager;
mod sink;
mod stream_consumer;
mod table_poll;

pub use adapter::SourceAdapter;
pub use error::AdapterError;
pub use http_push::HttpPushAdapter;
pub use identifier::{quote_identifier, validate_identifier};
pub use manager::{AdapterManagerStore, SourceAdapterManager, RECONCILE_INTERVAL};
pub use sink::EventSink;
pub use stream_consumer::{NoStreamBroker, StreamBroker, StreamConsumerAdapter, StreamMessage};
pub use table_poll::TablePollAdapter;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gateway_event_handler::EventHandler;
    use gateway_rate_limiter::RateLimiter;
    use gateway_store_memory::MemoryStore;
    use gateway_types::{
        Action, AuthBlock, AuthKind, CircuitState, DeliveryMode, Direction, HttpPushConfig,
        IntegrationConfig, IntegrationId, SourceConfig, TenantId, TransformConfig, TransformMode,
    };

    use super::*;

    fn sink(store: Arc<MemoryStore>) -> Arc<dyn EventSink> {
        let rate_limiter = RateLimiter::in_memory();
        let delivery = gateway_delivery::DeliveryEngine::new(store.clone(), rate_limiter);
        Arc::new(EventHandler::new(store, delivery))
    }

    fn seed_one_integration(store: &MemoryStore, tenant_id: TenantId) {
        store.seed_integration(IntegrationConfig {
            id: IntegrationId::new(),
            tenant_id,
            name: "test".to_string(),
            trigger_event_types: vec!["order.created".to_string()],
            direction: Direction::Outbound,
            delivery_mode: DeliveryMode::Immediate,
            target_url: Some("https://example.com/hook".to_string()),
            http_method: "POST".to_string(),
            timeout_ms: 5_000,
            max_retries: 1,
            auth: AuthBlock { kind: AuthKind::None, expiry_marker: None },
            signing_secrets: vec![],
            rate_limit: None,
            actions: Vec::<Action>::new(),
            transform: TransformConfig { mode: TransformMode::Simple { mappings: vec![], static_fields: vec![] }, lookups: vec![] },
            response_transform: None,
            active: true,
            multi_action_delay_ms: 0,
            schedule_script: None,
            circuit: CircuitState::default(),
            cached_token: None,
            data_source: None,
            job_schedule: None,
            job_params: serde_json::Value::Null,
            next_run_at: None,
        });
    }

    #[tokio::test]
    async fn reconcile_starts_and_removes_adapters_on_config_change() {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = TenantId::new();
        seed_one_integration(&store, tenant_id);
        let sink = sink(store.clone());
        let manager = Arc::new(SourceAdapterManager::new(store.clone(), sink));

        store.seed_default_source_config(serde_json::to_value(SourceConfig::HttpPush(HttpPushConfig { path: "/ingest/default".to_string() })).unwrap());

        manager.reconcile().await.unwrap();
        assert_eq!(manager.running_count(), 1);

        // Same config, second pass should be a no-op restart-wise.
        manager.reconcile().await.unwrap();
        assert_eq!(manager.running_count(), 1);
    }

    #[tokio::test]
    async fn manager_finds_running_http_push_adapter_by_path() {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = TenantId::new();
        seed_one_integration(&store, tenant_id);
        let sink = sink(store.clone());
        let manager = Arc::new(SourceAdapterManager::new(store.clone(), sink));

        store.seed_default_source_config(
            serde_json::to_value(SourceConfig::HttpPush(HttpPushConfig { path: "/ingest/default".to_string() })).unwrap(),
        );
        manager.reconcile().await.unwrap();

        assert!(manager.find_http_push("/ingest/default").is_some());
        assert!(manager.find_http_push("/ingest/missing").is_none());
    }

    #[tokio::test]
    async fn http_push_adapter_forwards_accepted_pushes_to_the_sink() {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = TenantId::new();
        let sink = sink(store);
        let adapter = HttpPushAdapter::new(tenant_id, HttpPushConfig { path: "/ingest/foo".to_string() });
        adapter.start(sink).await.unwrap();
        adapter.accept("order.created".to_string(), serde_json::json!({"x": 1}), serde_json::json!({})).await;
    }
}
