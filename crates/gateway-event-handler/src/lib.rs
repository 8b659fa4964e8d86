#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-event-handler** – the per-event ingest pipeline: fingerprint
//! and id resolution, tenant resolution, payload-size guard, audit,
//! deduplication, integration matching, and the process-event fan-out that
//! calls into `gateway-delivery` for immediate integrations or persists a
//! scheduled item for delayed/recurring ones.

mod audit;
mod config;
mod context;
mod error;
mod handler;
mod pipeline;
mod process_event;
mod schedule;

pub use audit::{AuditWriter, DEFAULT_CHANNEL_CAPACITY};
pub use config::{CancellationConfig, EventHandlerConfig, DEFAULT_MAX_PAYLOAD_SIZE};
pub use context::{EventContext, RecordingContext};
pub use error::EventHandlerError;
pub use handler::{EventHandler, EventHandlerStore};
pub use process_event::ProcessEventSummary;
pub use schedule::ScheduleOutcome;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gateway_rate_limiter::RateLimiter;
    use gateway_store_memory::MemoryStore;
    use gateway_types::{
        Action, ActionKind, AuthBlock, AuthKind, CircuitState, DeliveryMode, Direction,
        IntegrationConfig, IntegrationId, RawEvent, SimpleMapping, SourceName, StaticField,
        TenantId, TransformConfig, TransformKind, TransformMode,
    };
    use serde_json::json;

    use super::*;

    fn immediate_integration(tenant_id: TenantId, target_url: &str) -> IntegrationConfig {
        IntegrationConfig {
            id: IntegrationId::new(),
            tenant_id,
            name: "test".to_string(),
            trigger_event_types: vec!["order.created".to_string()],
            direction: Direction::Outbound,
            delivery_mode: DeliveryMode::Immediate,
            target_url: Some(target_url.to_string()),
            http_method: "POST".to_string(),
            timeout_ms: 5_000,
            max_retries: 1,
            auth: AuthBlock { kind: AuthKind::None, expiry_marker: None },
            signing_secrets: vec![],
            rate_limit: None,
            actions: Vec::<Action>::new(),
            transform: TransformConfig {
                mode: TransformMode::Simple {
                    mappings: vec![SimpleMapping {
                        source_field: "amount".to_string(),
                        target_field: "amount".to_string(),
                        transform: TransformKind::Identity,
                        default_value: None,
                        lookup_type: None,
                    }],
                    static_fields: vec![StaticField { key: "source".to_string(), value: json!("gateway") }],
                },
                lookups: vec![],
            },
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
        }
    }

    fn handler_over(store: Arc<MemoryStore>) -> EventHandler<MemoryStore, gateway_rate_limiter::InMemoryRateLimitStorage> {
        let rate_limiter = RateLimiter::in_memory();
        let delivery = gateway_delivery::DeliveryEngine::new(store.clone(), rate_limiter);
        EventHandler::new(store, delivery)
    }

    #[tokio::test]
    async fn missing_tenant_id_is_acked_without_a_store_call() {
        let store = Arc::new(MemoryStore::new());
        let handler = handler_over(store);
        let ctx = RecordingContext::default();

        let raw = RawEvent {
            id: None,
            event_type: "order.created".to_string(),
            tenant_id: None,
            payload: json!({"amount": 5}),
            source_name: SourceName::HttpPush,
            source_metadata: json!({}),
            received_at: chrono::Utc::now(),
            is_replay: false,
        };
        handler.handle_event(raw, &ctx).await;
        assert!(ctx.was_acked());
        assert!(!ctx.was_nacked());
    }

    #[tokio::test]
    async fn no_matching_integration_skips_and_acks() {
        let store = Arc::new(MemoryStore::new());
        let handler = handler_over(store);
        let ctx = RecordingContext::default();

        let raw = RawEvent {
            id: Some(gateway_types::EventId::from("evt-1")),
            event_type: "order.created".to_string(),
            tenant_id: Some(TenantId::new()),
            payload: json!({"amount": 5}),
            source_name: SourceName::HttpPush,
            source_metadata: json!({}),
            received_at: chrono::Utc::now(),
            is_replay: false,
        };
        handler.handle_event(raw, &ctx).await;
        assert!(ctx.was_acked());
    }

    #[tokio::test]
    async fn oversized_payload_is_skipped_before_any_dedup_or_match() {
        let store = Arc::new(MemoryStore::new());
        let mut config = EventHandlerConfig::default();
        config.max_payload_size = 32;
        let rate_limiter = RateLimiter::in_memory();
        let delivery = gateway_delivery::DeliveryEngine::new(store.clone(), rate_limiter);
        let handler = EventHandler::with_config(store, delivery, config);
        let ctx = RecordingContext::default();

        let raw = RawEvent {
            id: Some(gateway_types::EventId::from("evt-1")),
            event_type: "order.created".to_string(),
            tenant_id: Some(TenantId::new()),
            payload: json!({"amount": "x".repeat(1000)}),
            source_name: SourceName::HttpPush,
            source_metadata: json!({}),
            received_at: chrono::Utc::now(),
            is_replay: false,
        };
        handler.handle_event(raw, &ctx).await;
        assert!(ctx.was_acked());
    }

    #[tokio::test]
    async fn matched_immediate_integration_delivers_and_acks() {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = TenantId::new();
        store.seed_integration(immediate_integration(tenant_id, "https://example.com/hook"));
        let handler = handler_over(store);
        let ctx = RecordingContext::default();

        let raw = RawEvent {
            id: Some(gateway_types::EventId::from("evt-1")),
            event_type: "order.created".to_string(),
            tenant_id: Some(tenant_id),
            payload: json!({"amount": 5}),
            source_name: SourceName::HttpPush,
            source_metadata: json!({}),
            received_at: chrono::Utc::now(),
            is_replay: false,
        };
        handler.handle_event(raw, &ctx).await;
        assert!(ctx.was_acked());
        assert!(!ctx.was_nacked());
    }

    #[tokio::test]
    async fn duplicate_event_is_skipped_on_second_delivery() {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = TenantId::new();
        store.seed_integration(immediate_integration(tenant_id, "https://example.com/hook"));
        let handler = handler_over(store);

        let raw = || RawEvent {
            id: Some(gateway_types::EventId::from("evt-dup")),
            event_type: "order.created".to_string(),
            tenant_id: Some(tenant_id),
            payload: json!({"amount": 5}),
            source_name: SourceName::HttpPush,
            source_metadata: json!({}),
            received_at: chrono::Utc::now(),
            is_replay: false,
        };

        let first_ctx = RecordingContext::default();
        handler.handle_event(raw(), &first_ctx).await;
        assert!(first_ctx.was_acked());

        let second_ctx = RecordingContext::default();
        handler.handle_event(raw(), &second_ctx).await;
        assert!(second_ctx.was_acked());
    }

    #[tokio::test]
    async fn cancellation_event_cancels_scheduled_items_and_skips_matching() {
        let store = Arc::new(MemoryStore::new());
        let tenant_id = TenantId::new();
        let mut config = EventHandlerConfig::default();
        config.cancellation.cancellation_event_types.insert("order.cancelled".to_string());
        config.cancellation.match_key_path = "orderId".to_string();

        let rate_limiter = RateLimiter::in_memory();
        let delivery = gateway_delivery::DeliveryEngine::new(store.clone(), rate_limiter);
        let handler = EventHandler::with_config(store.clone(), delivery, config);
        let ctx = RecordingContext::default();

        let raw = RawEvent {
            id: Some(gateway_types::EventId::from("evt-cancel")),
            event_type: "order.cancelled".to_string(),
            tenant_id: Some(tenant_id),
            payload: json!({"orderId": "ord-1"}),
            source_name: SourceName::HttpPush,
            source_metadata: json!({}),
            received_at: chrono::Utc::now(),
            is_replay: false,
        };
        handler.handle_event(raw, &ctx).await;
        assert!(ctx.was_acked());
    }
}
