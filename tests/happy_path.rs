//! One event, one matching immediate integration, one successful delivery:
//! transform applied, circuit stays closed, nothing dead-lettered.

use std::sync::Arc;

use gateway_delivery::DeliveryEngine;
use gateway_event_handler::{EventHandler, RecordingContext};
use gateway_rate_limiter::RateLimiter;
use gateway_store_core::{DlqStore, IntegrationConfigStore};
use gateway_store_memory::MemoryStore;
use gateway_types::{EventId, RawEvent, SourceName, TenantId};
use serde_json::json;

#[path = "support.rs"]
mod support;

#[tokio::test]
async fn happy_path_delivers_transforms_and_leaves_circuit_closed() {
    let store = Arc::new(MemoryStore::new());
    let tenant_id = TenantId::new();
    let integration = support::communication_integration(tenant_id);
    let integration_id = integration.id;
    store.seed_integration(integration);

    let channel = Arc::new(support::ScriptedChannel::new(vec![Ok("msg-1".to_string())]));
    let rate_limiter = RateLimiter::in_memory();
    let delivery = DeliveryEngine::new(store.clone(), rate_limiter).with_channels(channel.clone());
    let handler = EventHandler::new(store.clone(), delivery);

    let raw = RawEvent {
        id: Some(EventId::from("evt-1")),
        event_type: "order.created".to_string(),
        tenant_id: Some(tenant_id),
        payload: json!({"x": 1}),
        source_name: SourceName::HttpPush,
        source_metadata: json!({}),
        received_at: chrono::Utc::now(),
        is_replay: false,
    };

    let ctx = RecordingContext::default();
    handler.handle_event(raw, &ctx).await;

    assert!(ctx.was_acked());
    assert!(!ctx.was_nacked());

    assert_eq!(channel.call_count(), 1);
    assert_eq!(channel.received()[0], json!({"y": 1, "src": "gw"}));

    let integration = IntegrationConfigStore::get(store.as_ref(), &integration_id).await.unwrap();
    assert_eq!(integration.value.circuit.consecutive_failures, 0);

    let dlq = DlqStore::list_by_tenant(store.as_ref(), &tenant_id).await.unwrap();
    assert!(dlq.is_empty());
}
