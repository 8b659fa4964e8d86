//! Two events with an identical fingerprint: the first delivers, the
//! second is suppressed before it ever reaches an integration.

use std::sync::Arc;

use gateway_delivery::DeliveryEngine;
use gateway_event_handler::{EventHandler, RecordingContext};
use gateway_rate_limiter::RateLimiter;
use gateway_store_memory::MemoryStore;
use gateway_types::{EventId, RawEvent, SourceName, TenantId};
use serde_json::json;

#[path = "support.rs"]
mod support;

#[tokio::test]
async fn duplicate_event_is_suppressed_without_a_second_delivery() {
    let store = Arc::new(MemoryStore::new());
    let tenant_id = TenantId::new();
    let integration = support::communication_integration(tenant_id);
    store.seed_integration(integration);

    let channel = Arc::new(support::ScriptedChannel::new(vec![Ok("msg-1".to_string())]));
    let rate_limiter = RateLimiter::in_memory();
    let delivery = DeliveryEngine::new(store.clone(), rate_limiter).with_channels(channel.clone());
    let handler = EventHandler::new(store.clone(), delivery);

    let raw = || RawEvent {
        id: Some(EventId::from("evt-dup")),
        event_type: "order.created".to_string(),
        tenant_id: Some(tenant_id),
        payload: json!({"x": 1}),
        source_name: SourceName::HttpPush,
        source_metadata: json!({}),
        received_at: chrono::Utc::now(),
        is_replay: false,
    };

    let first_ctx = RecordingContext::default();
    handler.handle_event(raw(), &first_ctx).await;
    assert!(first_ctx.was_acked());
    assert_eq!(channel.call_count(), 1);

    let second_ctx = RecordingContext::default();
    handler.handle_event(raw(), &second_ctx).await;
    assert!(second_ctx.was_acked());
    assert_eq!(channel.call_count(), 1, "a duplicate fingerprint must never reach the channel adapter a second time");
}
