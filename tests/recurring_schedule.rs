//! RECURRING scheduling persists a pending item rather than delivering
//! immediately, and a matching cancellation event cancels it before it is
//! ever claimed.
//!
//! `SchedulerWorker::tick` always delivers over the guarded HTTP transport,
//! so these scenarios stop at the store: scheduling, claiming, and
//! cancellation, never an actual dial-out.

use std::collections::BTreeSet;
use std::sync::Arc;

use gateway_delivery::DeliveryEngine;
use gateway_event_handler::{CancellationConfig, EventHandler, EventHandlerConfig, RecordingContext};
use gateway_rate_limiter::RateLimiter;
use gateway_store_core::ScheduledItemStore;
use gateway_store_memory::MemoryStore;
use gateway_types::{EventId, RawEvent, SourceName, TenantId};
use serde_json::json;

#[path = "support.rs"]
mod support;

const SCHEDULE_SCRIPT: &str = r#"#{ firstOccurrence: epoch() * 1000, interval: 60000, count: 3 }"#;

fn handler_with_cancellation(store: Arc<MemoryStore>) -> EventHandler<MemoryStore, gateway_rate_limiter::InMemoryRateLimitStorage> {
    let channel = Arc::new(support::ScriptedChannel::new(vec![]));
    let delivery = DeliveryEngine::new(store.clone(), RateLimiter::in_memory()).with_channels(channel);
    let mut cancellation_event_types = BTreeSet::new();
    cancellation_event_types.insert("order.cancelled".to_string());
    let config = EventHandlerConfig {
        cancellation: CancellationConfig { cancellation_event_types, match_key_path: "orderId".to_string() },
        ..EventHandlerConfig::default()
    };
    EventHandler::with_config(store, delivery, config)
}

#[tokio::test]
async fn recurring_event_persists_a_claimable_first_occurrence() {
    let store = Arc::new(MemoryStore::new());
    let tenant_id = TenantId::new();
    let integration = support::recurring_integration(tenant_id, SCHEDULE_SCRIPT, "https://127.0.0.1:9/hook");
    store.seed_integration(integration);
    let handler = handler_with_cancellation(store.clone());

    let raw = RawEvent {
        id: Some(EventId::from("evt-recur")),
        event_type: "order.created".to_string(),
        tenant_id: Some(tenant_id),
        payload: json!({"x": 1, "orderId": "order-1"}),
        source_name: SourceName::HttpPush,
        source_metadata: json!({}),
        received_at: chrono::Utc::now(),
        is_replay: false,
    };

    let ctx = RecordingContext::default();
    handler.handle_event(raw, &ctx).await;
    assert!(ctx.was_acked());

    let claimed = store.claim_due_batch(chrono::Utc::now(), 10).await.unwrap();
    assert_eq!(claimed.len(), 1);
    let item = &claimed[0].value;
    let recurrence = item.recurrence.as_ref().expect("a RECURRING integration always persists recurrence details");
    assert_eq!(recurrence.occurrence_number, 1);
    assert_eq!(recurrence.count, Some(3));

    let sent_item = gateway_types::ScheduledItem { state: gateway_types::ScheduledItemState::Sent, ..item.clone() };
    let next = sent_item.next_occurrence(chrono::Utc::now()).expect("occurrence 1 of 3 has successors");
    assert_eq!(next.occurrence_number, 2);
}

#[tokio::test]
async fn cancellation_event_cancels_the_pending_item_before_it_is_claimed() {
    let store = Arc::new(MemoryStore::new());
    let tenant_id = TenantId::new();
    let integration = support::recurring_integration(tenant_id, SCHEDULE_SCRIPT, "https://127.0.0.1:9/hook");
    store.seed_integration(integration);
    let handler = handler_with_cancellation(store.clone());

    let payload = json!({"x": 1, "orderId": "order-2"});

    let schedule_raw = RawEvent {
        id: Some(EventId::from("evt-recur-2")),
        event_type: "order.created".to_string(),
        tenant_id: Some(tenant_id),
        payload: payload.clone(),
        source_name: SourceName::HttpPush,
        source_metadata: json!({}),
        received_at: chrono::Utc::now(),
        is_replay: false,
    };
    let ctx = RecordingContext::default();
    handler.handle_event(schedule_raw, &ctx).await;
    assert!(ctx.was_acked());

    let cancel_raw = RawEvent {
        id: Some(EventId::from("evt-cancel-2")),
        event_type: "order.cancelled".to_string(),
        tenant_id: Some(tenant_id),
        payload,
        source_name: SourceName::HttpPush,
        source_metadata: json!({}),
        received_at: chrono::Utc::now(),
        is_replay: false,
    };
    let cancel_ctx = RecordingContext::default();
    handler.handle_event(cancel_raw, &cancel_ctx).await;
    assert!(cancel_ctx.was_acked());

    let claimed = store.claim_due_batch(chrono::Utc::now(), 10).await.unwrap();
    assert!(claimed.is_empty(), "the cancelled item must never become claimable");
}
