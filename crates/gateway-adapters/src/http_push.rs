use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gateway_event_handler::EventContext;
use gateway_types::{HttpPushConfig, RawEvent, SourceName, TenantId};
use tokio::sync::RwLock;

use crate::adapter::SourceAdapter;
use crate::error::AdapterError;
use crate::sink::EventSink;

struct PushContext;

#[async_trait]
impl EventContext for PushContext {
    async fn ack(&self) {}

    async fn nack(&self, delay: Duration) {
        tracing::warn!(?delay, "http-push event nacked, caller already received a 200");
    }
}

/// Passive adapter: has no loop of its own. The HTTP ingress server (owned
/// by the runtime crate) looks an adapter up by `config.path` and calls
/// [`Self::accept`] directly for each inbound POST.
pub struct HttpPushAdapter {
    tenant_id: TenantId,
    config: HttpPushConfig,
    sink: RwLock<Option<Arc<dyn EventSink>>>,
}

impl HttpPushAdapter {
    /// Builds an adapter bound to `config.path` for `tenant_id`.
    pub fn new(tenant_id: TenantId, config: HttpPushConfig) -> Self {
        Self { tenant_id, config, sink: RwLock::new(None) }
    }

    /// The endpoint path this adapter accepts pushes on.
    pub fn path(&self) -> &str {
        &self.config.path
    }

    /// Normalizes one inbound POST body into a [`RawEvent`] and hands it to
    /// the bound sink. No-ops if `start` hasn't been called yet.
    pub async fn accept(&self, event_type: String, payload: serde_json::Value, headers: serde_json::Value) {
        let Some(sink) = self.sink.read().await.clone() else {
            tracing::warn!(path = %self.config.path, "http-push adapter received a push before start()");
            return;
        };
        let raw = RawEvent {
            id: None,
            event_type,
            tenant_id: Some(self.tenant_id),
            payload,
            source_name: SourceName::HttpPush,
            source_metadata: headers,
            received_at: Utc::now(),
            is_replay: false,
        };
        sink.handle_event(raw, &PushContext).await;
    }
}

#[async_trait]
impl SourceAdapter for HttpPushAdapter {
    fn name(&self) -> &str {
        "http_push"
    }

    async fn start(&self, sink: Arc<dyn EventSink>) -> Result<(), AdapterError> {
        *self.sink.write().await = Some(sink);
        Ok(())
    }

    async fn stop(&self) {
        *self.sink.write().await = None;
    }

    fn http_push_path(&self) -> Option<&str> {
        Some(&self.config.path)
    }

    async fn accept_push(&self, event_type: String, payload: serde_json::Value, headers: serde_json::Value) {
        self.accept(event_type, payload, headers).await
    }
}
