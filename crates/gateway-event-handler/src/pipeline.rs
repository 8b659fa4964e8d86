use std::time::Duration;

use gateway_rate_limiter::RateLimitStorage;
use gateway_types::{Event, EventFingerprint, EventId, EventStatus, RawEvent, SourceName};

use crate::context::EventContext;
use crate::handler::{EventHandler, EventHandlerStore};

const UNCAUGHT_ERROR_NACK_DELAY: Duration = Duration::from_millis(60_000);

fn source_label(name: SourceName) -> &'static str {
    match name {
        SourceName::Mysql => "mysql",
        SourceName::Kafka => "kafka",
        SourceName::HttpPush => "http_push",
    }
}

impl<Store, RL> EventHandler<Store, RL>
where
    Store: EventHandlerStore + Send + Sync + 'static,
    RL: RateLimitStorage,
{
    /// Runs the full per-event pipeline (§4.9) for one raw event handed off
    /// by a source adapter: fingerprint/id resolution, tenant resolution,
    /// payload-size guard, audit, dedup, integration matching, process-event
    /// (§4.10), terminal audit, then `ctx.ack()`. Any uncaught error is
    /// turned into an audit `FAILED(WORKER_ERROR)` and `ctx.nack(60s)`
    /// instead of propagating.
    pub async fn handle_event(&self, raw: RawEvent, ctx: &dyn EventContext) {
        let Some(tenant_id) = raw.tenant_id else {
            tracing::warn!(event_type = %raw.event_type, "event carries no resolvable tenant id, skipping");
            ctx.ack().await;
            return;
        };

        let fingerprint = EventFingerprint::compute(&raw.event_type, &raw.payload, &tenant_id.to_string());
        let event_id = raw.id.clone().unwrap_or_else(|| EventId::fallback(source_label(raw.source_name), &fingerprint));

        match self.run(raw, tenant_id, &event_id, fingerprint, ctx).await {
            Ok(()) => {}
            Err(err) => {
                tracing::error!(error = %err, event_id = %event_id, "event handler pipeline failed");
                self.audit.record(&event_id, &tenant_id, "FAILED(WORKER_ERROR)");
                ctx.nack(UNCAUGHT_ERROR_NACK_DELAY).await;
            }
        }
    }

    async fn run(
        &self,
        raw: RawEvent,
        tenant_id: gateway_types::TenantId,
        event_id: &EventId,
        fingerprint: EventFingerprint,
        ctx: &dyn EventContext,
    ) -> Result<(), crate::error::EventHandlerError> {
        // Step 3: oversized payload guard.
        let payload_len = serde_json::to_vec(&raw.payload).map(|bytes| bytes.len()).unwrap_or(0);
        if payload_len > self.config.max_payload_size {
            self.audit.record(event_id, &tenant_id, "SKIPPED(PAYLOAD_TOO_LARGE)");
            ctx.ack().await;
            return Ok(());
        }

        // Step 4: received.
        self.audit.record(event_id, &tenant_id, "RECEIVED");
        // Step 5: processing.
        self.audit.record(event_id, &tenant_id, "PROCESSING");

        // Step 6: dedup.
        if self.dedup.check_and_record(&fingerprint, event_id).await {
            self.audit.record(event_id, &tenant_id, "SKIPPED(DUPLICATE)");
            ctx.ack().await;
            return Ok(());
        }

        // Cancellation/reschedule signal: cancel matching scheduled items
        // and stop here rather than matching delivery integrations.
        if self.config.cancellation.cancellation_event_types.contains(&raw.event_type) {
            if let Some(match_key) = self.config.cancellation.match_key(&raw.payload) {
                let cancelled = self.store.cancel_by_match_key(&tenant_id, &match_key).await?;
                tracing::info!(cancelled, match_key, "cancelled scheduled items by match key");
            }
            self.audit.record(event_id, &tenant_id, "SKIPPED(CANCELLATION_PROCESSED)");
            ctx.ack().await;
            return Ok(());
        }

        // Step 7: integration matching.
        let integrations = self.store.find_active_by_event_type(&tenant_id, &raw.event_type).await?;
        if integrations.is_empty() {
            self.audit.record(event_id, &tenant_id, "SKIPPED(NO_WEBHOOK)");
            ctx.ack().await;
            return Ok(());
        }

        let event = Event {
            id: event_id.clone(),
            event_type: raw.event_type,
            tenant_id,
            payload: raw.payload,
            source_name: raw.source_name,
            source_metadata: raw.source_metadata,
            received_at: raw.received_at,
            attempt_count: 0,
            is_replay: raw.is_replay,
            status: EventStatus::Processing,
        };

        // Step 8: process-event, then terminal audit.
        let summary = self.process_event(&event, &integrations).await?;
        let status = summary.final_status();
        let note = match status {
            EventStatus::Delivered => "DELIVERED".to_string(),
            EventStatus::PartialSuccess => "PARTIAL_SUCCESS".to_string(),
            EventStatus::Failed => "FAILED".to_string(),
            EventStatus::Skipped(reason) => format!("SKIPPED({reason:?})"),
            EventStatus::Received | EventStatus::Processing | EventStatus::Stuck => unreachable!("final_status never returns a non-terminal status"),
        };
        self.audit.record(event_id, &tenant_id, note);
        ctx.ack().await;
        Ok(())
    }
}

