use gateway_store_core::EventAuditStore;
use gateway_types::{EventId, TenantId};
use tokio::sync::mpsc;

/// Default channel depth before audit writes start dropping instead of
/// blocking the pipeline.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

struct AuditMessage {
    event_id: EventId,
    tenant_id: TenantId,
    note: String,
}

/// Fire-and-forget audit sink. Cloning is cheap; every clone shares the same
/// bounded channel and consumer task.
#[derive(Clone)]
pub struct AuditWriter {
    tx: mpsc::Sender<AuditMessage>,
}

impl AuditWriter {
    /// Spawns the single consumer task over `store` and returns a handle.
    /// Entries are dropped, not queued, once the channel is full — an audit
    /// write must never backpressure the delivery pipeline.
    pub fn spawn<S>(store: std::sync::Arc<S>) -> Self
    where
        S: EventAuditStore + 'static,
    {
        Self::spawn_with_capacity(store, DEFAULT_CHANNEL_CAPACITY)
    }

    /// Same as [`Self::spawn`] with an explicit channel capacity.
    pub fn spawn_with_capacity<S>(store: std::sync::Arc<S>, capacity: usize) -> Self
    where
        S: EventAuditStore + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<AuditMessage>(capacity);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(err) = store.record(&message.event_id, &message.tenant_id, &message.note).await {
                    tracing::warn!(error = %err, event_id = %message.event_id, "audit write failed");
                }
            }
        });
        Self { tx }
    }

    /// Records one audit note. Never blocks: a full channel drops the
    /// write and logs a warning rather than slowing down delivery.
    pub fn record(&self, event_id: &EventId, tenant_id: &TenantId, note: impl Into<String>) {
        let message = AuditMessage { event_id: event_id.clone(), tenant_id: *tenant_id, note: note.into() };
        if self.tx.try_send(message).is_err() {
            tracing::warn!(event_id = %event_id, "audit channel full or closed, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gateway_store_memory::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn recorded_note_reaches_the_store() {
        let store = Arc::new(MemoryStore::new());
        let writer = AuditWriter::spawn(store.clone());
        let tenant = TenantId::new();
        writer.record(&EventId::from("evt-1"), &tenant, "RECEIVED");
        // Give the consumer task a turn to drain the channel.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn full_channel_drops_without_panicking() {
        let store = Arc::new(MemoryStore::new());
        let writer = AuditWriter::spawn_with_capacity(store, 1);
        let tenant = TenantId::new();
        for i in 0..50 {
            writer.record(&EventId::from(format!("evt-{i}")), &tenant, "RECEIVED");
        }
    }
}
