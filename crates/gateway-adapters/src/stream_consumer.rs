use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use gateway_event_handler::EventContext;
use gateway_types::{RawEvent, SourceName, StreamConsumerConfig, TenantId};
use tokio::sync::{mpsc, Notify};

use crate::adapter::SourceAdapter;
use crate::error::AdapterError;
use crate::loop_control::LoopControl;
use crate::sink::EventSink;

/// One message handed up by a [`StreamBroker`] subscription.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// Event type, resolved by the broker from a header or the topic
    /// schema.
    pub event_type: String,
    /// Decoded message payload.
    pub payload: serde_json::Value,
    /// Broker-specific metadata (partition, offset, headers).
    pub metadata: serde_json::Value,
}

/// Pluggable stream-broker binding (Kafka, Pulsar, ...). Provider-specific
/// clients are an implementation behind this trait, the same posture as
/// `gateway-delivery`'s channel-adapter registry: none ship here. A broker
/// owns its own consume loop and commit/offset semantics internally,
/// pushing decoded messages into `tx` until `stop` is notified.
#[async_trait]
pub trait StreamBroker: Send + Sync {
    /// Subscribes to `topic` under `consumer_group` and begins forwarding
    /// messages into `tx`. Returns once the subscription is established;
    /// the broker's own background task keeps running until `stop` fires.
    async fn subscribe(&self, topic: &str, consumer_group: &str, tx: mpsc::Sender<StreamMessage>, stop: Arc<Notify>) -> Result<(), AdapterError>;
}

/// A broker with no provider configured; subscribing always fails. Default
/// when no stream adapter is wired up for this deployment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStreamBroker;

#[async_trait]
impl StreamBroker for NoStreamBroker {
    async fn subscribe(&self, topic: &str, _consumer_group: &str, _tx: mpsc::Sender<StreamMessage>, _stop: Arc<Notify>) -> Result<(), AdapterError> {
        Err(AdapterError::NoStreamBroker(topic.to_string()))
    }
}

struct StreamContext;

#[async_trait]
impl EventContext for StreamContext {
    async fn ack(&self) {}

    async fn nack(&self, delay: Duration) {
        tracing::warn!(?delay, "stream-consumer event nacked, offset commit is broker-owned");
    }
}

/// Subscribes to a topic with consumer-group semantics, normalizing each
/// [`StreamMessage`] into a [`RawEvent`].
pub struct StreamConsumerAdapter {
    broker: Arc<dyn StreamBroker>,
    tenant_id: TenantId,
    config: StreamConsumerConfig,
    control: LoopControl,
}

impl StreamConsumerAdapter {
    /// Builds an adapter over `broker` for `tenant_id`.
    pub fn new(broker: Arc<dyn StreamBroker>, tenant_id: TenantId, config: StreamConsumerConfig) -> Self {
        Self { broker, tenant_id, config, control: LoopControl::new() }
    }
}

#[async_trait]
impl SourceAdapter for StreamConsumerAdapter {
    fn name(&self) -> &str {
        "stream_consumer"
    }

    async fn start(&self, sink: Arc<dyn EventSink>) -> Result<(), AdapterError> {
        let (tx, mut rx) = mpsc::channel(256);
        let stop = self.control.stop_signal();
        self.broker.subscribe(&self.config.topic, &self.config.consumer_group, tx, stop.clone()).await?;

        let tenant_id = self.tenant_id;
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    message = rx.recv() => {
                        let Some(message) = message else { break };
                        let raw = RawEvent {
                            id: None,
                            event_type: message.event_type,
                            tenant_id: Some(tenant_id),
                            payload: message.payload,
                            source_name: SourceName::Kafka,
                            source_metadata: message.metadata,
                            received_at: Utc::now(),
                            is_replay: false,
                        };
                        sink.handle_event(raw, &StreamContext).await;
                    }
                    _ = stop.notified() => break,
                }
            }
        });
        self.control.set_handle(handle).await;
        Ok(())
    }

    async fn stop(&self) {
        self.control.stop().await;
    }
}
