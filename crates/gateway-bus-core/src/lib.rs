#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-bus-core** – in-process broadcast bus for pipeline
//! notifications.
//!
//! This bus is not on the hot delivery path: nothing in the delivery
//! pipeline awaits a publish, and a lagging or absent subscriber never
//! blocks a delivery. It exists for in-process observers — tests today, a
//! metrics exporter tomorrow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use gateway_types::{
    CircuitBreakerState, DeliveryStatus, IntegrationId, ScheduledItemState, TenantId, TraceId,
};

/// Default capacity of the broadcast channel's ring buffer.
pub const DEFAULT_CAPACITY: usize = 1024;

/// A notification published after a pipeline step reaches a state change
/// observers might care about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GatewayEvent {
    /// A delivery attempt reached a terminal status.
    DeliveryTerminal {
        /// Correlation id of the attempt.
        trace_id: TraceId,
        /// Integration the attempt was made against.
        integration_id: IntegrationId,
        /// Owning tenant.
        tenant_id: TenantId,
        /// Final status reached.
        status: DeliveryStatus,
        /// When this notification was published.
        at: DateTime<Utc>,
    },
    /// An integration's circuit breaker changed state.
    CircuitTransitioned {
        /// Integration whose circuit changed.
        integration_id: IntegrationId,
        /// Owning tenant.
        tenant_id: TenantId,
        /// New state.
        to: CircuitBreakerState,
        /// When this notification was published.
        at: DateTime<Utc>,
    },
    /// A scheduled item changed lifecycle state.
    ScheduledItemTransitioned {
        /// The scheduled item's id.
        item_id: uuid::Uuid,
        /// Integration the item belongs to.
        integration_id: IntegrationId,
        /// New state.
        to: ScheduledItemState,
        /// When this notification was published.
        at: DateTime<Utc>,
    },
}

/// Errors the bus itself can raise. Distinct from "no subscribers" (not an
/// error) and from a lagging subscriber (surfaced to that subscriber only).
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus has been shut down and can no longer accept publishes.
    #[error("bus is closed")]
    Closed,
}

/// Handle to the broadcast bus. Cheap to clone; every clone shares the same
/// underlying channel.
#[derive(Clone)]
pub struct GatewayBus {
    sender: broadcast::Sender<GatewayEvent>,
}

impl GatewayBus {
    /// Creates a new bus with the given ring-buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to every current subscriber. Never blocks; if
    /// there are no subscribers the event is simply dropped.
    pub fn publish(&self, event: GatewayEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("gateway-bus-core: publish with no active subscribers");
        }
    }

    /// Subscribes to the bus, receiving every event published from this
    /// point onward. A slow subscriber that falls behind the ring buffer
    /// receives `RecvError::Lagged` rather than blocking publishers.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }

    /// Number of currently active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for GatewayBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_is_received_by_subscriber() {
        let bus = GatewayBus::default();
        let mut rx = bus.subscribe();
        bus.publish(GatewayEvent::CircuitTransitioned {
            integration_id: IntegrationId::new(),
            tenant_id: TenantId::new(),
            to: CircuitBreakerState::Open,
            at: Utc::now(),
        });
        let got = rx.recv().await.expect("event delivered");
        assert!(matches!(got, GatewayEvent::CircuitTransitioned { to: CircuitBreakerState::Open, .. }));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let bus = GatewayBus::default();
        bus.publish(GatewayEvent::CircuitTransitioned {
            integration_id: IntegrationId::new(),
            tenant_id: TenantId::new(),
            to: CircuitBreakerState::Closed,
            at: Utc::now(),
        });
    }

    #[test]
    fn subscriber_count_tracks_active_receivers() {
        let bus = GatewayBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        let _rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }
}
