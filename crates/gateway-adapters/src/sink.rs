use async_trait::async_trait;
use gateway_event_handler::{EventContext, EventHandler, EventHandlerStore};
use gateway_rate_limiter::RateLimitStorage;
use gateway_types::RawEvent;

/// Erases an [`EventHandler`]'s store/rate-limiter generics so the
/// source-adapter manager can hold one shared pipeline entry point as a
/// trait object, the same posture `gateway-delivery`'s channel-adapter
/// registry takes toward provider-specific send implementations.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Hands one raw event to the per-event pipeline.
    async fn handle_event(&self, raw: RawEvent, ctx: &dyn EventContext);
}

#[async_trait]
impl<Store, RL> EventSink for EventHandler<Store, RL>
where
    Store: EventHandlerStore + Send + Sync + 'static,
    RL: RateLimitStorage + Send + Sync + 'static,
{
    async fn handle_event(&self, raw: RawEvent, ctx: &dyn EventContext) {
        EventHandler::handle_event(self, raw, ctx).await
    }
}
