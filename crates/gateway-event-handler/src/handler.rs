use std::sync::Arc;

use gateway_dedup::DedupCache;
use gateway_delivery::{DeliveryEngine, DeliveryStore};
use gateway_rate_limiter::RateLimitStorage;
use gateway_store_core::{EventAuditStore, ProcessedEventStore, ScheduledItemStore};
use gateway_transformer::Transformer;

use crate::audit::AuditWriter;
use crate::config::EventHandlerConfig;

/// Union of every store trait the event-handler pipeline depends on, beyond
/// what the delivery engine itself already requires.
pub trait EventHandlerStore: DeliveryStore + EventAuditStore + ProcessedEventStore + ScheduledItemStore {}
impl<T: DeliveryStore + EventAuditStore + ProcessedEventStore + ScheduledItemStore> EventHandlerStore for T {}

/// Drives the per-event ingest pipeline (§4.9) and process-event fan-out
/// over matched integrations (§4.10), over a configurable store, delivery
/// engine, and rate-limit storage.
pub struct EventHandler<Store, RL>
where
    Store: EventHandlerStore + Send + Sync,
    RL: RateLimitStorage,
{
    pub(crate) store: Arc<Store>,
    pub(crate) dedup: DedupCache<Store>,
    pub(crate) delivery: DeliveryEngine<Store, RL>,
    pub(crate) transformer: Transformer,
    pub(crate) http_client: reqwest::Client,
    pub(crate) audit: AuditWriter,
    pub(crate) config: EventHandlerConfig,
}

impl<Store, RL> EventHandler<Store, RL>
where
    Store: EventHandlerStore + Send + Sync + 'static,
    RL: RateLimitStorage,
{
    /// Builds a handler over `store` and an already-configured delivery
    /// engine, with the default pipeline config. Spawns the audit writer's
    /// consumer task.
    pub fn new(store: Arc<Store>, delivery: DeliveryEngine<Store, RL>) -> Self {
        Self::with_config(store, delivery, EventHandlerConfig::default())
    }

    /// Same as [`Self::new`] with an explicit [`EventHandlerConfig`].
    pub fn with_config(store: Arc<Store>, delivery: DeliveryEngine<Store, RL>, config: EventHandlerConfig) -> Self {
        let dedup = DedupCache::new(store.clone());
        let audit = AuditWriter::spawn(store.clone());
        Self { store, dedup, delivery, transformer: Transformer::new(), http_client: reqwest::Client::new(), audit, config }
    }
}
