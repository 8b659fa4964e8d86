use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use gateway_store_core::{EventSourceConfigStore, IntegrationConfigStore};
use gateway_types::{SourceConfig, TenantId};
use sqlx::SqlitePool;

use crate::config_resolution;
use crate::error::AdapterError;
use crate::http_push::HttpPushAdapter;
use crate::sink::EventSink;
use crate::stream_consumer::{NoStreamBroker, StreamBroker, StreamConsumerAdapter};
use crate::table_poll::TablePollAdapter;
use crate::SourceAdapter;

/// Cadence of the reconciliation loop (§4.11).
pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(120);

/// Union of store traits the adapter manager reads from.
pub trait AdapterManagerStore: IntegrationConfigStore + EventSourceConfigStore {}
impl<T: IntegrationConfigStore + EventSourceConfigStore> AdapterManagerStore for T {}

struct RunningAdapter {
    hash: String,
    adapter: Arc<dyn SourceAdapter>,
}

/// One adapter instance per tenant, reconciled against the store's
/// per-tenant and default source configs every [`RECONCILE_INTERVAL`].
pub struct SourceAdapterManager<Store> {
    store: Arc<Store>,
    sink: Arc<dyn EventSink>,
    sql_pool: Option<SqlitePool>,
    stream_broker: Arc<dyn StreamBroker>,
    running: DashMap<TenantId, RunningAdapter>,
    reconcile_interval: Duration,
}

impl<Store> SourceAdapterManager<Store>
where
    Store: AdapterManagerStore + Send + Sync + 'static,
{
    /// Builds a manager with no SQL pool and no stream broker configured;
    /// table-poll and stream-consumer tenants will fail to start until
    /// [`Self::with_sql_pool`] / [`Self::with_stream_broker`] are applied.
    pub fn new(store: Arc<Store>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            sink,
            sql_pool: None,
            stream_broker: Arc::new(NoStreamBroker),
            running: DashMap::new(),
            reconcile_interval: RECONCILE_INTERVAL,
        }
    }

    /// Supplies the pool table-poll adapters query against.
    pub fn with_sql_pool(mut self, pool: SqlitePool) -> Self {
        self.sql_pool = Some(pool);
        self
    }

    /// Supplies the broker stream-consumer adapters subscribe through.
    pub fn with_stream_broker(mut self, broker: Arc<dyn StreamBroker>) -> Self {
        self.stream_broker = broker;
        self
    }

    /// Overrides [`RECONCILE_INTERVAL`] for [`Self::spawn_reconciliation_loop`].
    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval = interval;
        self
    }

    /// Number of tenants with a currently-running adapter.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Finds the running HTTP-push adapter bound to `path`, if any, for the
    /// HTTP ingress server to hand an inbound POST to.
    pub fn find_http_push(&self, path: &str) -> Option<Arc<dyn SourceAdapter>> {
        self.running
            .iter()
            .find(|entry| entry.value().adapter.http_push_path() == Some(path))
            .map(|entry| entry.value().adapter.clone())
    }

    /// Spawns the reconciliation loop, ticking every [`RECONCILE_INTERVAL`].
    pub fn spawn_reconciliation_loop(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.reconcile_interval);
            loop {
                ticker.tick().await;
                if let Err(err) = self.reconcile().await {
                    tracing::error!(error = %err, "source-adapter reconciliation failed");
                }
            }
        })
    }

    /// Runs one reconciliation pass: load tenants and source configs,
    /// diff against the running set, stop removed, restart on hash change,
    /// start new.
    pub async fn reconcile(&self) -> Result<(), AdapterError> {
        let tenant_ids = self.store.list_tenant_ids().await?;
        let default_config = self.store.get_default().await?;
        let mut seen = HashSet::with_capacity(tenant_ids.len());

        for tenant_id in tenant_ids {
            seen.insert(tenant_id);
            let explicit = self.store.get_for_tenant(&tenant_id).await?;
            let Some(resolved) = config_resolution::resolve(explicit, default_config.clone()) else {
                self.stop_tenant(&tenant_id).await;
                continue;
            };
            let parsed = match config_resolution::parse(&resolved) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!(tenant_id = %tenant_id, error = %err, "unparseable source config, skipping");
                    continue;
                }
            };
            let new_hash = match config_resolution::hash(&parsed) {
                Ok(hash) => hash,
                Err(err) => {
                    tracing::warn!(tenant_id = %tenant_id, error = %err, "failed to hash source config, skipping");
                    continue;
                }
            };

            let unchanged = self.running.get(&tenant_id).map(|entry| entry.hash == new_hash).unwrap_or(false);
            if unchanged {
                continue;
            }

            self.stop_tenant(&tenant_id).await;
            match self.start_adapter(tenant_id, parsed).await {
                Ok(adapter) => {
                    self.running.insert(tenant_id, RunningAdapter { hash: new_hash, adapter });
                }
                Err(err) => {
                    tracing::error!(tenant_id = %tenant_id, error = %err, "failed to start source adapter");
                }
            }
        }

        let removed: Vec<TenantId> = self.running.iter().map(|entry| *entry.key()).filter(|id| !seen.contains(id)).collect();
        for tenant_id in removed {
            self.stop_tenant(&tenant_id).await;
        }
        Ok(())
    }

    async fn stop_tenant(&self, tenant_id: &TenantId) {
        if let Some((_, entry)) = self.running.remove(tenant_id) {
            entry.adapter.stop().await;
        }
    }

    async fn start_adapter(&self, tenant_id: TenantId, config: SourceConfig) -> Result<Arc<dyn SourceAdapter>, AdapterError> {
        let adapter: Arc<dyn SourceAdapter> = match config {
            SourceConfig::TablePoll(cfg) => {
                let pool = self.sql_pool.clone().ok_or(AdapterError::MissingSqlPool)?;
                Arc::new(TablePollAdapter::new(pool, tenant_id, cfg)?)
            }
            SourceConfig::StreamConsumer(cfg) => Arc::new(StreamConsumerAdapter::new(self.stream_broker.clone(), tenant_id, cfg)),
            SourceConfig::HttpPush(cfg) => Arc::new(HttpPushAdapter::new(tenant_id, cfg)),
        };
        adapter.start(self.sink.clone()).await?;
        Ok(adapter)
    }
}
