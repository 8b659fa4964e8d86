#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-runtime** – composition root: constructs the configured store
//! backend, wires the delivery engine, event handler, source-adapter
//! manager, and the four background workers (§4.12–§4.15), spawns each
//! worker loop, and serves an HTTP ingress/health/status server.
//!
//! Grounded on `toka-orchestration-service`'s `main.rs`: one `Runtime`
//! assembled from a `Config`, served behind `axum`, shut down on
//! `tokio::select!` against ctrl-c/SIGTERM. `anyhow` is this crate's error
//! boundary, matching the teacher's composition-root posture (library
//! crates stay on `thiserror`).

mod http;

use std::sync::Arc;

use anyhow::{Context, Result};
use gateway_adapters::SourceAdapterManager;
use gateway_bus_core::GatewayBus;
use gateway_config::{Config, StoreConfig};
use gateway_delivery::DeliveryEngine;
use gateway_dlq_worker::{DlqWorker, DlqWorkerConfig};
use gateway_event_handler::{EventHandler, EventHandlerStore};
use gateway_rate_limiter::RateLimiter;
use gateway_retry_processor::{RetryProcessor, RetryProcessorConfig};
use gateway_scheduled_job_worker::{JobExecutor, JobWorkerConfig, JobWorkerStore, ScheduledJobWorker, SqlPools};
use gateway_scheduler::{SchedulerConfig, SchedulerStore, SchedulerWorker};
use gateway_store_memory::MemoryStore;
use gateway_store_sqlite::SqliteStore;
use tokio::task::JoinHandle;

/// Union of every store trait the assembled runtime's components depend
/// on.
pub trait RuntimeStore:
    EventHandlerStore + gateway_adapters::AdapterManagerStore + SchedulerStore + JobWorkerStore
{
}
impl<T> RuntimeStore for T where
    T: EventHandlerStore + gateway_adapters::AdapterManagerStore + SchedulerStore + JobWorkerStore
{
}

/// A fully assembled gateway, ready to serve.
pub struct Runtime {
    router: axum::Router,
    http_port: u16,
    workers: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Builds a runtime from `config`: constructs the store backend it
    /// names, wires every pipeline component, and spawns each worker loop.
    /// No HTTP listener is bound yet; call [`Self::serve`] for that.
    pub async fn build(config: Config) -> Result<Self> {
        let bus = Arc::new(GatewayBus::default());
        match &config.store {
            StoreConfig::Memory => {
                let store = Arc::new(MemoryStore::new());
                assemble(store, None, &config, bus).await
            }
            StoreConfig::Sqlite { path } => {
                let store = Arc::new(SqliteStore::open(path).await.with_context(|| format!("opening sqlite store at {path}"))?);
                let pool = store.pool();
                assemble(store, Some(pool), &config, bus).await
            }
        }
    }

    /// Binds the HTTP listener and serves until a shutdown signal arrives,
    /// then aborts every spawned worker loop.
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", self.http_port))
            .await
            .with_context(|| format!("binding http listener on port {}", self.http_port))?;
        tracing::info!(port = self.http_port, "gateway http server listening");

        let server = axum::serve(listener, self.router);
        tokio::select! {
            result = server => {
                if let Err(err) = result {
                    tracing::error!(%err, "http server error");
                }
            }
            _ = shutdown_signal() => {
                tracing::info!("received shutdown signal");
            }
        }

        tracing::info!("shutting down gateway runtime");
        for handle in self.workers {
            handle.abort();
        }
        Ok(())
    }
}

async fn assemble<Store>(
    store: Arc<Store>,
    sql_pool: Option<sqlx::SqlitePool>,
    config: &Config,
    bus: Arc<GatewayBus>,
) -> Result<Runtime>
where
    Store: RuntimeStore + Send + Sync + 'static,
{
    let rate_limiter = RateLimiter::in_memory();

    let handler_delivery = DeliveryEngine::new(store.clone(), rate_limiter.clone()).with_bus(bus.clone());
    let event_handler = Arc::new(EventHandler::new(store.clone(), handler_delivery));

    let worker_delivery = Arc::new(DeliveryEngine::new(store.clone(), rate_limiter.clone()).with_bus(bus.clone()));

    let mut adapter_manager = SourceAdapterManager::new(store.clone(), event_handler.clone());
    if let Some(pool) = sql_pool.clone() {
        adapter_manager = adapter_manager.with_sql_pool(pool);
    }
    if let Some(ms) = config.workers.adapter_reconcile_ms {
        adapter_manager = adapter_manager.with_reconcile_interval(std::time::Duration::from_millis(ms));
    }
    let adapter_manager = Arc::new(adapter_manager);
    adapter_manager.reconcile().await.context("initial source-adapter reconciliation")?;

    let mut scheduler = SchedulerWorker::new(store.clone(), worker_delivery.clone()).with_bus(bus.clone());
    if let Some(ms) = config.workers.scheduler_ms {
        scheduler = scheduler.with_config(SchedulerConfig { interval_ms: ms, ..SchedulerConfig::default() });
    }

    let mut retry_processor = RetryProcessor::new(store.clone(), worker_delivery.clone());
    if let Some(ms) = config.workers.retry_processor_ms {
        retry_processor = retry_processor.with_config(RetryProcessorConfig { interval_ms: ms, ..RetryProcessorConfig::default() });
    }

    let mut dlq_worker = DlqWorker::new(store.clone(), worker_delivery.clone());
    if let Some(ms) = config.workers.dlq_worker_ms {
        dlq_worker = dlq_worker.with_config(DlqWorkerConfig { interval_ms: ms, ..DlqWorkerConfig::default() });
    }

    let job_executor = match sql_pool {
        Some(pool) => JobExecutor::new(SqlPools::new().with_default(pool)),
        None => JobExecutor::new(SqlPools::new()),
    };
    let mut scheduled_job_worker = ScheduledJobWorker::new(store.clone(), worker_delivery.clone(), job_executor);
    if let Some(ms) = config.workers.scheduled_job_worker_ms {
        scheduled_job_worker = scheduled_job_worker.with_config(JobWorkerConfig { interval_ms: ms });
    }

    let workers = vec![
        adapter_manager.clone().spawn_reconciliation_loop(),
        Arc::new(scheduler).spawn_loop(),
        Arc::new(retry_processor).spawn_loop(),
        Arc::new(dlq_worker).spawn_loop(),
        Arc::new(scheduled_job_worker).spawn_loop(),
    ];

    let router = http::router(adapter_manager);

    Ok(Runtime { router, http_port: config.http_port, workers })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
