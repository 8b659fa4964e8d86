#![forbid(unsafe_code)]

//! **gateway-cli** – runs the gateway, and inspects or replays its persisted
//! state without a running process.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gateway_config::{Config, StoreConfig};
use gateway_delivery::{DeliveryEngine, DeliveryOptions, DeliveryStore};
use gateway_rate_limiter::RateLimiter;
use gateway_store_core::{DlqStore, IntegrationConfigStore};
use gateway_store_memory::MemoryStore;
use gateway_store_sqlite::SqliteStore;
use gateway_types::{Event, EventStatus, IntegrationId, SourceName, TenantId, TriggerType};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "gateway")]
#[command(about = "Multi-tenant event-to-integration delivery gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway: binds the HTTP ingress server and starts every
    /// background worker.
    Run,
    /// Replay a past delivery attempt by its log id, bypassing an open
    /// circuit exactly once.
    Replay {
        /// Delivery log row to replay.
        #[arg(long)]
        log_id: Uuid,
    },
    /// Inspect persisted state without running the gateway.
    #[command(subcommand)]
    Inspect(Inspect),
}

#[derive(Subcommand)]
enum Inspect {
    /// Prints an integration's circuit-breaker state.
    Circuit {
        /// Integration to inspect.
        #[arg(long)]
        integration_id: Uuid,
    },
    /// Lists a tenant's dead-letter entries.
    Dlq {
        /// Tenant to inspect.
        #[arg(long)]
        tenant_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env().context("loading gateway configuration")?;
    init_tracing(&config.log_level)?;

    match cli.command {
        Commands::Run => {
            info!("starting gateway v{}", env!("CARGO_PKG_VERSION"));
            let runtime = gateway_runtime::Runtime::build(config).await?;
            runtime.serve().await?;
        }
        Commands::Replay { log_id } => match &config.store {
            StoreConfig::Memory => {
                warn!("replaying against a fresh in-memory store will not find a log row written by another process");
                replay(Arc::new(MemoryStore::new()), log_id).await?;
            }
            StoreConfig::Sqlite { path } => {
                replay(Arc::new(SqliteStore::open(path).await.context("opening sqlite store")?), log_id).await?;
            }
        },
        Commands::Inspect(Inspect::Circuit { integration_id }) => match &config.store {
            StoreConfig::Memory => inspect_circuit(Arc::new(MemoryStore::new()), integration_id.into()).await?,
            StoreConfig::Sqlite { path } => {
                inspect_circuit(Arc::new(SqliteStore::open(path).await.context("opening sqlite store")?), integration_id.into()).await?
            }
        },
        Commands::Inspect(Inspect::Dlq { tenant_id }) => match &config.store {
            StoreConfig::Memory => inspect_dlq(Arc::new(MemoryStore::new()), tenant_id.into()).await?,
            StoreConfig::Sqlite { path } => {
                inspect_dlq(Arc::new(SqliteStore::open(path).await.context("opening sqlite store")?), tenant_id.into()).await?
            }
        },
    }

    Ok(())
}

async fn replay<Store>(store: Arc<Store>, log_id: Uuid) -> Result<()>
where
    Store: DeliveryStore + Send + Sync + 'static,
{
    let log = gateway_store_core::DeliveryLogStore::get(store.as_ref(), &log_id)
        .await
        .context("loading delivery log")?;
    let integration = IntegrationConfigStore::get(store.as_ref(), &log.integration_id)
        .await
        .context("loading integration config")?;

    let event = Event {
        id: log.event_id.clone(),
        event_type: integration
            .value
            .trigger_event_types
            .first()
            .cloned()
            .unwrap_or_else(|| "replay".to_string()),
        tenant_id: log.tenant_id,
        payload: log.original_payload.clone(),
        source_name: SourceName::HttpPush,
        source_metadata: serde_json::Value::Null,
        received_at: log.created_at,
        attempt_count: log.attempt_count,
        is_replay: true,
        status: EventStatus::Processing,
    };

    let rate_limiter = RateLimiter::in_memory();
    let engine = DeliveryEngine::new(store, rate_limiter);
    let options = DeliveryOptions {
        trace_id: log.trace_id,
        trigger_type: TriggerType::Replay,
        existing_log_id: None,
        is_test_event: false,
        force_delivery: true,
    };

    let outcome = engine
        .deliver_single_action(&integration, None, &event, log.attempt_count + 1, &options)
        .await
        .context("replaying delivery")?;

    println!("replay outcome: {:?} (log id {})", outcome.status, outcome.log_id);
    Ok(())
}

async fn inspect_circuit<Store>(store: Arc<Store>, integration_id: IntegrationId) -> Result<()>
where
    Store: IntegrationConfigStore + Send + Sync + 'static,
{
    let integration = store.get(&integration_id).await.context("loading integration config")?;
    let circuit = &integration.value.circuit;

    println!("integration:          {} ({})", integration.value.name, integration.value.id);
    println!("state:                {:?}", circuit.state);
    println!("consecutive_failures: {}", circuit.consecutive_failures);
    println!("opened_at:            {:?}", circuit.opened_at);
    println!("cooldown_until:       {:?}", circuit.cooldown_until);
    println!("reason:               {:?}", circuit.reason);
    Ok(())
}

async fn inspect_dlq<Store>(store: Arc<Store>, tenant_id: TenantId) -> Result<()>
where
    Store: DlqStore + Send + Sync + 'static,
{
    let entries = store.list_by_tenant(&tenant_id).await.context("listing dlq entries")?;
    if entries.is_empty() {
        println!("no dlq entries for tenant {tenant_id}");
        return Ok(());
    }

    for entry in entries {
        println!(
            "{}  integration={}  status={:?}  retries={}/{}  next_retry_at={}  error={}",
            entry.id,
            entry.integration_id,
            entry.status,
            entry.retry_count,
            entry.max_retries,
            entry.next_retry_at,
            entry.error.message,
        );
    }
    Ok(())
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}
