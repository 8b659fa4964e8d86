use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use gateway_types::{
    AuthTokenCache, CircuitState, DedupRecord, DlqEntry, DlqStatus, EventFingerprint, EventId,
    IntegrationConfig, IntegrationId, ScheduledItem, TenantId,
};

use crate::error::StoreError;
use crate::versioned::Versioned;

/// `integration_configs` — the per-tenant delivery-rule catalog.
#[async_trait]
pub trait IntegrationConfigStore: Send + Sync {
    /// Loads one integration by id.
    async fn get(&self, id: &IntegrationId) -> Result<Versioned<IntegrationConfig>, StoreError>;

    /// Loads every active integration matching `(tenant, event_type)`.
    async fn find_active_by_event_type(
        &self,
        tenant_id: &TenantId,
        event_type: &str,
    ) -> Result<Vec<Versioned<IntegrationConfig>>, StoreError>;

    /// Compare-and-swap update of an integration's circuit state.
    async fn update_circuit_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next: CircuitState,
    ) -> Result<u64, StoreError>;

    /// Compare-and-swap update of an integration's cached auth token.
    /// Fire-and-forget at the call site: failures are logged and swallowed,
    /// never surfaced to the delivery outcome.
    async fn update_token_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next: Option<AuthTokenCache>,
    ) -> Result<u64, StoreError>;

    /// Lists every tenant id with at least one integration configured, for
    /// the source-adapter manager's reconciliation loop.
    async fn list_tenant_ids(&self) -> Result<Vec<TenantId>, StoreError>;

    /// Lists every active SCHEDULED-JOB integration, for the scheduled-job
    /// worker's cron/interval loop.
    async fn list_active_scheduled_jobs(&self) -> Result<Vec<Versioned<IntegrationConfig>>, StoreError>;

    /// Compare-and-swap update of a SCHEDULED-JOB integration's next
    /// scheduled run time, after the worker fires or reschedules it.
    async fn update_next_run_at_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError>;
}

/// `event_audit` — the per-event audit trail (RECEIVED → PROCESSING →
/// terminal). Writes are best-effort and never block delivery.
#[async_trait]
pub trait EventAuditStore: Send + Sync {
    /// Appends one audit row for an event's lifecycle transition.
    async fn record(&self, event_id: &EventId, tenant_id: &TenantId, note: &str) -> Result<(), StoreError>;
}

/// `execution_logs` — one row per delivery attempt (or multi-action step).
#[async_trait]
pub trait DeliveryLogStore: Send + Sync {
    /// Loads a log row by its stable id.
    async fn get(&self, id: &Uuid) -> Result<gateway_types::DeliveryLog, StoreError>;

    /// Inserts or updates a log row by id, coalescing retries of the same
    /// logical attempt onto one row.
    async fn upsert(&self, log: gateway_types::DeliveryLog) -> Result<(), StoreError>;

    /// Lists a bounded batch of logs currently in `RETRYING` state, for the
    /// retry processor.
    async fn list_retrying_batch(&self, limit: usize) -> Result<Vec<gateway_types::DeliveryLog>, StoreError>;
}

/// `scheduled_integrations` — future (delayed/recurring) deliveries.
#[async_trait]
pub trait ScheduledItemStore: Send + Sync {
    /// Inserts a new scheduled item.
    async fn insert(&self, item: ScheduledItem) -> Result<(), StoreError>;

    /// Atomically claims up to `limit` PENDING items whose `scheduled_for`
    /// has passed, transitioning them to PROCESSING, oldest-first. Returns
    /// the post-claim version alongside each item so the caller can submit
    /// its own `update_if` without a separate read.
    async fn claim_due_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Versioned<ScheduledItem>>, StoreError>;

    /// Resets items stuck in PROCESSING longer than `older_than` back to
    /// PENDING.
    async fn reset_stuck_processing(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Compare-and-swap update of one item's full state (post-delivery
    /// transition, reschedule, or cancellation).
    async fn update_if(
        &self,
        id: &Uuid,
        expected_version: u64,
        next: ScheduledItem,
    ) -> Result<u64, StoreError>;

    /// Marks every PENDING item matching `cancellation_match_key` as
    /// CANCELLED, for cancellation-event handling.
    async fn cancel_by_match_key(&self, tenant_id: &TenantId, match_key: &str) -> Result<u64, StoreError>;
}

/// `dlq` — dead-letter entries eligible for cron retry or manual replay.
#[async_trait]
pub trait DlqStore: Send + Sync {
    /// Inserts a new DLQ entry.
    async fn insert(&self, entry: DlqEntry) -> Result<(), StoreError>;

    /// Atomically claims up to `limit` entries with `status = pending` and
    /// `next_retry_at <= now`, transitioning them to `retrying`.
    async fn claim_due_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<DlqEntry>, StoreError>;

    /// Updates an entry's status, retry count, and next-retry deadline
    /// after a retry attempt.
    async fn update_status(
        &self,
        id: &Uuid,
        status: DlqStatus,
        retry_count: u32,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError>;

    /// Lists every entry for `tenant_id` regardless of status, for
    /// read-only inspection. Not consulted by the retry path.
    async fn list_by_tenant(&self, tenant_id: &TenantId) -> Result<Vec<DlqEntry>, StoreError>;
}

/// `processed_events` — durable dedup record, consulted in addition to the
/// in-memory TTL cache for cross-restart deduplication.
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Atomically checks whether `fingerprint` has been seen before and, if
    /// not, records it. Returns `true` when this call recorded a new entry
    /// (i.e. the event was NOT a duplicate).
    async fn record_if_new(&self, record: DedupRecord) -> Result<bool, StoreError>;
}

/// `scheduled_job_logs` — one row per scheduled-job worker execution,
/// carrying fetched-data and transformed-payload snapshots for diagnosis.
#[async_trait]
pub trait ScheduledJobLogStore: Send + Sync {
    /// Appends one execution-step log row.
    async fn append(&self, log: ScheduledJobLog) -> Result<(), StoreError>;
}

/// One row appended by the scheduled-job worker per execution.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ScheduledJobLog {
    /// Unique id.
    pub id: Uuid,
    /// Integration (SCHEDULED_JOB mode) this execution belongs to.
    pub integration_id: IntegrationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name of the job at execution time.
    pub job_name: String,
    /// When this execution started.
    pub executed_at: DateTime<Utc>,
    /// Number of records the data source returned.
    pub record_count: usize,
    /// Snapshot of fetched data, truncated at 50 KB.
    pub fetched_data_snapshot: String,
    /// Snapshot of the transformed payload, truncated at 50 KB.
    pub transformed_payload_snapshot: String,
    /// Outcome description (success, or the error encountered).
    pub outcome: String,
}

/// `event_source_configs` — per-tenant source-adapter configuration,
/// consulted by the source-adapter manager's reconciliation loop. Modeled
/// because it is part of the persisted state layout (§3/§6); CRUD over
/// this collection is an out-of-scope admin-API concern.
#[async_trait]
pub trait EventSourceConfigStore: Send + Sync {
    /// Loads the explicit source config for a tenant, if one is configured.
    async fn get_for_tenant(&self, tenant_id: &TenantId) -> Result<Option<serde_json::Value>, StoreError>;

    /// Loads the process-wide default source config, used when a tenant has
    /// no explicit override.
    async fn get_default(&self) -> Result<Option<serde_json::Value>, StoreError>;
}

/// `event_types` — the event-type catalog. Modeled for completeness of the
/// persisted layout; catalog CRUD is an out-of-scope admin-API concern.
#[async_trait]
pub trait EventTypeStore: Send + Sync {
    /// True if `event_type` is a recognized, active entry in the catalog.
    async fn is_known(&self, event_type: &str) -> Result<bool, StoreError>;
}

/// A claimable handoff record for one integration's immediate delivery,
/// bounding the worker pool that executes §5's per-event pipeline
/// executions. Distinct from [`ScheduledItemStore`]'s delayed/recurring
/// items: a pending delivery is claimed and discarded within the same
/// process tick, never persisted across a scheduler cadence.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PendingDelivery {
    /// Unique id.
    pub id: Uuid,
    /// Event this delivery was produced from.
    pub event_id: EventId,
    /// Integration to deliver through.
    pub integration_id: IntegrationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// When this handoff record was created.
    pub created_at: DateTime<Utc>,
}

/// `pending_deliveries` — the in-flight handoff queue between the event
/// handler and the bounded delivery worker pool.
#[async_trait]
pub trait PendingDeliveryStore: Send + Sync {
    /// Enqueues one pending delivery.
    async fn enqueue(&self, delivery: PendingDelivery) -> Result<(), StoreError>;

    /// Atomically claims up to `limit` unclaimed entries for a worker to
    /// execute.
    async fn claim_batch(&self, limit: usize) -> Result<Vec<PendingDelivery>, StoreError>;

    /// Removes a claimed entry once its delivery has completed.
    async fn complete(&self, id: &Uuid) -> Result<(), StoreError>;
}
