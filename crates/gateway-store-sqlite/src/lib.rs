#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-store-sqlite** – SQLite-backed persistence for the gateway's
//! collections, via `sqlx`.
//!
//! Every collection is one table; structured fields used for querying
//! (tenant id, status, due timestamps) get their own column, the rest of
//! the document is stored as a JSON blob. Compare-and-swap updates are
//! implemented as `UPDATE ... WHERE version = ?` and check the affected
//! row count, since SQLite has no native `findAndModify`.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use gateway_store_core::{
    DeliveryLogStore, DlqStore, EventAuditStore, EventSourceConfigStore, EventTypeStore,
    IntegrationConfigStore, PendingDelivery, PendingDeliveryStore, ProcessedEventStore,
    ScheduledItemStore, ScheduledJobLog, ScheduledJobLogStore, StoreError, Versioned,
};
use gateway_types::{
    AuthTokenCache, CircuitState, DedupRecord, DeliveryLog, DeliveryMode, DlqEntry, DlqStatus,
    EventFingerprint, EventId, IntegrationConfig, IntegrationId, ScheduledItem, ScheduledItemState,
    TenantId,
};

fn backend_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

//─────────────────────────────
//  SQLite-backed store
//─────────────────────────────

/// A persistent store backed by a SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens or creates a SQLite database at `path`, running migrations.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().display());
        let pool = SqlitePool::connect(&url).await.map_err(backend_err)?;
        Self::from_pool(pool).await
    }

    /// Opens an in-memory SQLite database. Useful for tests.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePool::connect("sqlite::memory:").await.map_err(backend_err)?;
        Self::from_pool(pool).await
    }

    /// Builds a store from an already-connected pool, running migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Returns a clone of the underlying connection pool, for callers that
    /// need to run queries alongside the store (table-poll source adapters,
    /// scheduled-job SQL data sources) against the same database.
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS integration_configs (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                active INTEGER NOT NULL,
                version INTEGER NOT NULL,
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_integrations_tenant ON integration_configs(tenant_id)")
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_audit (
                event_id TEXT NOT NULL,
                tenant_id TEXT NOT NULL,
                note TEXT NOT NULL,
                recorded_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS execution_logs (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_integrations (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                state TEXT NOT NULL,
                scheduled_for TEXT NOT NULL,
                cancellation_match_key TEXT,
                version INTEGER NOT NULL,
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dlq (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                next_retry_at TEXT NOT NULL,
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_events (
                fingerprint TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_job_logs (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_source_configs (
                tenant_id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS default_source_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS event_types (
                event_type TEXT PRIMARY KEY
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pending_deliveries (
                id TEXT PRIMARY KEY,
                doc TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;

        Ok(())
    }
}

#[async_trait]
impl IntegrationConfigStore for SqliteStore {
    async fn get(&self, id: &IntegrationId) -> Result<Versioned<IntegrationConfig>, StoreError> {
        let row = sqlx::query("SELECT version, doc FROM integration_configs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let version: i64 = row.try_get("version").map_err(backend_err)?;
        let doc: String = row.try_get("doc").map_err(backend_err)?;
        let value: IntegrationConfig = serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(Versioned { value, version: version as u64 })
    }

    async fn find_active_by_event_type(
        &self,
        tenant_id: &TenantId,
        event_type: &str,
    ) -> Result<Vec<Versioned<IntegrationConfig>>, StoreError> {
        let rows = sqlx::query("SELECT version, doc FROM integration_configs WHERE tenant_id = ? AND active = 1")
            .bind(tenant_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        let mut out = Vec::new();
        for row in rows {
            let version: i64 = row.try_get("version").map_err(backend_err)?;
            let doc: String = row.try_get("doc").map_err(backend_err)?;
            let value: IntegrationConfig =
                serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))?;
            if value.trigger_event_types.iter().any(|t| t == event_type) {
                out.push(Versioned { value, version: version as u64 });
            }
        }
        Ok(out)
    }

    async fn update_circuit_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next: CircuitState,
    ) -> Result<u64, StoreError> {
        let mut current = self.get(id).await?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: current.version,
            });
        }
        current.value.circuit = next;
        self.write_integration_if(id, expected_version, &current.value).await
    }

    async fn update_token_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next: Option<AuthTokenCache>,
    ) -> Result<u64, StoreError> {
        let mut current = self.get(id).await?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: current.version,
            });
        }
        current.value.cached_token = next;
        self.write_integration_if(id, expected_version, &current.value).await
    }

    async fn list_tenant_ids(&self) -> Result<Vec<TenantId>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT tenant_id FROM integration_configs")
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.into_iter()
            .map(|r| {
                let s: String = r.try_get("tenant_id").map_err(backend_err)?;
                Uuid::parse_str(&s).map(TenantId::from).map_err(|e| StoreError::Backend(e.to_string()))
            })
            .collect()
    }

    async fn list_active_scheduled_jobs(&self) -> Result<Vec<Versioned<IntegrationConfig>>, StoreError> {
        let rows = sqlx::query("SELECT version, doc FROM integration_configs WHERE active = 1")
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        let mut out = Vec::new();
        for row in rows {
            let version: i64 = row.try_get("version").map_err(backend_err)?;
            let doc: String = row.try_get("doc").map_err(backend_err)?;
            let value: IntegrationConfig = serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))?;
            if value.delivery_mode == DeliveryMode::ScheduledJob {
                out.push(Versioned { value, version: version as u64 });
            }
        }
        Ok(out)
    }

    async fn update_next_run_at_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError> {
        let mut current = self.get(id).await?;
        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: current.version,
            });
        }
        current.value.next_run_at = next_run_at;
        self.write_integration_if(id, expected_version, &current.value).await
    }
}

impl SqliteStore {
    async fn write_integration_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        value: &IntegrationConfig,
    ) -> Result<u64, StoreError> {
        let doc = serde_json::to_string(value).map_err(|e| StoreError::Backend(e.to_string()))?;
        let next_version = expected_version as i64 + 1;
        let result = sqlx::query(
            "UPDATE integration_configs SET doc = ?, version = ?, active = ? WHERE id = ? AND version = ?",
        )
        .bind(&doc)
        .bind(next_version)
        .bind(value.active as i64)
        .bind(id.to_string())
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: expected_version,
            });
        }
        Ok(next_version as u64)
    }
}

#[async_trait]
impl EventAuditStore for SqliteStore {
    async fn record(&self, event_id: &EventId, tenant_id: &TenantId, note: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO event_audit (event_id, tenant_id, note, recorded_at) VALUES (?, ?, ?, ?)")
            .bind(event_id.to_string())
            .bind(tenant_id.to_string())
            .bind(note)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}

#[async_trait]
impl DeliveryLogStore for SqliteStore {
    async fn get(&self, id: &Uuid) -> Result<DeliveryLog, StoreError> {
        let row = sqlx::query("SELECT doc FROM execution_logs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let doc: String = row.try_get("doc").map_err(backend_err)?;
        serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn upsert(&self, log: DeliveryLog) -> Result<(), StoreError> {
        let doc = serde_json::to_string(&log).map_err(|e| StoreError::Backend(e.to_string()))?;
        let status = format!("{:?}", log.status);
        sqlx::query(
            "INSERT INTO execution_logs (id, status, doc) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET status = excluded.status, doc = excluded.doc",
        )
        .bind(log.id.to_string())
        .bind(status)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn list_retrying_batch(&self, limit: usize) -> Result<Vec<DeliveryLog>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM execution_logs WHERE status = 'Retrying' LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.into_iter()
            .map(|r| {
                let doc: String = r.try_get("doc").map_err(backend_err)?;
                serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl ScheduledItemStore for SqliteStore {
    async fn insert(&self, item: ScheduledItem) -> Result<(), StoreError> {
        let doc = serde_json::to_string(&item).map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            "INSERT INTO scheduled_integrations (id, tenant_id, state, scheduled_for, cancellation_match_key, version, doc)
             VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(item.id.to_string())
        .bind(item.tenant_id.to_string())
        .bind(format!("{:?}", item.state))
        .bind(item.scheduled_for.to_rfc3339())
        .bind(item.cancellation_match_key.clone())
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(())
    }

    async fn claim_due_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Versioned<ScheduledItem>>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, version FROM scheduled_integrations WHERE state = 'Pending' AND scheduled_for <= ?
             ORDER BY scheduled_for ASC LIMIT ?",
        )
        .bind(now.to_rfc3339())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_err)?;

        let mut claimed = Vec::new();
        for row in rows {
            let id: String = row.try_get("id").map_err(backend_err)?;
            let version: i64 = row.try_get("version").map_err(backend_err)?;
            let result = sqlx::query(
                "UPDATE scheduled_integrations SET state = 'Processing', version = ? WHERE id = ? AND version = ? AND state = 'Pending'",
            )
            .bind(version + 1)
            .bind(&id)
            .bind(version)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
            if result.rows_affected() == 1 {
                let doc_row = sqlx::query("SELECT doc FROM scheduled_integrations WHERE id = ?")
                    .bind(&id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(backend_err)?;
                let doc: String = doc_row.try_get("doc").map_err(backend_err)?;
                let mut item: ScheduledItem =
                    serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))?;
                item.state = ScheduledItemState::Processing;
                let updated_doc = serde_json::to_string(&item).map_err(|e| StoreError::Backend(e.to_string()))?;
                sqlx::query("UPDATE scheduled_integrations SET doc = ? WHERE id = ?")
                    .bind(updated_doc)
                    .bind(&id)
                    .execute(&self.pool)
                    .await
                    .map_err(backend_err)?;
                claimed.push(Versioned { value: item, version: (version + 1) as u64 });
            }
        }
        Ok(claimed)
    }

    async fn reset_stuck_processing(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let rows = sqlx::query("SELECT id, doc FROM scheduled_integrations WHERE state = 'Processing'")
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        let mut reset = 0u64;
        for row in rows {
            let id: String = row.try_get("id").map_err(backend_err)?;
            let doc: String = row.try_get("doc").map_err(backend_err)?;
            let item: ScheduledItem = serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))?;
            let stuck = item.last_attempt_at.map(|t| t < older_than).unwrap_or(true);
            if stuck {
                sqlx::query("UPDATE scheduled_integrations SET state = 'Pending' WHERE id = ?")
                    .bind(&id)
                    .execute(&self.pool)
                    .await
                    .map_err(backend_err)?;
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn update_if(&self, id: &Uuid, expected_version: u64, next: ScheduledItem) -> Result<u64, StoreError> {
        let doc = serde_json::to_string(&next).map_err(|e| StoreError::Backend(e.to_string()))?;
        let next_version = expected_version as i64 + 1;
        let result = sqlx::query(
            "UPDATE scheduled_integrations SET doc = ?, state = ?, scheduled_for = ?, cancellation_match_key = ?, version = ?
             WHERE id = ? AND version = ?",
        )
        .bind(&doc)
        .bind(format!("{:?}", next.state))
        .bind(next.scheduled_for.to_rfc3339())
        .bind(next.cancellation_match_key.clone())
        .bind(next_version)
        .bind(id.to_string())
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::VersionConflict { id: id.to_string(), expected: expected_version, actual: expected_version });
        }
        Ok(next_version as u64)
    }

    async fn cancel_by_match_key(&self, tenant_id: &TenantId, match_key: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE scheduled_integrations SET state = 'Cancelled', version = version + 1
             WHERE tenant_id = ? AND cancellation_match_key = ? AND state = 'Pending'",
        )
        .bind(tenant_id.to_string())
        .bind(match_key)
        .execute(&self.pool)
        .await
        .map_err(backend_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl DlqStore for SqliteStore {
    async fn insert(&self, entry: DlqEntry) -> Result<(), StoreError> {
        let doc = serde_json::to_string(&entry).map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("INSERT INTO dlq (id, status, next_retry_at, doc) VALUES (?, ?, ?, ?)")
            .bind(entry.id.to_string())
            .bind(format!("{:?}", entry.status))
            .bind(entry.next_retry_at.to_rfc3339())
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn claim_due_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<DlqEntry>, StoreError> {
        let rows = sqlx::query("SELECT id FROM dlq WHERE status = 'Pending' AND next_retry_at <= ? LIMIT ?")
            .bind(now.to_rfc3339())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        let mut claimed = Vec::new();
        for row in rows {
            let id: String = row.try_get("id").map_err(backend_err)?;
            let result = sqlx::query("UPDATE dlq SET status = 'Retrying' WHERE id = ? AND status = 'Pending'")
                .bind(&id)
                .execute(&self.pool)
                .await
                .map_err(backend_err)?;
            if result.rows_affected() == 1 {
                let doc_row = sqlx::query("SELECT doc FROM dlq WHERE id = ?")
                    .bind(&id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(backend_err)?;
                let doc: String = doc_row.try_get("doc").map_err(backend_err)?;
                let mut entry: DlqEntry = serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))?;
                entry.status = DlqStatus::Retrying;
                claimed.push(entry);
            }
        }
        Ok(claimed)
    }

    async fn update_status(
        &self,
        id: &Uuid,
        status: DlqStatus,
        retry_count: u32,
        next_retry_at: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        let doc_row = sqlx::query("SELECT doc FROM dlq WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(backend_err)?;
        let doc: String = doc_row.try_get("doc").map_err(backend_err)?;
        let mut entry: DlqEntry = serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))?;
        entry.status = status;
        entry.retry_count = retry_count;
        if let Some(next) = next_retry_at {
            entry.next_retry_at = next;
        }
        let updated_doc = serde_json::to_string(&entry).map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::query("UPDATE dlq SET status = ?, next_retry_at = ?, doc = ? WHERE id = ?")
            .bind(format!("{:?}", status))
            .bind(entry.next_retry_at.to_rfc3339())
            .bind(updated_doc)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn list_by_tenant(&self, tenant_id: &TenantId) -> Result<Vec<DlqEntry>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM dlq").fetch_all(&self.pool).await.map_err(backend_err)?;
        let mut entries = Vec::new();
        for row in rows {
            let doc: String = row.try_get("doc").map_err(backend_err)?;
            let entry: DlqEntry = serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))?;
            if entry.tenant_id == *tenant_id {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl ProcessedEventStore for SqliteStore {
    async fn record_if_new(&self, record: DedupRecord) -> Result<bool, StoreError> {
        let doc = serde_json::to_string(&record).map_err(|e| StoreError::Backend(e.to_string()))?;
        let result = sqlx::query("INSERT OR IGNORE INTO processed_events (fingerprint, doc) VALUES (?, ?)")
            .bind(record.fingerprint.to_string())
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl ScheduledJobLogStore for SqliteStore {
    async fn append(&self, log: ScheduledJobLog) -> Result<(), StoreError> {
        let doc = serde_json::to_string(&log).map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("INSERT INTO scheduled_job_logs (id, doc) VALUES (?, ?)")
            .bind(log.id.to_string())
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}

#[async_trait]
impl EventSourceConfigStore for SqliteStore {
    async fn get_for_tenant(&self, tenant_id: &TenantId) -> Result<Option<serde_json::Value>, StoreError> {
        let row = sqlx::query("SELECT doc FROM event_source_configs WHERE tenant_id = ?")
            .bind(tenant_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        row.map(|r| {
            let doc: String = r.try_get("doc").map_err(backend_err)?;
            serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))
        })
        .transpose()
    }

    async fn get_default(&self) -> Result<Option<serde_json::Value>, StoreError> {
        let row = sqlx::query("SELECT doc FROM default_source_config WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        row.map(|r| {
            let doc: String = r.try_get("doc").map_err(backend_err)?;
            serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))
        })
        .transpose()
    }
}

#[async_trait]
impl EventTypeStore for SqliteStore {
    async fn is_known(&self, event_type: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM event_types WHERE event_type = ?")
            .bind(event_type)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl PendingDeliveryStore for SqliteStore {
    async fn enqueue(&self, delivery: PendingDelivery) -> Result<(), StoreError> {
        let doc = serde_json::to_string(&delivery).map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query("INSERT INTO pending_deliveries (id, doc) VALUES (?, ?)")
            .bind(delivery.id.to_string())
            .bind(doc)
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn claim_batch(&self, limit: usize) -> Result<Vec<PendingDelivery>, StoreError> {
        let rows = sqlx::query("SELECT doc FROM pending_deliveries LIMIT ?")
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(backend_err)?;
        rows.into_iter()
            .map(|r| {
                let doc: String = r.try_get("doc").map_err(backend_err)?;
                serde_json::from_str(&doc).map_err(|e| StoreError::Backend(e.to_string()))
            })
            .collect()
    }

    async fn complete(&self, id: &Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM pending_deliveries WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(backend_err)?;
        Ok(())
    }
}
