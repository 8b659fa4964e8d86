#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-store-memory** – `DashMap`-backed implementation of every
//! `gateway-store-core` trait, used in tests and as the default
//! development backend.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
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

/// An in-memory, `DashMap`-backed store covering every collection in
/// `gateway-store-core`.
///
/// Cloning shares the underlying maps (`Arc` internally); use one instance
/// per process/test, not per call.
#[derive(Clone, Default)]
pub struct MemoryStore {
    integrations: Arc<DashMap<IntegrationId, Versioned<IntegrationConfig>>>,
    audit: Arc<DashMap<EventId, Vec<(DateTime<Utc>, String)>>>,
    logs: Arc<DashMap<Uuid, DeliveryLog>>,
    scheduled_items: Arc<DashMap<Uuid, Versioned<ScheduledItem>>>,
    dlq: Arc<DashMap<Uuid, DlqEntry>>,
    processed_events: Arc<DashMap<EventFingerprint, DedupRecord>>,
    scheduled_job_logs: Arc<DashMap<Uuid, ScheduledJobLog>>,
    source_configs_by_tenant: Arc<DashMap<TenantId, serde_json::Value>>,
    default_source_config: Arc<std::sync::RwLock<Option<serde_json::Value>>>,
    known_event_types: Arc<DashMap<String, ()>>,
    pending_deliveries: Arc<DashMap<Uuid, PendingDelivery>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an integration config directly, for test setup.
    pub fn seed_integration(&self, config: IntegrationConfig) {
        self.integrations.insert(config.id, Versioned::new(config));
    }

    /// Sets the process-wide default source config, for test setup.
    pub fn seed_default_source_config(&self, config: serde_json::Value) {
        *self.default_source_config.write().expect("lock poisoned") = Some(config);
    }

    /// Marks an event type as known, for test setup.
    pub fn seed_known_event_type(&self, event_type: impl Into<String>) {
        self.known_event_types.insert(event_type.into(), ());
    }
}

#[async_trait]
impl IntegrationConfigStore for MemoryStore {
    async fn get(&self, id: &IntegrationId) -> Result<Versioned<IntegrationConfig>, StoreError> {
        self.integrations
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn find_active_by_event_type(
        &self,
        tenant_id: &TenantId,
        event_type: &str,
    ) -> Result<Vec<Versioned<IntegrationConfig>>, StoreError> {
        Ok(self
            .integrations
            .iter()
            .filter(|entry| {
                let cfg = &entry.value().value;
                cfg.tenant_id == *tenant_id
                    && cfg.active
                    && cfg.trigger_event_types.iter().any(|t| t == event_type)
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn update_circuit_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next: CircuitState,
    ) -> Result<u64, StoreError> {
        let mut entry = self.integrations.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: entry.version,
            });
        }
        let mut value = entry.value.clone();
        value.circuit = next;
        *entry = entry.bump(value);
        Ok(entry.version)
    }

    async fn update_token_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next: Option<AuthTokenCache>,
    ) -> Result<u64, StoreError> {
        let mut entry = self.integrations.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: entry.version,
            });
        }
        let mut value = entry.value.clone();
        value.cached_token = next;
        *entry = entry.bump(value);
        Ok(entry.version)
    }

    async fn list_tenant_ids(&self) -> Result<Vec<TenantId>, StoreError> {
        let mut ids: Vec<TenantId> = self.integrations.iter().map(|e| e.value().value.tenant_id).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    async fn list_active_scheduled_jobs(&self) -> Result<Vec<Versioned<IntegrationConfig>>, StoreError> {
        Ok(self
            .integrations
            .iter()
            .map(|e| e.value().clone())
            .filter(|v| v.value.active && v.value.delivery_mode == DeliveryMode::ScheduledJob)
            .collect())
    }

    async fn update_next_run_at_if(
        &self,
        id: &IntegrationId,
        expected_version: u64,
        next_run_at: Option<DateTime<Utc>>,
    ) -> Result<u64, StoreError> {
        let mut entry = self.integrations.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: entry.version,
            });
        }
        let mut value = entry.value.clone();
        value.next_run_at = next_run_at;
        *entry = entry.bump(value);
        Ok(entry.version)
    }
}

#[async_trait]
impl EventAuditStore for MemoryStore {
    async fn record(&self, event_id: &EventId, _tenant_id: &TenantId, note: &str) -> Result<(), StoreError> {
        self.audit.entry(event_id.clone()).or_default().push((Utc::now(), note.to_string()));
        Ok(())
    }
}

#[async_trait]
impl DeliveryLogStore for MemoryStore {
    async fn get(&self, id: &Uuid) -> Result<DeliveryLog, StoreError> {
        self.logs.get(id).map(|e| e.clone()).ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn upsert(&self, log: DeliveryLog) -> Result<(), StoreError> {
        self.logs.insert(log.id, log);
        Ok(())
    }

    async fn list_retrying_batch(&self, limit: usize) -> Result<Vec<DeliveryLog>, StoreError> {
        Ok(self
            .logs
            .iter()
            .filter(|e| e.value().status == gateway_types::DeliveryStatus::Retrying)
            .take(limit)
            .map(|e| e.value().clone())
            .collect())
    }
}

#[async_trait]
impl ScheduledItemStore for MemoryStore {
    async fn insert(&self, item: ScheduledItem) -> Result<(), StoreError> {
        self.scheduled_items.insert(item.id, Versioned::new(item));
        Ok(())
    }

    async fn claim_due_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Versioned<ScheduledItem>>, StoreError> {
        let mut due: Vec<_> = self
            .scheduled_items
            .iter()
            .filter(|e| e.value().value.state == ScheduledItemState::Pending && e.value().value.scheduled_for <= now)
            .map(|e| (*e.key(), e.value().value.scheduled_for))
            .collect();
        due.sort_by_key(|(_, scheduled_for)| *scheduled_for);
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for (id, _) in due {
            if let Some(mut entry) = self.scheduled_items.get_mut(&id) {
                if entry.value.state == ScheduledItemState::Pending {
                    let mut next = entry.value.clone();
                    next.state = ScheduledItemState::Processing;
                    *entry = entry.bump(next);
                    claimed.push(Versioned { value: entry.value.clone(), version: entry.version });
                }
            }
        }
        Ok(claimed)
    }

    async fn reset_stuck_processing(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut reset = 0u64;
        for mut entry in self.scheduled_items.iter_mut() {
            let is_stuck = entry.value.state == ScheduledItemState::Processing
                && entry.value.last_attempt_at.map(|t| t < older_than).unwrap_or(true);
            if is_stuck {
                let mut next = entry.value.clone();
                next.state = ScheduledItemState::Pending;
                *entry = entry.bump(next);
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn update_if(&self, id: &Uuid, expected_version: u64, next: ScheduledItem) -> Result<u64, StoreError> {
        let mut entry = self.scheduled_items.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if entry.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: entry.version,
            });
        }
        *entry = entry.bump(next);
        Ok(entry.version)
    }

    async fn cancel_by_match_key(&self, tenant_id: &TenantId, match_key: &str) -> Result<u64, StoreError> {
        let mut cancelled = 0u64;
        for mut entry in self.scheduled_items.iter_mut() {
            let matches = entry.value.tenant_id == *tenant_id
                && entry.value.state == ScheduledItemState::Pending
                && entry.value.cancellation_match_key.as_deref() == Some(match_key);
            if matches {
                let mut next = entry.value.clone();
                next.state = ScheduledItemState::Cancelled;
                *entry = entry.bump(next);
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }
}

#[async_trait]
impl DlqStore for MemoryStore {
    async fn insert(&self, entry: DlqEntry) -> Result<(), StoreError> {
        self.dlq.insert(entry.id, entry);
        Ok(())
    }

    async fn claim_due_batch(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<DlqEntry>, StoreError> {
        let mut due: Vec<Uuid> = self
            .dlq
            .iter()
            .filter(|e| e.value().status == DlqStatus::Pending && e.value().next_retry_at <= now)
            .map(|e| *e.key())
            .collect();
        due.truncate(limit);
        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(mut entry) = self.dlq.get_mut(&id) {
                if entry.status == DlqStatus::Pending {
                    entry.status = DlqStatus::Retrying;
                    claimed.push(entry.clone());
                }
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
        let mut entry = self.dlq.get_mut(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        entry.status = status;
        entry.retry_count = retry_count;
        if let Some(next) = next_retry_at {
            entry.next_retry_at = next;
        }
        Ok(())
    }

    async fn list_by_tenant(&self, tenant_id: &TenantId) -> Result<Vec<DlqEntry>, StoreError> {
        Ok(self.dlq.iter().filter(|e| e.value().tenant_id == *tenant_id).map(|e| e.value().clone()).collect())
    }
}

#[async_trait]
impl ProcessedEventStore for MemoryStore {
    async fn record_if_new(&self, record: DedupRecord) -> Result<bool, StoreError> {
        match self.processed_events.entry(record.fingerprint.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(true)
            }
        }
    }
}

#[async_trait]
impl ScheduledJobLogStore for MemoryStore {
    async fn append(&self, log: ScheduledJobLog) -> Result<(), StoreError> {
        self.scheduled_job_logs.insert(log.id, log);
        Ok(())
    }
}

#[async_trait]
impl EventSourceConfigStore for MemoryStore {
    async fn get_for_tenant(&self, tenant_id: &TenantId) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.source_configs_by_tenant.get(tenant_id).map(|e| e.value().clone()))
    }

    async fn get_default(&self) -> Result<Option<serde_json::Value>, StoreError> {
        Ok(self.default_source_config.read().expect("lock poisoned").clone())
    }
}

#[async_trait]
impl EventTypeStore for MemoryStore {
    async fn is_known(&self, event_type: &str) -> Result<bool, StoreError> {
        Ok(self.known_event_types.contains_key(event_type))
    }
}

#[async_trait]
impl PendingDeliveryStore for MemoryStore {
    async fn enqueue(&self, delivery: PendingDelivery) -> Result<(), StoreError> {
        self.pending_deliveries.insert(delivery.id, delivery);
        Ok(())
    }

    async fn claim_batch(&self, limit: usize) -> Result<Vec<PendingDelivery>, StoreError> {
        Ok(self.pending_deliveries.iter().take(limit).map(|e| e.value().clone()).collect())
    }

    async fn complete(&self, id: &Uuid) -> Result<(), StoreError> {
        self.pending_deliveries.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_types::{
        AuthBlock, AuthKind, Direction, SimpleMapping, TransformConfig, TransformKind,
        TransformMode,
    };

    fn sample_integration() -> IntegrationConfig {
        IntegrationConfig {
            id: IntegrationId::new(),
            tenant_id: TenantId::new(),
            name: "test".to_string(),
            trigger_event_types: vec!["order.created".to_string()],
            direction: Direction::Outbound,
            delivery_mode: gateway_types::DeliveryMode::Immediate,
            target_url: Some("https://example.com/hook".to_string()),
            http_method: "POST".to_string(),
            timeout_ms: 10_000,
            max_retries: 3,
            auth: AuthBlock { kind: AuthKind::None, expiry_marker: None },
            signing_secrets: vec![],
            rate_limit: None,
            actions: vec![],
            transform: TransformConfig {
                mode: TransformMode::Simple {
                    mappings: vec![SimpleMapping {
                        source_field: "x".to_string(),
                        target_field: "y".to_string(),
                        transform: TransformKind::Identity,
                        default_value: None,
                        lookup_type: None,
                    }],
                    static_fields: vec![],
                },
                lookups: vec![],
            },
            response_transform: None,
            active: true,
            multi_action_delay_ms: 0,
            schedule_script: None,
            circuit: CircuitState::default(),
            cached_token: None,
            data_source: None,
            job_schedule: None,
            job_params: serde_json::Value::Null,
            next_run_at: None,
        }
    }

    #[tokio::test]
    async fn find_active_matches_tenant_and_event_type() {
        let store = MemoryStore::new();
        let cfg = sample_integration();
        let tenant = cfg.tenant_id;
        store.seed_integration(cfg);

        let found = store.find_active_by_event_type(&tenant, "order.created").await.unwrap();
        assert_eq!(found.len(), 1);

        let none = store.find_active_by_event_type(&tenant, "order.cancelled").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn update_circuit_if_rejects_stale_version() {
        let store = MemoryStore::new();
        let cfg = sample_integration();
        let id = cfg.id;
        store.seed_integration(cfg);

        store.update_circuit_if(&id, 0, CircuitState::default()).await.unwrap();
        let err = store.update_circuit_if(&id, 0, CircuitState::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn record_if_new_detects_duplicate_fingerprint() {
        let store = MemoryStore::new();
        let fp = EventFingerprint::compute("t", &serde_json::json!({"a": 1}), "tenant-1");
        let first = store
            .record_if_new(DedupRecord { fingerprint: fp.clone(), first_seen_at: Utc::now(), event_id: EventId::from("e1") })
            .await
            .unwrap();
        let second = store
            .record_if_new(DedupRecord { fingerprint: fp, first_seen_at: Utc::now(), event_id: EventId::from("e2") })
            .await
            .unwrap();
        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn claim_due_batch_only_claims_due_pending_items() {
        let store = MemoryStore::new();
        let cfg = sample_integration();
        let item = ScheduledItem {
            id: Uuid::new_v4(),
            integration_id: cfg.id,
            tenant_id: cfg.tenant_id,
            original_event_id: EventId::from("e1"),
            scheduled_for: Utc::now() - chrono::Duration::seconds(5),
            transformed_payload: serde_json::json!({}),
            target_url: "https://example.com".to_string(),
            recurrence: None,
            cancellation_match_key: None,
            state: ScheduledItemState::Pending,
            attempt_count: 0,
            last_attempt_at: None,
            created_at: Utc::now(),
        };
        store.insert(item.clone()).await.unwrap();

        let claimed = store.claim_due_batch(Utc::now(), 10).await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].value.state, ScheduledItemState::Processing);

        let claimed_again = store.claim_due_batch(Utc::now(), 10).await.unwrap();
        assert!(claimed_again.is_empty());
    }
}
