use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cron::Schedule;
use gateway_delivery::{DeliveryEngine, DeliveryOptions, DeliveryStore};
use gateway_rate_limiter::RateLimitStorage;
use gateway_store_core::{IntegrationConfigStore, ScheduledJobLog, ScheduledJobLogStore};
use gateway_types::{
    DataSourceConfig, DeliveryStatus, Event, EventId, EventStatus, IntegrationConfig, JobSchedule,
    SourceName, TraceId, TriggerType,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::data_source::JobExecutor;
use crate::error::JobWorkerError;

const SNAPSHOT_LIMIT: usize = 50 * 1024;

/// Union of store traits the scheduled-job worker depends on.
pub trait JobWorkerStore: DeliveryStore + ScheduledJobLogStore {}
impl<T: DeliveryStore + ScheduledJobLogStore> JobWorkerStore for T {}

/// Tunables for one scheduled-job worker instance (§4.15).
#[derive(Debug, Clone)]
pub struct JobWorkerConfig {
    /// How often `tick` runs when driven by `spawn_loop`. The spec floors a
    /// job's own cadence at 60s; this is the worker's polling granularity,
    /// independent of any one job's schedule.
    pub interval_ms: u64,
}

impl Default for JobWorkerConfig {
    fn default() -> Self {
        Self { interval_ms: 60_000 }
    }
}

/// Ticks every active SCHEDULED-JOB integration whose `next_run_at` has
/// passed: fetches from its configured data source, wraps the result,
/// delivers it through the normal transform/auth pipeline, and computes the
/// job's next due time.
pub struct ScheduledJobWorker<Store, RL>
where
    Store: JobWorkerStore + Send + Sync + 'static,
    RL: RateLimitStorage,
{
    store: Arc<Store>,
    delivery: Arc<DeliveryEngine<Store, RL>>,
    executor: JobExecutor,
    config: JobWorkerConfig,
}

impl<Store, RL> ScheduledJobWorker<Store, RL>
where
    Store: JobWorkerStore + Send + Sync + 'static,
    RL: RateLimitStorage + Send + Sync + 'static,
{
    /// Builds a worker with default tunables.
    pub fn new(store: Arc<Store>, delivery: Arc<DeliveryEngine<Store, RL>>, executor: JobExecutor) -> Self {
        Self { store, delivery, executor, config: JobWorkerConfig::default() }
    }

    /// Overrides the default tunables.
    pub fn with_config(mut self, config: JobWorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawns a background task ticking every `interval_ms`.
    pub fn spawn_loop(self: Arc<Self>) -> JoinHandle<()> {
        let interval = std::time::Duration::from_millis(self.config.interval_ms);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.tick().await {
                    tracing::error!(%err, "scheduled-job worker tick failed");
                }
            }
        })
    }

    /// Runs one pass: lists active SCHEDULED-JOB integrations and executes
    /// whichever ones are due.
    pub async fn tick(&self) -> Result<(), JobWorkerError> {
        let now = Utc::now();
        let jobs = self.store.list_active_scheduled_jobs().await?;
        for versioned in jobs {
            let due = versioned.value.next_run_at.map(|at| at <= now).unwrap_or(true);
            if !due {
                continue;
            }
            let id = versioned.value.id.clone();
            if let Err(err) = self.execute_job(versioned, now).await {
                tracing::error!(integration_id = %id, %err, "scheduled job execution failed");
            }
        }
        Ok(())
    }

    async fn execute_job(
        &self,
        versioned: gateway_store_core::Versioned<IntegrationConfig>,
        now: DateTime<Utc>,
    ) -> Result<(), JobWorkerError> {
        let id = versioned.value.id;
        let version = versioned.version;

        let outcome = self.run_and_deliver(&versioned, now).await;

        let next_run_at = self.compute_next_run_at(&versioned.value, now);
        self.store.update_next_run_at_if(&id, version, next_run_at).await?;

        outcome
    }

    async fn run_and_deliver(&self, versioned: &gateway_store_core::Versioned<IntegrationConfig>, now: DateTime<Utc>) -> Result<(), JobWorkerError> {
        let integration = &versioned.value;
        let source = integration.data_source.as_ref().ok_or(JobWorkerError::NoDataSource)?;

        let fetch_result = self.executor.execute(source, &integration.job_params, now).await;
        let records = match fetch_result {
            Ok(records) => records,
            Err(err) => {
                self.append_log(integration, now, 0, &Value::Null, &err.to_string()).await;
                return Err(err);
            }
        };

        let payload = json!({
            "data": records,
            "metadata": {
                "jobId": integration.id.to_string(),
                "jobName": integration.name,
                "executedAt": now.to_rfc3339(),
                "recordCount": records.len(),
            }
        });

        let event = Event {
            id: EventId::new(),
            event_type: "scheduled_job".to_string(),
            tenant_id: integration.tenant_id,
            payload: payload.clone(),
            source_name: SourceName::HttpPush,
            source_metadata: Value::Null,
            received_at: now,
            attempt_count: 0,
            is_replay: false,
            status: EventStatus::Processing,
        };

        let options = DeliveryOptions {
            trace_id: TraceId::new(),
            trigger_type: TriggerType::ScheduledJob,
            existing_log_id: None,
            is_test_event: false,
            force_delivery: false,
        };

        let delivery_result = self.delivery.deliver_single_action(&versioned, None, &event, 1, &options).await;

        let outcome = match &delivery_result {
            Ok(outcome) if matches!(outcome.status, DeliveryStatus::Success | DeliveryStatus::Skipped) => "success".to_string(),
            Ok(outcome) => format!("delivery status {:?}", outcome.status),
            Err(err) => err.to_string(),
        };
        self.append_log(integration, now, records.len(), &payload, &outcome).await;

        delivery_result.map(|_| ()).map_err(JobWorkerError::from)
    }

    async fn append_log(&self, integration: &IntegrationConfig, now: DateTime<Utc>, record_count: usize, payload: &Value, outcome: &str) {
        let log = ScheduledJobLog {
            id: Uuid::new_v4(),
            integration_id: integration.id.clone(),
            tenant_id: integration.tenant_id,
            job_name: integration.name.clone(),
            executed_at: now,
            record_count,
            fetched_data_snapshot: truncate_snapshot(payload),
            transformed_payload_snapshot: truncate_snapshot(payload),
            outcome: outcome.to_string(),
        };
        if let Err(err) = self.store.append(log).await {
            tracing::error!(integration_id = %integration.id, %err, "failed to append scheduled-job log");
        }
    }

    fn compute_next_run_at(&self, integration: &IntegrationConfig, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match &integration.job_schedule {
            Some(JobSchedule::Interval { interval_ms }) => {
                let floor_ms = (*interval_ms).max(60_000);
                Some(now + chrono::Duration::milliseconds(floor_ms as i64))
            }
            Some(JobSchedule::Cron { expression, .. }) => match compute_next_cron(expression, now) {
                Ok(next) => Some(next),
                Err(err) => {
                    tracing::error!(integration_id = %integration.id, %err, "invalid cron expression, job will not be rescheduled");
                    None
                }
            },
            None => None,
        }
    }
}

fn truncate_snapshot(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.len() > SNAPSHOT_LIMIT {
        rendered.chars().take(SNAPSHOT_LIMIT).collect()
    } else {
        rendered
    }
}

/// `cron`'s parser expects a leading seconds field; the stored expression is
/// the standard 5-field minute-resolution form, so a `0` seconds field is
/// prepended. Occurrences are computed in UTC: the configured `timezone` is
/// carried on `JobSchedule::Cron` for fidelity to the stored config shape but
/// isn't applied to the occurrence math (see scheduled-job-worker design
/// notes).
fn compute_next_cron(expression: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>, JobWorkerError> {
    let normalized = if expression.split_whitespace().count() == 5 {
        format!("0 {expression}")
    } else {
        expression.to_string()
    };
    let schedule = Schedule::from_str(&normalized)
        .map_err(|err| JobWorkerError::InvalidCron(expression.to_string(), err.to_string()))?;
    schedule
        .after(&after)
        .next()
        .ok_or_else(|| JobWorkerError::InvalidCron(expression.to_string(), "schedule has no further occurrences".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_schedule_is_floored_at_sixty_seconds() {
        let integration = sample_integration(Some(JobSchedule::Interval { interval_ms: 5_000 }));
        let now = Utc::now();
        let worker_next = floored_interval_next(&integration, now);
        assert_eq!(worker_next, now + chrono::Duration::seconds(60));
    }

    #[test]
    fn cron_schedule_computes_next_occurrence() {
        let now = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let next = compute_next_cron("0 0 * * *", now).unwrap();
        assert!(next > now);
    }

    #[test]
    fn invalid_cron_expression_is_reported() {
        let now = Utc::now();
        let result = compute_next_cron("not a cron expression", now);
        assert!(result.is_err());
    }

    fn floored_interval_next(integration: &IntegrationConfig, now: DateTime<Utc>) -> DateTime<Utc> {
        match &integration.job_schedule {
            Some(JobSchedule::Interval { interval_ms }) => now + chrono::Duration::milliseconds((*interval_ms).max(60_000) as i64),
            _ => panic!("expected interval schedule"),
        }
    }

    fn sample_integration(job_schedule: Option<JobSchedule>) -> IntegrationConfig {
        use gateway_types::{
            AuthBlock, AuthKind, CircuitState, DeliveryMode, Direction, IntegrationId, TenantId,
            TransformConfig, TransformMode,
        };
        IntegrationConfig {
            id: IntegrationId::new(),
            tenant_id: TenantId::new(),
            name: "nightly export".to_string(),
            trigger_event_types: vec![],
            direction: Direction::Scheduled,
            delivery_mode: DeliveryMode::ScheduledJob,
            target_url: Some("https://example.com/ingest".to_string()),
            http_method: "POST".to_string(),
            timeout_ms: 10_000,
            max_retries: 3,
            auth: AuthBlock { kind: AuthKind::None, expiry_marker: None },
            signing_secrets: vec![],
            rate_limit: None,
            actions: vec![],
            transform: TransformConfig { mode: TransformMode::Script { source: "payload".to_string() }, lookups: vec![] },
            response_transform: None,
            active: true,
            multi_action_delay_ms: 0,
            schedule_script: None,
            circuit: CircuitState::default(),
            cached_token: None,
            data_source: None,
            job_schedule,
            job_params: Value::Null,
            next_run_at: None,
        }
    }
}
