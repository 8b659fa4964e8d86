//! Shared fixtures for the scenario suite.
//!
//! `gateway-delivery`'s SSRF guard rejects loopback targets, which rules out
//! pointing a real HTTP target at a locally-bound test server. Scenarios
//! that need deterministic target behaviour drive a communication action
//! through [`ScriptedChannel`] instead — same transform/rate-limit/circuit/
//! log/DLQ machinery as an HTTP action, without the network dependency.

use std::sync::Mutex;

use async_trait::async_trait;
use gateway_delivery::ChannelAdapterRegistry;
use gateway_types::{
    Action, ActionKind, AuthBlock, AuthKind, CircuitState, CommunicationChannel, DeliveryMode,
    Direction, IntegrationConfig, IntegrationId, SimpleMapping, StaticField, TenantId,
    TransformConfig, TransformKind, TransformMode,
};
use serde_json::json;

/// A [`ChannelAdapterRegistry`] that replays a fixed queue of results, one
/// per `send` call, and records every payload it was asked to send.
pub struct ScriptedChannel {
    results: Mutex<Vec<Result<String, String>>>,
    received: Mutex<Vec<serde_json::Value>>,
}

impl ScriptedChannel {
    /// Replays `results` in order. A call past the end of the queue fails
    /// rather than panicking, so a test can assert on "called too often"
    /// instead of crashing.
    pub fn new(results: Vec<Result<String, String>>) -> Self {
        let mut results = results;
        results.reverse();
        Self { results: Mutex::new(results), received: Mutex::new(Vec::new()) }
    }

    /// Every payload passed to `send`, in call order.
    pub fn received(&self) -> Vec<serde_json::Value> {
        self.received.lock().expect("lock poisoned").clone()
    }

    /// Number of times `send` has been called.
    pub fn call_count(&self) -> usize {
        self.received.lock().expect("lock poisoned").len()
    }
}

#[async_trait]
impl ChannelAdapterRegistry for ScriptedChannel {
    async fn send(&self, _channel: &str, _provider_key: &str, payload: &serde_json::Value, _adapter_config: &serde_json::Value) -> Result<String, String> {
        self.received.lock().expect("lock poisoned").push(payload.clone());
        self.results.lock().expect("lock poisoned").pop().unwrap_or_else(|| Err("ScriptedChannel exhausted".to_string()))
    }
}

/// A minimal, `ActionKind::Communication`-only integration: one action named
/// `notify`, no top-level `target_url`. Callers override whatever fields the
/// scenario needs.
pub fn communication_integration(tenant_id: TenantId) -> IntegrationConfig {
    IntegrationConfig {
        id: IntegrationId::new(),
        tenant_id,
        name: "scenario-under-test".to_string(),
        trigger_event_types: vec!["order.created".to_string()],
        direction: Direction::Outbound,
        delivery_mode: DeliveryMode::Immediate,
        target_url: None,
        http_method: "POST".to_string(),
        timeout_ms: 5_000,
        max_retries: 2,
        auth: AuthBlock { kind: AuthKind::None, expiry_marker: None },
        signing_secrets: vec![],
        rate_limit: None,
        actions: vec![notify_action()],
        transform: simple_transform(),
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

/// `notify` action: a single `email`/`GMAIL_OAUTH` communication step.
pub fn notify_action() -> Action {
    Action {
        name: "notify".to_string(),
        index: 0,
        kind: ActionKind::Communication {
            channel: CommunicationChannel { channel: "email".to_string(), provider: "GMAIL_OAUTH".to_string(), adapter_config: json!({}) },
        },
        transform: None,
        auth: None,
        condition: None,
    }
}

/// A RECURRING integration driving `schedule_script` against the same
/// payload shape as [`communication_integration`], targeting `target_url`
/// (scheduling only ever persists this url, never dials it, so a loopback
/// value is fine here unlike an HTTP delivery target).
pub fn recurring_integration(tenant_id: TenantId, schedule_script: &str, target_url: &str) -> IntegrationConfig {
    IntegrationConfig {
        delivery_mode: DeliveryMode::Recurring,
        target_url: Some(target_url.to_string()),
        schedule_script: Some(schedule_script.to_string()),
        ..communication_integration(tenant_id)
    }
}

/// SIMPLE transform: maps `x` -> `y` and stamps a `src: "gw"` static field.
pub fn simple_transform() -> TransformConfig {
    TransformConfig {
        mode: TransformMode::Simple {
            mappings: vec![SimpleMapping {
                source_field: "x".to_string(),
                target_field: "y".to_string(),
                transform: TransformKind::Identity,
                default_value: None,
                lookup_type: None,
            }],
            static_fields: vec![StaticField { key: "src".to_string(), value: json!("gw") }],
        },
        lookups: vec![],
    }
}
