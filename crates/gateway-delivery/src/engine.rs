use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gateway_auth::AuthBuilder;
use gateway_bus_core::{GatewayBus, GatewayEvent};
use gateway_circuit_breaker::{CircuitBreaker, FailureClass};
use gateway_rate_limiter::{RateLimitStorage, RateLimiter};
use gateway_signature::sign;
use gateway_store_core::{DeliveryLogStore, DlqStore, IntegrationConfigStore, Versioned};
use gateway_transformer::{LookupProvider, NoLookups, Transformer};
use gateway_types::{
    Action, ActionKind, DeliveryErrorCode, DeliveryLog, DeliveryStatus, DlqEntry, DlqError,
    DlqStatus, Event, IntegrationConfig, TraceId, TransformConfig, TriggerType,
};
use serde_json::Value;
use uuid::Uuid;

use crate::channel::{provider_key, ChannelAdapterRegistry, NoChannelAdapters};
use crate::error::DeliveryError;
use crate::url_guard;

/// Union of the store traits the delivery engine depends on.
pub trait DeliveryStore: IntegrationConfigStore + DeliveryLogStore + DlqStore {}
impl<T: IntegrationConfigStore + DeliveryLogStore + DlqStore> DeliveryStore for T {}

/// Tunables and flags for one `deliver_single_action` call.
#[derive(Debug, Clone)]
pub struct DeliveryOptions {
    /// Correlation id shared by every log row produced from the owning
    /// event.
    pub trace_id: TraceId,
    /// What triggered this attempt.
    pub trigger_type: TriggerType,
    /// Reuses an existing log row id to coalesce a retry onto one row.
    pub existing_log_id: Option<Uuid>,
    /// Synthetic deliveries (manual test sends) never enqueue a DLQ entry,
    /// and any non-2xx short-circuits straight to `FAILED`, not retryable.
    pub is_test_event: bool,
    /// Set by manual replay to bypass an `OPEN` circuit exactly once.
    pub force_delivery: bool,
}

/// Outcome of one single-action delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// Final status recorded on the log row.
    pub status: DeliveryStatus,
    /// The log row's stable id.
    pub log_id: Uuid,
}

/// Drives single-action delivery (§4.7) and the multi-action orchestrator
/// (§4.8) over a configurable store, rate-limit storage, and channel
/// registry.
pub struct DeliveryEngine<Store, RL>
where
    Store: DeliveryStore + Send + Sync,
    RL: RateLimitStorage,
{
    pub(crate) store: Arc<Store>,
    transformer: Transformer,
    auth: AuthBuilder,
    rate_limiter: RateLimiter<RL>,
    channels: Arc<dyn ChannelAdapterRegistry>,
    http: reqwest::Client,
    lookups: Arc<dyn LookupProvider>,
    bus: Option<Arc<GatewayBus>>,
}

impl<Store, RL> DeliveryEngine<Store, RL>
where
    Store: DeliveryStore + Send + Sync,
    RL: RateLimitStorage,
{
    /// Builds an engine over `store` and `rate_limiter`, with no channel
    /// adapters or lookup tables configured.
    pub fn new(store: Arc<Store>, rate_limiter: RateLimiter<RL>) -> Self {
        Self {
            store,
            transformer: Transformer::new(),
            auth: AuthBuilder::new(),
            rate_limiter,
            channels: Arc::new(NoChannelAdapters),
            http: reqwest::Client::new(),
            lookups: Arc::new(NoLookups),
            bus: None,
        }
    }

    /// Swaps in a channel-adapter registry.
    pub fn with_channels(mut self, channels: Arc<dyn ChannelAdapterRegistry>) -> Self {
        self.channels = channels;
        self
    }

    /// Swaps in a lookup-table provider.
    pub fn with_lookups(mut self, lookups: Arc<dyn LookupProvider>) -> Self {
        self.lookups = lookups;
        self
    }

    /// Publishes a `GatewayEvent::DeliveryTerminal` for every terminal
    /// outcome reached by `finish`. Unset by default; nothing on the
    /// delivery path blocks on it.
    pub fn with_bus(mut self, bus: Arc<GatewayBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// `deliverSingleAction`: the full 9-step protocol from the component
    /// design. `action` is `None` for a single top-level (non-multi-action)
    /// integration; `Some` for one step of a multi-action sequence.
    #[tracing::instrument(skip(self, integration, event), fields(integration_id = %integration.value.id, event_id = %event.id))]
    pub async fn deliver_single_action(
        &self,
        integration: &Versioned<IntegrationConfig>,
        action: Option<&Action>,
        event: &Event,
        attempt_count: u32,
        options: &DeliveryOptions,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let cfg = &integration.value;
        let log_id = options.existing_log_id.unwrap_or_else(Uuid::new_v4);

        let resolved = resolve_action(cfg, action);

        // Step 1: target URL validation, skipped for communication actions.
        if let ResolvedTransport::Http { target_url, .. } = &resolved.transport {
            if let Err(reason) = url_guard::validate(target_url) {
                return self
                    .finish(
                        integration,
                        action,
                        event,
                        attempt_count,
                        options,
                        log_id,
                        DeliveryStatus::Failed,
                        None,
                        None,
                        None,
                        None,
                        Some(reason),
                        Some(DeliveryErrorCode::InvalidUrl),
                        false,
                    )
                    .await;
            }
        }

        // Step 2: transform.
        let transformed = match self.transformer.transform(resolved.transform, &event.payload, self.lookups.as_ref()).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                return self
                    .finish(
                        integration,
                        action,
                        event,
                        attempt_count,
                        options,
                        log_id,
                        DeliveryStatus::Skipped,
                        Some(204),
                        None,
                        None,
                        None,
                        None,
                        None,
                        true,
                    )
                    .await;
            }
            Err(err) => {
                return self
                    .finish(
                        integration,
                        action,
                        event,
                        attempt_count,
                        options,
                        log_id,
                        DeliveryStatus::Failed,
                        None,
                        None,
                        None,
                        None,
                        Some(err.to_string()),
                        Some(DeliveryErrorCode::TransformationError),
                        false,
                    )
                    .await;
            }
        };

        // Step 3: rate limit.
        let rate_check = self.rate_limiter.check(cfg.id, cfg.tenant_id, cfg.rate_limit).await;
        if !rate_check.allowed {
            let status = maybe_abandon(DeliveryStatus::Retrying, attempt_count, cfg.max_retries);
            return self
                .finish(
                    integration,
                    action,
                    event,
                    attempt_count,
                    options,
                    log_id,
                    status,
                    Some(429),
                    None,
                    Some(transformed),
                    None,
                    Some("rate limit exceeded".to_string()),
                    Some(DeliveryErrorCode::RateLimit),
                    false,
                )
                .await;
        }

        // Step 4/5/6: channel branch or HTTP branch.
        match &resolved.transport {
            ResolvedTransport::Communication { channel } => {
                let key = provider_key(&channel.provider);
                match self.channels.send(&channel.channel, &key, &transformed, &channel.adapter_config).await {
                    Ok(_message_id) => {
                        self.finish(
                            integration,
                            action,
                            event,
                            attempt_count,
                            options,
                            log_id,
                            DeliveryStatus::Success,
                            None,
                            None,
                            Some(transformed),
                            None,
                            None,
                            None,
                            true,
                        )
                        .await
                    }
                    Err(message) => {
                        self.finish(
                            integration,
                            action,
                            event,
                            attempt_count,
                            options,
                            log_id,
                            DeliveryStatus::Failed,
                            None,
                            None,
                            Some(transformed),
                            None,
                            Some(message),
                            Some(DeliveryErrorCode::CommunicationError),
                            false,
                        )
                        .await
                    }
                }
            }
            ResolvedTransport::Http { target_url, method } => {
                self.deliver_http(integration, action, event, attempt_count, options, log_id, target_url, method, resolved.auth, transformed)
                    .await
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn deliver_http(
        &self,
        integration: &Versioned<IntegrationConfig>,
        action: Option<&Action>,
        event: &Event,
        attempt_count: u32,
        options: &DeliveryOptions,
        log_id: Uuid,
        target_url: &str,
        method: &str,
        auth: &gateway_types::AuthBlock,
        transformed: Value,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let cfg = &integration.value;
        let body = serde_json::to_vec(&transformed).unwrap_or_default();

        let auth_result = self.auth.build(auth, method, target_url, cfg.cached_token.as_ref()).await;
        let built_auth = match auth_result {
            Ok(built) => built,
            Err(err) => {
                return self
                    .finish(
                        integration,
                        action,
                        event,
                        attempt_count,
                        options,
                        log_id,
                        DeliveryStatus::Failed,
                        None,
                        None,
                        Some(transformed),
                        None,
                        Some(err.to_string()),
                        Some(DeliveryErrorCode::AuthFailed),
                        false,
                    )
                    .await;
            }
        };
        if let Some(token) = &built_auth.refreshed_token {
            let _ = self.store.update_token_if(&cfg.id, integration.version, Some(token.clone())).await;
        }

        let mut request = self
            .http
            .request(method.parse().unwrap_or(reqwest::Method::POST), target_url)
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .header("Content-Type", "application/json")
            .header("X-Correlation-ID", options.trace_id.to_string())
            .header("X-Trace-ID", options.trace_id.to_string());
        for (name, value) in &built_auth.headers {
            request = request.header(name, value);
        }
        if !cfg.signing_secrets.is_empty() {
            let signed = sign(&cfg.signing_secrets, &body);
            request = request
                .header(gateway_signature::SIGNATURE_HEADER, signed.signature)
                .header(gateway_signature::TIMESTAMP_HEADER, signed.timestamp)
                .header(gateway_signature::MESSAGE_ID_HEADER, signed.message_id);
        }
        request = request.body(body);

        let sent_at = std::time::Instant::now();
        let response = request.send().await;
        let response_time_ms = sent_at.elapsed().as_millis() as u64;

        let (status, response_status, response_body, error_message, error_code, clear_token) = match response {
            Ok(resp) => {
                let status_code = resp.status().as_u16();
                let body_text = resp.text().await.unwrap_or_default();
                let body_json: Option<Value> = serde_json::from_str(&body_text).ok();
                let marker = auth.expiry_marker.as_ref();
                let should_clear = gateway_auth::should_invalidate_cache(marker, status_code, body_json.as_ref());
                classify_http(status_code, should_clear, options.is_test_event, &body_text)
            }
            Err(err) => {
                let code = if err.is_timeout() { DeliveryErrorCode::Timeout } else { DeliveryErrorCode::NetworkError };
                (DeliveryStatus::Retrying, None, None, Some(err.to_string()), Some(code), false)
            }
        };

        if clear_token {
            let _ = self.store.update_token_if(&cfg.id, integration.version, None).await;
        }

        let status = maybe_abandon(status, attempt_count, cfg.max_retries);
        let error_code = if status == DeliveryStatus::Success { None } else { error_code };

        self.finish(
            integration,
            action,
            event,
            attempt_count,
            options,
            log_id,
            status,
            response_status,
            Some(response_time_ms),
            Some(transformed),
            response_body,
            error_message,
            error_code,
            status == DeliveryStatus::Success,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        integration: &Versioned<IntegrationConfig>,
        action: Option<&Action>,
        event: &Event,
        attempt_count: u32,
        options: &DeliveryOptions,
        log_id: Uuid,
        status: DeliveryStatus,
        response_status: Option<u16>,
        response_time_ms: Option<u64>,
        transformed_payload: Option<Value>,
        response_body: Option<String>,
        error_message: Option<String>,
        error_code: Option<DeliveryErrorCode>,
        is_success_class: bool,
    ) -> Result<DeliveryOutcome, DeliveryError> {
        let cfg = &integration.value;

        // Step 7: circuit update.
        let breaker = CircuitBreaker::new(self.store.as_ref());
        if is_success_class {
            let _ = breaker.record_success(&cfg.id).await;
        } else {
            let should_trip = error_code.map(|c| c.trips_circuit()).unwrap_or(false);
            let reason = error_message.clone().unwrap_or_default();
            let _ = breaker.record_failure(&cfg.id, FailureClass { should_trip_circuit: should_trip }, &reason).await;
        }

        // Step 8: log upsert.
        let now = Utc::now();
        let log = DeliveryLog {
            id: log_id,
            trace_id: options.trace_id,
            integration_id: cfg.id,
            tenant_id: cfg.tenant_id,
            event_id: event.id.clone(),
            direction: cfg.direction,
            trigger_type: options.trigger_type,
            action_name: action.map(|a| a.name.clone()),
            action_index: action.map(|a| a.index),
            status,
            response_status,
            response_time_ms,
            attempt_count,
            original_payload: event.payload.clone(),
            transformed_payload,
            request_headers: Value::Null,
            response_body,
            error_message,
            error_code,
            signing_audit: None,
            created_at: now,
            updated_at: now,
        };
        self.store.upsert(log).await?;

        // Step 9: DLQ entry.
        if matches!(status, DeliveryStatus::Failed | DeliveryStatus::Abandoned) && !options.is_test_event {
            let entry = DlqEntry {
                id: Uuid::new_v4(),
                trace_id: options.trace_id,
                integration_id: cfg.id,
                tenant_id: cfg.tenant_id,
                direction: cfg.direction,
                payload: event.payload.clone(),
                error: DlqError {
                    message: "delivery failed".to_string(),
                    code: error_code.unwrap_or(DeliveryErrorCode::ActionFailure),
                    status_code: response_status,
                },
                retry_count: 0,
                max_retries: cfg.max_retries,
                next_retry_at: now,
                status: DlqStatus::Pending,
                created_at: now,
            };
            self.store.insert(entry).await?;
        }

        if let Some(bus) = &self.bus {
            if !matches!(status, DeliveryStatus::Retrying) {
                bus.publish(GatewayEvent::DeliveryTerminal {
                    trace_id: options.trace_id,
                    integration_id: cfg.id,
                    tenant_id: cfg.tenant_id,
                    status,
                    at: now,
                });
            }
        }

        Ok(DeliveryOutcome { status, log_id })
    }
}

fn classify_http(
    status_code: u16,
    should_clear_token: bool,
    is_test_event: bool,
    body_text: &str,
) -> (DeliveryStatus, Option<u16>, Option<String>, Option<String>, Option<DeliveryErrorCode>, bool) {
    let body = Some(body_text.to_string());
    let (mut status, code) = if (200..300).contains(&status_code) {
        if should_clear_token {
            (DeliveryStatus::Retrying, Some(DeliveryErrorCode::AuthExpired))
        } else {
            (DeliveryStatus::Success, None)
        }
    } else if status_code == 429 {
        (DeliveryStatus::Retrying, Some(DeliveryErrorCode::RateLimit))
    } else if status_code == 401 || status_code == 403 {
        (DeliveryStatus::Retrying, Some(DeliveryErrorCode::AuthExpired))
    } else if status_code >= 500 {
        (DeliveryStatus::Retrying, Some(DeliveryErrorCode::ServerError))
    } else {
        (DeliveryStatus::Failed, Some(DeliveryErrorCode::ClientError))
    };

    // Test-event short-circuit: any non-2xx becomes a terminal failure,
    // never retried.
    if is_test_event && status != DeliveryStatus::Success {
        status = DeliveryStatus::Failed;
    }

    let error_message = if status == DeliveryStatus::Success { None } else { Some(format!("HTTP {status_code}")) };
    (status, Some(status_code), body, error_message, code, should_clear_token && status != DeliveryStatus::Success)
}

/// Promotes a `RETRYING` outcome to `ABANDONED` once the attempt count
/// exceeds the integration's configured retry budget.
fn maybe_abandon(status: DeliveryStatus, attempt_count: u32, max_retries: u32) -> DeliveryStatus {
    if status == DeliveryStatus::Retrying && attempt_count > max_retries {
        DeliveryStatus::Abandoned
    } else {
        status
    }
}

enum ResolvedTransport<'a> {
    Http { target_url: &'a str, method: &'a str },
    Communication { channel: &'a gateway_types::CommunicationChannel },
}

struct ResolvedAction<'a> {
    transport: ResolvedTransport<'a>,
    transform: &'a TransformConfig,
    auth: &'a gateway_types::AuthBlock,
}

fn resolve_action<'a>(cfg: &'a IntegrationConfig, action: Option<&'a Action>) -> ResolvedAction<'a> {
    match action {
        Some(action) => {
            let transport = match &action.kind {
                ActionKind::Http { target_url, method } => ResolvedTransport::Http { target_url, method },
                ActionKind::Communication { channel } => ResolvedTransport::Communication { channel },
            };
            ResolvedAction {
                transport,
                transform: action.transform.as_ref().unwrap_or(&cfg.transform),
                auth: action.auth.as_ref().unwrap_or(&cfg.auth),
            }
        }
        None => ResolvedAction {
            transport: ResolvedTransport::Http {
                target_url: cfg.target_url.as_deref().unwrap_or(""),
                method: &cfg.http_method,
            },
            transform: &cfg.transform,
            auth: &cfg.auth,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gateway_rate_limiter::RateLimiter;
    use gateway_store_memory::MemoryStore;
    use gateway_types::{
        AuthBlock, AuthKind, CircuitState, Direction, DeliveryMode, EventStatus, SimpleMapping, SourceName,
        StaticField, TenantId, TransformKind,
    };
    use serde_json::json;

    use super::*;

    fn sample_integration(target_url: Option<&str>) -> IntegrationConfig {
        IntegrationConfig {
            id: gateway_types::IntegrationId::new(),
            tenant_id: TenantId::new(),
            name: "test".to_string(),
            trigger_event_types: vec!["order.created".to_string()],
            direction: Direction::Outbound,
            delivery_mode: DeliveryMode::Immediate,
            target_url: target_url.map(|s| s.to_string()),
            http_method: "POST".to_string(),
            timeout_ms: 5_000,
            max_retries: 3,
            auth: AuthBlock { kind: AuthKind::None, expiry_marker: None },
            signing_secrets: vec![],
            rate_limit: None,
            actions: vec![],
            transform: TransformConfig {
                mode: TransformMode::Simple {
                    mappings: vec![SimpleMapping {
                        source_field: "amount".to_string(),
                        target_field: "amount".to_string(),
                        transform: TransformKind::Identity,
                        default_value: None,
                        lookup_type: None,
                    }],
                    static_fields: vec![StaticField { key: "source".to_string(), value: json!("gateway") }],
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

    fn sample_event(payload: serde_json::Value) -> Event {
        Event {
            id: gateway_types::EventId::from("evt-1"),
            event_type: "order.created".to_string(),
            tenant_id: TenantId::new(),
            payload,
            source_name: SourceName::HttpPush,
            source_metadata: json!({}),
            received_at: Utc::now(),
            attempt_count: 0,
            is_replay: false,
            status: EventStatus::Processing,
        }
    }

    fn sample_options() -> DeliveryOptions {
        DeliveryOptions {
            trace_id: TraceId::new(),
            trigger_type: TriggerType::Event,
            existing_log_id: None,
            is_test_event: false,
            force_delivery: false,
        }
    }

    fn engine(cfg: &IntegrationConfig) -> (Arc<MemoryStore>, DeliveryEngine<MemoryStore, gateway_rate_limiter::InMemoryRateLimitStorage>) {
        let store = Arc::new(MemoryStore::new());
        store.seed_integration(cfg.clone());
        let rate_limiter = RateLimiter::in_memory();
        (store.clone(), DeliveryEngine::new(store, rate_limiter))
    }

    #[tokio::test]
    async fn invalid_target_url_fails_without_network_call() {
        let cfg = sample_integration(Some("ftp://example.com/hook"));
        let versioned = Versioned::new(cfg);
        let (_store, engine) = engine(&versioned.value);
        let event = sample_event(json!({"amount": 5}));

        let outcome = engine.deliver_single_action(&versioned, None, &event, 1, &sample_options()).await.unwrap();
        assert_eq!(outcome.status, DeliveryStatus::Failed);
    }

    #[tokio::test]
    async fn script_skip_short_circuits_to_skipped_status() {
        let mut cfg = sample_integration(Some("https://example.com/hook"));
        cfg.transform = TransformConfig { mode: TransformMode::Script { source: "()".to_string() }, lookups: vec![] };
        let versioned = Versioned::new(cfg);
        let (_store, engine) = engine(&versioned.value);
        let event = sample_event(json!({}));

        let outcome = engine.deliver_single_action(&versioned, None, &event, 1, &sample_options()).await.unwrap();
        assert_eq!(outcome.status, DeliveryStatus::Skipped);
    }

    #[tokio::test]
    async fn terminal_outcome_publishes_to_the_bus_when_configured() {
        let mut cfg = sample_integration(Some("https://example.com/hook"));
        cfg.transform = TransformConfig { mode: TransformMode::Script { source: "()".to_string() }, lookups: vec![] };
        let versioned = Versioned::new(cfg);
        let (store, engine) = engine(&versioned.value);
        let bus = Arc::new(gateway_bus_core::GatewayBus::default());
        let engine = engine.with_bus(bus.clone());
        let mut rx = bus.subscribe();
        let event = sample_event(json!({}));

        let outcome = engine.deliver_single_action(&versioned, None, &event, 1, &sample_options()).await.unwrap();
        assert_eq!(outcome.status, DeliveryStatus::Skipped);

        let published = rx.recv().await.expect("bus should have received a notification");
        match published {
            gateway_bus_core::GatewayEvent::DeliveryTerminal { status, .. } => {
                assert_eq!(status, DeliveryStatus::Skipped);
            }
            other => panic!("unexpected event on bus: {other:?}"),
        }
        drop(store);
    }

    #[tokio::test]
    async fn rate_limit_denial_is_retrying_until_retries_exhausted() {
        // A communication action never hits the network; it exercises the
        // rate limiter without depending on outbound HTTP.
        let mut cfg = sample_integration(None);
        cfg.rate_limit = Some(gateway_types::RateLimitConfig { enabled: true, max_requests: 1, window_seconds: 60 });
        cfg.max_retries = 1;
        let action = Action {
            name: "notify".to_string(),
            index: 0,
            kind: ActionKind::Communication {
                channel: gateway_types::CommunicationChannel {
                    channel: "email".to_string(),
                    provider: "GMAIL_OAUTH".to_string(),
                    adapter_config: json!({}),
                },
            },
            transform: None,
            auth: None,
            condition: None,
        };
        cfg.actions = vec![action.clone()];
        let versioned = Versioned::new(cfg);
        let (_store, engine) = engine(&versioned.value);
        let event = sample_event(json!({"amount": 1}));

        // First call consumes the single-request window (and fails, since
        // no channel adapter is registered) without ever touching HTTP.
        let first = engine.deliver_single_action(&versioned, Some(&action), &event, 1, &sample_options()).await.unwrap();
        assert_eq!(first.status, DeliveryStatus::Failed);

        // Second call exceeds the 1-request window and must be denied, then
        // promoted straight to ABANDONED since max_retries is 1.
        let second = engine.deliver_single_action(&versioned, Some(&action), &event, 2, &sample_options()).await.unwrap();
        assert_eq!(second.status, DeliveryStatus::Abandoned);
    }

    #[test]
    fn maybe_abandon_promotes_once_retries_exhausted() {
        assert_eq!(maybe_abandon(DeliveryStatus::Retrying, 4, 3), DeliveryStatus::Abandoned);
        assert_eq!(maybe_abandon(DeliveryStatus::Retrying, 2, 3), DeliveryStatus::Retrying);
        assert_eq!(maybe_abandon(DeliveryStatus::Success, 10, 1), DeliveryStatus::Success);
    }

    #[test]
    fn classify_http_applies_test_event_short_circuit() {
        let (status, _code, _body, _msg, _err, _clear) = classify_http(500, false, true, "{}");
        assert_eq!(status, DeliveryStatus::Failed);
        let (status, _code, _body, _msg, _err, _clear) = classify_http(500, false, false, "{}");
        assert_eq!(status, DeliveryStatus::Retrying);
    }

    #[test]
    fn classify_http_success_clears_error_code() {
        let (status, _status_code, _body, error_message, error_code, clear_token) = classify_http(200, false, false, "{}");
        assert_eq!(status, DeliveryStatus::Success);
        assert!(error_message.is_none());
        assert!(error_code.is_none());
        assert!(!clear_token);
    }
}
