use serde::{Deserialize, Serialize};

use crate::auth_cache::AuthTokenCache;
use crate::circuit::CircuitState;
use crate::ids::{IntegrationId, TenantId};

/// How a matched integration is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMode {
    /// Delivered as soon as the event is processed.
    Immediate,
    /// Delivered once, at a future time computed by a scheduling script.
    Delayed,
    /// Delivered repeatedly per a recurrence rule from a scheduling script.
    Recurring,
    /// Not event-triggered at all; driven by the scheduled-job worker's
    /// cron/interval instead.
    ScheduledJob,
}

/// Which side of an integration this config describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Pulls data in (table-poll / stream / push source-adapter shape).
    Inbound,
    /// Pushes data out to an external target.
    Outbound,
    /// Driven by the scheduler (delayed/recurring) rather than immediately.
    Scheduled,
    /// Dispatches through a non-HTTP channel adapter (email, SMS).
    Communication,
}

/// One authentication scheme an auth block may declare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthKind {
    /// No authentication.
    None,
    /// A single static header carrying an API key.
    ApiKey {
        /// Header name to send the key under.
        header_name: String,
        /// The key value.
        api_key: String,
    },
    /// HTTP Basic auth.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// A static bearer token.
    Bearer {
        /// The token value.
        token: String,
    },
    /// OAuth1 HMAC-SHA256 request signing.
    OAuth1 {
        /// Consumer key, sent as an OAuth parameter.
        consumer_key: String,
        /// Consumer secret, half of the HMAC signing key.
        consumer_secret: String,
        /// Optional resource-owner token.
        token: Option<String>,
        /// Optional resource-owner token secret, the other half of the
        /// signing key.
        token_secret: Option<String>,
    },
    /// OAuth2 client-credentials grant, with token caching.
    OAuth2 {
        /// Token endpoint URL.
        token_url: String,
        /// Client id.
        client_id: String,
        /// Client secret.
        client_secret: String,
        /// Optional scope parameter.
        scope: Option<String>,
    },
    /// A configurable custom token-fetch flow.
    Custom {
        /// Token endpoint URL.
        token_url: String,
        /// HTTP method used against the endpoint.
        #[serde(default = "default_post")]
        method: String,
        /// JSON body sent to the endpoint.
        body: serde_json::Value,
        /// Dot-path into the response body where the token lives.
        #[serde(default = "default_token_response_path")]
        token_response_path: String,
        /// Optional dot-path into the response body for the token's TTL.
        token_expires_in_path: Option<String>,
        /// Header to send the fetched token under.
        #[serde(default = "default_auth_header_name")]
        header_name: String,
        /// Prefix prepended to the token in the header value.
        #[serde(default = "default_header_prefix")]
        header_prefix: String,
    },
    /// A fixed, validated map of extra headers with no token-fetch step.
    CustomHeaders {
        /// Header name/value pairs; names must be non-empty.
        headers: std::collections::BTreeMap<String, String>,
    },
}

fn default_post() -> String {
    "POST".to_string()
}

fn default_token_response_path() -> String {
    "access_token".to_string()
}

fn default_auth_header_name() -> String {
    "Authorization".to_string()
}

fn default_header_prefix() -> String {
    "Bearer".to_string()
}

/// Cache-invalidation marker configuration for token-based auth kinds: if
/// the response body at `response_body_path` matches any of
/// `expiration_values`, the cached token is treated as expired even on a
/// 2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExpiryMarker {
    /// Dot-path into the response body to inspect.
    pub response_body_path: String,
    /// Values that indicate the token has expired.
    pub expiration_values: Vec<String>,
}

/// The full auth configuration attached to an integration or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthBlock {
    /// Which scheme to use.
    pub kind: AuthKind,
    /// Optional expiry-marker detection layered on top of `kind`.
    pub expiry_marker: Option<TokenExpiryMarker>,
}

/// One rotation-ordered HMAC signing secret; head of the list is current.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningSecret {
    /// The secret value, prefixed `whsec_`.
    pub secret: String,
    /// When this secret was added, oldest-first ordering is implied by
    /// position in the owning list, not by this field; kept for audit.
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One step of a SIMPLE-mode transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleMapping {
    /// Dot-path into the source payload.
    pub source_field: String,
    /// Dot-path in the output object to write.
    pub target_field: String,
    /// Value transform to apply to the resolved source value.
    pub transform: TransformKind,
    /// Fallback used by the `default` transform kind, and when `lookup`
    /// misses.
    pub default_value: Option<serde_json::Value>,
    /// Lookup table name consulted by the `lookup` transform kind.
    pub lookup_type: Option<String>,
}

/// A value transform applied to one mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Copies the source value unchanged.
    Identity,
    /// Strips leading/trailing whitespace from a string value.
    Trim,
    /// Upper-cases a string value.
    Upper,
    /// Lower-cases a string value.
    Lower,
    /// Parses and reformats a date-like value to ISO-8601.
    Date,
    /// `source ?? defaultValue`.
    Default,
    /// Consults a lookup table by `lookup_type`, falling back to the source
    /// value on miss.
    Lookup,
}

/// A field appended after mappings, always overriding any mapping that
/// wrote the same target field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticField {
    /// Target dot-path.
    pub key: String,
    /// Literal value to write.
    pub value: serde_json::Value,
}

/// Transformation mode declared by an integration or action; exactly one
/// variant applies per transform config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformMode {
    /// Declarative field mappings plus static fields.
    Simple {
        /// Ordered list of field mappings.
        mappings: Vec<SimpleMapping>,
        /// Fields appended after mappings, last-write-wins.
        static_fields: Vec<StaticField>,
    },
    /// Sandboxed user-authored script.
    Script {
        /// Script source text.
        source: String,
    },
}

/// Behavior when a lookup's target field has no corresponding source value
/// under its array prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnmappedBehavior {
    /// Leave the field absent.
    Passthrough,
    /// Treat as a transform error.
    Fail,
    /// Write a configured default value.
    Default {
        /// The value to write when unmapped.
        value: serde_json::Value,
    },
}

/// Whether a lookup's source/target dot-paths address a scalar or an
/// array-prefixed field (`path[].field`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupArrayAgreement {
    /// Both source and target are plain scalar dot-paths.
    Scalar,
    /// Both source and target share an array prefix (`items[].field`).
    Array,
}

/// A post-transform lookup applied after SIMPLE/SCRIPT transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    /// Source dot-path (optionally `path[].field`).
    pub source_field: String,
    /// Target dot-path (optionally `path[].field`).
    pub target_field: String,
    /// Lookup table name.
    pub lookup_type: String,
    /// Whether this lookup addresses scalars or an array prefix; source and
    /// target must agree.
    pub array_agreement: LookupArrayAgreement,
    /// Behavior when the target has no value to look up.
    pub unmapped_behavior: UnmappedBehavior,
}

/// Full transform configuration: a mode plus post-transform lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// SIMPLE or SCRIPT mode.
    pub mode: TransformMode,
    /// Lookups applied, in order, after the mode's transform runs.
    #[serde(default)]
    pub lookups: Vec<Lookup>,
}

/// Channel/provider descriptor for a [`ActionKind::Communication`] action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicationChannel {
    /// Logical channel, e.g. `email`, `sms`.
    pub channel: String,
    /// Provider key as configured, e.g. `GMAIL_OAUTH`; the adapter registry
    /// looks up `provider.split('_')[0].to_lowercase()`.
    pub provider: String,
    /// Provider-specific adapter configuration.
    pub adapter_config: serde_json::Value,
}

/// Which transport a single action dispatches over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Standard outbound HTTP delivery.
    Http {
        /// Target URL; required unless this is a `Communication` action.
        target_url: String,
        /// HTTP method, `POST` default.
        #[serde(default = "default_post")]
        method: String,
    },
    /// Dispatch through the channel-adapter registry instead of raw HTTP.
    Communication {
        /// Channel/provider descriptor.
        channel: CommunicationChannel,
    },
}

/// One step of a multi-action integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Human-readable name, recorded on the delivery log.
    pub name: String,
    /// Zero-based position in the actions array.
    pub index: usize,
    /// Transport for this action.
    pub kind: ActionKind,
    /// Overrides the integration-level transform when present.
    pub transform: Option<TransformConfig>,
    /// Overrides the integration-level auth when present.
    pub auth: Option<AuthBlock>,
    /// Boolean source expression over `{eventType, orgId, payload}`; a
    /// parse/eval failure is treated as `false`.
    pub condition: Option<String>,
}

/// Per-tenant named delivery rule. The central configuration entity: owns
/// its circuit state and cached token, and optionally fans out into a
/// multi-action sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Unique id.
    pub id: IntegrationId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Event types that trigger this integration.
    pub trigger_event_types: Vec<String>,
    /// Which side of the pipeline this config participates in.
    pub direction: Direction,
    /// Delivery timing mode.
    pub delivery_mode: DeliveryMode,
    /// Fallback target URL, used when `actions` is empty.
    pub target_url: Option<String>,
    /// Fallback HTTP method, `POST` default.
    #[serde(default = "default_post")]
    pub http_method: String,
    /// Per-delivery request timeout in milliseconds, 10s default.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum retry attempts before a RETRYING log is abandoned.
    pub max_retries: u32,
    /// Fallback auth block, used when `actions` is empty or an action omits
    /// its own override.
    pub auth: AuthBlock,
    /// Ordered signing secrets; head is current. Empty means signing is
    /// disabled.
    pub signing_secrets: Vec<SigningSecret>,
    /// Optional per-integration rate limit.
    pub rate_limit: Option<RateLimitConfig>,
    /// Non-empty iff this integration is multi-action; then `target_url`
    /// and `transform` serve only as per-action fallbacks.
    pub actions: Vec<Action>,
    /// Fallback transform, used when `actions` is empty or an action omits
    /// its own override.
    pub transform: TransformConfig,
    /// Inbound response transform, applied to responses for INBOUND
    /// integrations.
    pub response_transform: Option<TransformConfig>,
    /// Whether this integration currently participates in matching.
    pub active: bool,
    /// Delay between actions of a multi-action integration, `0` disables.
    #[serde(default)]
    pub multi_action_delay_ms: u64,
    /// Sandboxed script (same contract as SCRIPT-mode transforms) that
    /// computes a DELAYED due time or a RECURRING recurrence rule. Only
    /// consulted when `delivery_mode` is `Delayed` or `Recurring`.
    #[serde(default)]
    pub schedule_script: Option<String>,
    /// Circuit-breaker state, owned by this config.
    #[serde(default)]
    pub circuit: CircuitState,
    /// Cached OAuth2/Custom token, owned by this config.
    pub cached_token: Option<AuthTokenCache>,
    /// Data source pulled from on each execution. Only consulted when
    /// `delivery_mode` is `ScheduledJob`.
    #[serde(default)]
    pub data_source: Option<DataSourceConfig>,
    /// Cron or interval cadence. Only consulted when `delivery_mode` is
    /// `ScheduledJob`.
    #[serde(default)]
    pub job_schedule: Option<JobSchedule>,
    /// Arbitrary job-scoped parameters resolved by `{{config.*}}`
    /// placeholders in `data_source`. Only consulted when `delivery_mode`
    /// is `ScheduledJob`.
    #[serde(default)]
    pub job_params: serde_json::Value,
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl IntegrationConfig {
    /// True when this integration declares a non-empty actions array and is
    /// therefore driven by the multi-action orchestrator rather than a
    /// single top-level delivery.
    pub fn is_multi_action(&self) -> bool {
        !self.actions.is_empty()
    }
}

/// Where a SCHEDULED-JOB integration pulls its data from on each execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceConfig {
    /// A parameterized query against a dedicated or shared SQL pool.
    Sql {
        /// Named connection pool to borrow; `None` uses the shared default.
        pool: Option<String>,
        /// Query text; may contain `{{config.*}}`/`{{date.*}}`/`{{env.*}}`
        /// placeholders, substituted before execution.
        query: String,
    },
    /// A document-store aggregation pipeline.
    Document {
        /// Target collection name.
        collection: String,
        /// Aggregation pipeline stages; placeholders are substituted
        /// recursively through every string value.
        pipeline: Vec<serde_json::Value>,
    },
    /// A plain HTTP call.
    Http {
        /// Request URL; may contain placeholders.
        url: String,
        /// HTTP method, `GET` default.
        #[serde(default = "default_get")]
        method: String,
        /// Request body, if any; placeholders substituted recursively.
        body: Option<serde_json::Value>,
    },
}

fn default_get() -> String {
    "GET".to_string()
}

/// Cadence for a SCHEDULED-JOB integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobSchedule {
    /// Standard 5-field cron expression, evaluated in `timezone`.
    Cron {
        /// 5-field cron expression.
        expression: String,
        /// IANA timezone name, e.g. `UTC`.
        timezone: String,
    },
    /// Plain interval; the worker floors this at 60s.
    Interval {
        /// Interval length in milliseconds.
        interval_ms: u64,
    },
}

/// Per-integration rate-limit block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether the limit is enforced at all.
    pub enabled: bool,
    /// Maximum requests allowed per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_seconds: u32,
}
