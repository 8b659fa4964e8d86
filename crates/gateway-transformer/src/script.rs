use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::error::TransformError;

/// Default wall-clock budget for one SCRIPT-mode evaluation.
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_EXPR_DEPTH: usize = 64;
const MAX_OPERATIONS: u64 = 1_000_000;

/// Restricted HTTP facade injected into scripts as `context`. Exposes only
/// GET/POST/PUT/PATCH/DELETE/getBuffer; every call is non-throwing on a
/// non-2xx response (the script sees `{status, body}` either way) and runs
/// under the outer per-call timeout.
#[derive(Clone)]
pub struct HttpHelper {
    client: reqwest::Client,
    handle: Handle,
    timeout: Duration,
}

impl HttpHelper {
    /// Builds a helper bound to the calling task's tokio runtime, so a
    /// script evaluated on a blocking thread can still drive async HTTP
    /// calls via `Handle::block_on`.
    pub fn new(client: reqwest::Client, handle: Handle, timeout: Duration) -> Self {
        Self { client, handle, timeout }
    }

    fn request(&self, method: reqwest::Method, url: String, body: rhai::Dynamic) -> rhai::Dynamic {
        let client = self.client.clone();
        let timeout = self.timeout;
        let result = self.handle.block_on(async move {
            let mut req = client.request(method, &url).timeout(timeout);
            if !body.is_unit() {
                if let Ok(json) = rhai::serde::from_dynamic::<Value>(&body) {
                    req = req.json(&json);
                }
            }
            req.send().await
        });

        let mut map = rhai::Map::new();
        match result {
            Ok(response) => {
                let status = response.status().as_u16() as i64;
                let handle = self.handle.clone();
                let text = handle.block_on(async move { response.text().await }).unwrap_or_default();
                let body_value: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
                map.insert("status".into(), status.into());
                map.insert("body".into(), rhai::serde::to_dynamic(&body_value).unwrap_or(rhai::Dynamic::UNIT));
            }
            Err(err) => {
                map.insert("status".into(), (0_i64).into());
                map.insert("body".into(), rhai::Dynamic::from(err.to_string()));
            }
        }
        map.into()
    }

    /// `context.get(url)`.
    pub fn get(&mut self, url: String) -> rhai::Dynamic {
        self.request(reqwest::Method::GET, url, rhai::Dynamic::UNIT)
    }
    /// `context.post(url, body)`.
    pub fn post(&mut self, url: String, body: rhai::Dynamic) -> rhai::Dynamic {
        self.request(reqwest::Method::POST, url, body)
    }
    /// `context.put(url, body)`.
    pub fn put(&mut self, url: String, body: rhai::Dynamic) -> rhai::Dynamic {
        self.request(reqwest::Method::PUT, url, body)
    }
    /// `context.patch(url, body)`.
    pub fn patch(&mut self, url: String, body: rhai::Dynamic) -> rhai::Dynamic {
        self.request(reqwest::Method::PATCH, url, body)
    }
    /// `context.delete(url)`.
    pub fn delete(&mut self, url: String) -> rhai::Dynamic {
        self.request(reqwest::Method::DELETE, url, rhai::Dynamic::UNIT)
    }
    /// `context.getBuffer(url)` — same as `get` but the body is returned as
    /// a raw byte blob instead of parsed JSON/text.
    pub fn get_buffer(&mut self, url: String) -> rhai::Dynamic {
        let client = self.client.clone();
        let timeout = self.timeout;
        let result = self.handle.block_on(async move { client.get(&url).timeout(timeout).send().await });
        let mut map = rhai::Map::new();
        match result {
            Ok(response) => {
                let status = response.status().as_u16() as i64;
                let bytes = self.handle.block_on(async move { response.bytes().await }).map(|b| b.to_vec()).unwrap_or_default();
                map.insert("status".into(), status.into());
                map.insert("body".into(), rhai::Blob::from(bytes).into());
            }
            Err(err) => {
                map.insert("status".into(), (0_i64).into());
                map.insert("body".into(), rhai::Dynamic::from(err.to_string()));
            }
        }
        map.into()
    }
}

fn epoch() -> i64 {
    Utc::now().timestamp()
}

fn datetime(date: String, time: String, tz: String) -> String {
    let naive_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default();
    let naive_time = NaiveTime::parse_from_str(&time, "%H:%M:%S").unwrap_or_default();
    let naive = naive_date.and_time(naive_time);
    let offset = chrono::FixedOffset::east_opt(parse_offset_seconds(&tz)).unwrap_or_else(|| chrono::FixedOffset::east_opt(0).expect("zero offset is valid"));
    naive.and_local_timezone(offset).single().map(|dt| dt.to_rfc3339()).unwrap_or_else(|| naive.to_string())
}

fn parse_offset_seconds(tz: &str) -> i32 {
    let tz = tz.trim();
    if tz.is_empty() || tz == "Z" {
        return 0;
    }
    let (sign, rest) = if let Some(stripped) = tz.strip_prefix('-') {
        (-1, stripped)
    } else {
        (1, tz.strip_prefix('+').unwrap_or(tz))
    };
    let mut parts = rest.split(':');
    let hours: i32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let minutes: i32 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    sign * (hours * 3600 + minutes * 60)
}

fn uppercase(s: String) -> String {
    s.to_uppercase()
}

fn lowercase(s: String) -> String {
    s.to_lowercase()
}

fn trim(s: String) -> String {
    s.trim().to_string()
}

fn format_phone_default(phone: String) -> String {
    format_phone(phone, "91".to_string())
}

fn format_phone(phone: String, country_code: String) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if phone.trim_start().starts_with('+') {
        format!("+{digits}")
    } else {
        format!("+{country_code}{digits}")
    }
}

fn get_with_default(obj: rhai::Dynamic, path: String, default: rhai::Dynamic) -> rhai::Dynamic {
    let Ok(value) = rhai::serde::from_dynamic::<Value>(&obj) else {
        return default;
    };
    match gateway_types::json_path::get(&value, &path) {
        Some(found) => rhai::serde::to_dynamic(found).unwrap_or(default),
        None => default,
    }
}

/// Builds a sandboxed engine with the capability surface fixed in the
/// teacher's `ScriptContext` design: `payload`, `context` (HTTP helper),
/// and the named utility functions. Nothing else reachable from script
/// code — no filesystem, process, or unrestricted networking module.
pub fn build_engine() -> rhai::Engine {
    let mut engine = rhai::Engine::new();
    engine.set_max_expr_depth(MAX_EXPR_DEPTH);
    engine.set_max_operations(MAX_OPERATIONS);
    engine.disable_symbol("eval");

    engine.register_type_with_name::<HttpHelper>("HttpContext");
    engine.register_fn("get", HttpHelper::get);
    engine.register_fn("post", HttpHelper::post);
    engine.register_fn("put", HttpHelper::put);
    engine.register_fn("patch", HttpHelper::patch);
    engine.register_fn("delete", HttpHelper::delete);
    engine.register_fn("getBuffer", HttpHelper::get_buffer);

    engine.register_fn("epoch", epoch);
    engine.register_fn("datetime", datetime);
    engine.register_fn("uppercase", uppercase);
    engine.register_fn("lowercase", lowercase);
    engine.register_fn("trim", trim);
    engine.register_fn("formatPhone", format_phone_default);
    engine.register_fn("formatPhone", format_phone);
    engine.register_fn("get", get_with_default);

    engine
}

/// Evaluates `source` against `payload`, with `context` bound to a fresh
/// [`HttpHelper`]. Runs on a blocking thread under a wall-clock `timeout`;
/// a script returning unit/nothing is treated as the `null` skip-delivery
/// outcome.
pub async fn evaluate(
    source: String,
    payload: Value,
    http: HttpHelper,
    timeout: Duration,
) -> Result<Option<Value>, TransformError> {
    let eval = tokio::task::spawn_blocking(move || {
        let engine = build_engine();
        let mut scope = rhai::Scope::new();
        let payload_dynamic = rhai::serde::to_dynamic(&payload).map_err(|e| TransformError::TransformationError(e.to_string()))?;
        scope.push("payload", payload_dynamic);
        scope.push("context", http);

        let result: rhai::Dynamic = engine.eval_with_scope(&mut scope, &source).map_err(|e| TransformError::TransformationError(e.to_string()))?;
        if result.is_unit() {
            return Ok(None);
        }
        let value: Value = rhai::serde::from_dynamic(&result).map_err(|e| TransformError::TransformationError(e.to_string()))?;
        Ok(Some(value))
    });

    match tokio::time::timeout(timeout, eval).await {
        Ok(Ok(inner)) => inner,
        Ok(Err(_join_error)) => Err(TransformError::TransformationError("script task panicked".to_string())),
        Err(_elapsed) => Err(TransformError::Timeout),
    }
}

/// Evaluates a boolean action-condition expression over
/// `{eventType, orgId, payload}`. No HTTP facade, no async boundary — this
/// runs inline on whichever task calls it. A parse/eval failure or a
/// non-boolean result is treated as `false`, never propagated as an error.
pub fn evaluate_condition(source: &str, event_type: &str, org_id: &str, payload: &Value) -> bool {
    let engine = build_engine();
    let mut scope = rhai::Scope::new();
    scope.push("eventType", event_type.to_string());
    scope.push("orgId", org_id.to_string());
    let Ok(payload_dynamic) = rhai::serde::to_dynamic(payload) else {
        return false;
    };
    scope.push("payload", payload_dynamic);

    engine.eval_with_scope::<bool>(&mut scope, source).unwrap_or(false)
}
