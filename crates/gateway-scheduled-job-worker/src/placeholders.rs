use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*(config|date|env)\.([a-zA-Z0-9_.]+)\s*\}\}").expect("static regex"));

fn value_to_plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn date_field(path: &str, now: DateTime<Utc>) -> Option<String> {
    match path {
        "iso" => Some(now.to_rfc3339()),
        "epoch" => Some(now.timestamp().to_string()),
        "date" => Some(now.format("%Y-%m-%d").to_string()),
        "time" => Some(now.format("%H:%M:%S").to_string()),
        _ => None,
    }
}

/// Substitutes every `{{config.*}}`/`{{date.*}}`/`{{env.*}}` placeholder in
/// `input`, against `config` for the `config` namespace and `now` for the
/// `date` namespace. Unresolvable placeholders are replaced with an empty
/// string rather than left in place or treated as an error, matching the
/// teacher's permissive text-substitution style elsewhere in the pipeline
/// (SIMPLE-mode default values).
pub fn substitute_string(input: &str, config: &Value, now: DateTime<Utc>) -> String {
    PLACEHOLDER_RE
        .replace_all(input, |caps: &regex::Captures| {
            let namespace = &caps[1];
            let path = &caps[2];
            let resolved = match namespace {
                "config" => gateway_types::json_path::get(config, path).map(value_to_plain_string),
                "date" => date_field(path, now),
                "env" => std::env::var(path).ok(),
                _ => None,
            };
            resolved.unwrap_or_default()
        })
        .into_owned()
}

/// Recursively substitutes placeholders through every string leaf of a JSON
/// value, for pipeline stages and request bodies.
pub fn substitute_value(value: &Value, config: &Value, now: DateTime<Utc>) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_string(s, config, now)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute_value(v, config, now)).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), substitute_value(v, config, now))).collect())
        }
        other => other.clone(),
    }
}
