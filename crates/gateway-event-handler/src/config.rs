use std::collections::BTreeSet;

/// Tunables for the per-event pipeline.
#[derive(Debug, Clone)]
pub struct EventHandlerConfig {
    /// Payloads larger than this (serialized byte length) are rejected with
    /// `SKIPPED(PAYLOAD_TOO_LARGE)` rather than processed.
    pub max_payload_size: usize,
    /// Recognizes cancellation/reschedule signal events.
    pub cancellation: CancellationConfig,
}

impl Default for EventHandlerConfig {
    fn default() -> Self {
        Self { max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE, cancellation: CancellationConfig::default() }
    }
}

/// Default payload size ceiling: 100 KB.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 100_000;

/// Recognizes a cancellation-signal event type and computes the match key
/// `cancelScheduledIntegrationsByMatch` cancels pending scheduled items by.
///
/// An empty `cancellation_event_types` set disables cancellation handling
/// entirely; no configured schema for this set exists upstream, so it is a
/// deploy-time configuration surface rather than anything derivable from an
/// integration config.
#[derive(Debug, Clone, Default)]
pub struct CancellationConfig {
    /// Event types that signal a cancellation/reschedule rather than a
    /// normal delivery trigger.
    pub cancellation_event_types: BTreeSet<String>,
    /// Dot-path into the event payload that yields the cancellation match
    /// key, matched against `ScheduledItem::cancellation_match_key`.
    pub match_key_path: String,
}

impl CancellationConfig {
    /// Resolves the match key for `payload`, stringifying whatever scalar
    /// value is found (numbers and bools included) so the configured path
    /// need not address a string field.
    pub fn match_key(&self, payload: &serde_json::Value) -> Option<String> {
        let value = gateway_types::json_path::get(payload, &self.match_key_path)?;
        match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}
