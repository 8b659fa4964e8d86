use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AdapterError;
use crate::sink::EventSink;

/// Capability set every source-adapter variant implements: start against a
/// shared event sink, stop, and report a display name for logging.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Adapter variant name, for logging and the reconciliation diff.
    fn name(&self) -> &str;

    /// Begins producing events into `sink`. Returns once the adapter's
    /// internal loop has been spawned; the loop itself runs until `stop` is
    /// called (signaled via the adapter's own cancellation token).
    async fn start(&self, sink: Arc<dyn EventSink>) -> Result<(), AdapterError>;

    /// Signals the adapter's loop to stop and awaits its shutdown.
    async fn stop(&self);

    /// `Some(path)` for an `HttpPushAdapter` bound to that ingress path,
    /// `None` for every other variant. Lets the manager locate the right
    /// adapter for an inbound POST without downcasting the trait object.
    fn http_push_path(&self) -> Option<&str> {
        None
    }

    /// Hands one inbound push to an `HttpPushAdapter`; a no-op default for
    /// every other variant, since only `http_push_path` callers reach this.
    async fn accept_push(&self, _event_type: String, _payload: serde_json::Value, _headers: serde_json::Value) {}
}
