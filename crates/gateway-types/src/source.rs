use serde::{Deserialize, Serialize};

/// A tenant's resolved event-source configuration: explicit override if one
/// exists, else the process-wide default. One adapter instance runs per
/// tenant against whichever variant this resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Periodic `SELECT` against a configured table.
    TablePoll(TablePollConfig),
    /// Subscribes to a topic with consumer-group semantics.
    StreamConsumer(StreamConsumerConfig),
    /// Passive: accepts inbound POSTs at a known endpoint.
    HttpPush(HttpPushConfig),
}

impl SourceConfig {
    /// Short, stable label for logging and the `{type, sourceConfig}` hash.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::TablePoll(_) => "table_poll",
            Self::StreamConsumer(_) => "stream_consumer",
            Self::HttpPush(_) => "http_push",
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    5_000
}

/// Table-poll adapter configuration. `table` and every column name in
/// `columns` must pass identifier validation before use; the adapter quotes
/// them with backticks when interpolated into SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePollConfig {
    /// Table to poll.
    pub table: String,
    /// Column-mapping from table columns to a normalized event.
    pub columns: TablePollColumns,
    /// Poll cadence in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Column mapping from a polled row to a normalized [`RawEvent`](crate::RawEvent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePollColumns {
    /// Column holding a stable row id, used as the event's fallback id and
    /// as the poll cursor.
    pub id: String,
    /// Column holding the event type string.
    pub event_type: String,
    /// Column holding the owning tenant id, if the table is multi-tenant.
    /// Omitted when the whole table belongs to one tenant.
    pub tenant_id: Option<String>,
    /// Column holding the JSON payload.
    pub payload: String,
}

/// Stream-consumer adapter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConsumerConfig {
    /// Topic to subscribe to.
    pub topic: String,
    /// Consumer-group id.
    pub consumer_group: String,
}

/// HTTP-push adapter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpPushConfig {
    /// Endpoint path this tenant's pushes arrive on.
    pub path: String,
}
