/// Failures raised by the source-adapter manager or an individual adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// A configured table or column name failed identifier validation.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] gateway_store_core::StoreError),
    /// A table-poll query failed.
    #[error("table poll query failed: {0}")]
    Sql(#[from] sqlx::Error),
    /// A source config failed to deserialize into a known [`gateway_types::SourceConfig`] variant.
    #[error("invalid source config: {0}")]
    InvalidConfig(#[from] serde_json::Error),
    /// A table-poll source config was resolved but no SQL pool was
    /// configured on the manager.
    #[error("table-poll adapter requires a SQL pool, none configured")]
    MissingSqlPool,
    /// No stream-broker implementation is registered for this deployment.
    #[error("no stream broker registered for topic {0}")]
    NoStreamBroker(String),
}
