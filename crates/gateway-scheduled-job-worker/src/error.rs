/// Errors surfaced by the scheduled-job worker.
#[derive(Debug, thiserror::Error)]
pub enum JobWorkerError {
    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] gateway_store_core::StoreError),
    /// The delivery engine returned an error.
    #[error("delivery error: {0}")]
    Delivery(#[from] gateway_delivery::DeliveryError),
    /// The data source was misconfigured or absent.
    #[error("no data source configured for scheduled job")]
    NoDataSource,
    /// No document-store client is wired in; `gateway-scheduled-job-worker`
    /// ships only the trait seam, same posture as `gateway-adapters`'
    /// stream-broker and `gateway-delivery`'s channel-adapter registry.
    #[error("no document-store client configured")]
    NoDocumentStore,
    /// The SQL data source requires a dedicated pool that was never wired.
    #[error("sql pool `{0}` is not configured")]
    UnknownSqlPool(String),
    /// A SQL query against a configured pool failed.
    #[error("sql error: {0}")]
    Sql(#[from] sqlx::Error),
    /// The HTTP data source call failed outright.
    #[error("http data source error: {0}")]
    Http(#[from] reqwest::Error),
    /// The HTTP data source returned a non-2xx response.
    #[error("http data source returned status {0}")]
    HttpStatus(u16),
    /// The cron expression on a `JobSchedule::Cron` failed to parse.
    #[error("invalid cron expression `{0}`: {1}")]
    InvalidCron(String, String),
}
