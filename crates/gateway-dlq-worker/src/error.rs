/// Errors surfaced by the DLQ worker.
#[derive(Debug, thiserror::Error)]
pub enum DlqWorkerError {
    /// A store operation failed.
    #[error("store error: {0}")]
    Store(#[from] gateway_store_core::StoreError),
    /// The delivery engine returned an error.
    #[error("delivery error: {0}")]
    Delivery(#[from] gateway_delivery::DeliveryError),
}
