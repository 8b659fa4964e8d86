/// Failures raised while running one scheduler tick.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] gateway_store_core::StoreError),
    /// Delivery orchestration failed outright.
    #[error("delivery error: {0}")]
    Delivery(#[from] gateway_delivery::DeliveryError),
}
