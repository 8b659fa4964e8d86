/// Failures raised while running the per-event pipeline. An uncaught error
/// of this kind is itself caught at the pipeline boundary and turned into
/// an audit `FAILED(WORKER_ERROR)` plus a nack, never propagated further.
#[derive(Debug, thiserror::Error)]
pub enum EventHandlerError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] gateway_store_core::StoreError),
    /// The scheduling script failed to parse or evaluate.
    #[error("scheduling script error: {0}")]
    Schedule(String),
    /// A scheduled-path transform failed.
    #[error("transform error: {0}")]
    Transform(#[from] gateway_transformer::TransformError),
    /// Single- or multi-action delivery failed outright (not a classified
    /// delivery outcome, an orchestration error).
    #[error("delivery error: {0}")]
    Delivery(#[from] gateway_delivery::DeliveryError),
}
