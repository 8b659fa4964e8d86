/// Failures raised while orchestrating one delivery attempt, as opposed to
/// the classified outcomes (`FAILED`, `RETRYING`, ...) which are first-class
/// [`crate::DeliveryOutcome`] values, not errors.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] gateway_store_core::StoreError),
    /// A multi-action integration referenced an action index that does not
    /// exist.
    #[error("action index {0} not found")]
    ActionNotFound(usize),
}
