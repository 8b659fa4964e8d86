/// Failures a store implementation can raise. Local to this crate; callers
/// that cross into another crate's error type wrap this with `anyhow`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No row exists for the given id.
    #[error("not found: {0}")]
    NotFound(String),
    /// A compare-and-swap update's expected version did not match the
    /// stored version; the caller should re-read and retry.
    #[error("version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Id of the document the conflicting write targeted.
        id: String,
        /// Version the caller expected.
        expected: u64,
        /// Version actually stored.
        actual: u64,
    },
    /// The backing store rejected the operation (connection, serialization,
    /// constraint violation).
    #[error("backend error: {0}")]
    Backend(String),
}
