/// Failures a transform run can raise. A `null` script return is not an
/// error; it is modeled as `Ok(None)` by [`crate::Transformer::transform`].
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// SIMPLE-mode mapping failure, or a SCRIPT parse/exec error.
    #[error("transformation error: {0}")]
    TransformationError(String),
    /// The transformed result exceeds the maximum nesting depth.
    #[error("transformed object too deep")]
    TooDeep,
    /// A lookup's source/target paths disagree on array-vs-scalar shape.
    #[error("lookup {lookup_type} source/target array agreement mismatch")]
    LookupAgreementMismatch {
        /// The lookup table name.
        lookup_type: String,
    },
    /// A lookup declared `unmappedBehavior = FAIL` and had no value to map.
    #[error("lookup {lookup_type} had no value for an unmapped field")]
    LookupUnmapped {
        /// The lookup table name.
        lookup_type: String,
    },
    /// The SCRIPT mode exceeded its wall-clock budget.
    #[error("script execution timed out")]
    Timeout,
}
