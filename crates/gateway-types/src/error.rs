use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, machine-readable error codes used in DLQ entries and delivery
/// logs. Wire-compatible string form via `Display`/`serde` (SCREAMING_SNAKE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryErrorCode {
    /// Target URL failed SSRF/shape validation.
    InvalidUrl,
    /// SIMPLE or SCRIPT transform raised an error.
    TransformationError,
    /// Per-integration rate limit denied the attempt.
    RateLimit,
    /// Auth header construction failed outright.
    AuthFailed,
    /// Cached token was rejected or detected as expired.
    AuthExpired,
    /// Non-retryable 4xx response.
    ClientError,
    /// Retryable 5xx response.
    ServerError,
    /// Request timed out.
    Timeout,
    /// DNS/connection/transport-level failure.
    NetworkError,
    /// Channel-adapter send raised an error.
    CommunicationError,
    /// Referenced action index does not exist.
    ActionNotFound,
    /// A single action within a multi-action sequence failed.
    ActionFailure,
    /// Some but not all actions in a multi-action sequence failed.
    PartialFailure,
    /// Uncaught error in the event-handler pipeline.
    WorkerError,
}

impl fmt::Display for DeliveryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InvalidUrl => "INVALID_URL",
            Self::TransformationError => "TRANSFORMATION_ERROR",
            Self::RateLimit => "RATE_LIMIT",
            Self::AuthFailed => "AUTH_FAILED",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::ClientError => "CLIENT_ERROR",
            Self::ServerError => "SERVER_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::CommunicationError => "COMMUNICATION_ERROR",
            Self::ActionNotFound => "ACTION_NOT_FOUND",
            Self::ActionFailure => "ACTION_FAILURE",
            Self::PartialFailure => "PARTIAL_FAILURE",
            Self::WorkerError => "WORKER_ERROR",
        };
        f.write_str(s)
    }
}

impl DeliveryErrorCode {
    /// Whether this error class is allowed to trip the circuit breaker.
    /// Only infrastructure-class failures count; business-logic failures
    /// (4xx, transform, URL validation) never trip it.
    pub fn trips_circuit(&self) -> bool {
        matches!(self, Self::ServerError | Self::RateLimit | Self::NetworkError | Self::CommunicationError)
    }
}
