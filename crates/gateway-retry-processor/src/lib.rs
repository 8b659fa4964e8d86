#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-retry-processor** – re-invokes delivery for `execution_logs`
//! rows stuck in `RETRYING` once their backoff window has elapsed (§4.13).

mod error;
mod processor;

pub use error::RetryProcessorError;
pub use processor::{RetryProcessor, RetryProcessorConfig};
