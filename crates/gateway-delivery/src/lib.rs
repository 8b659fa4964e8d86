#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-delivery** – single-action delivery and the multi-action
//! orchestrator: URL validation, transform, rate limiting, HTTP/channel
//! dispatch, response classification, circuit update, log upsert, and DLQ
//! enqueue.

mod channel;
mod engine;
mod error;
mod multi_action;
mod url_guard;

pub use channel::{provider_key, ChannelAdapterRegistry, NoChannelAdapters};
pub use engine::{DeliveryEngine, DeliveryOptions, DeliveryOutcome, DeliveryStore};
pub use error::DeliveryError;
pub use multi_action::{ActionOutcome, MultiActionResult, MultiActionStatus};
pub use url_guard::validate as validate_target_url;
