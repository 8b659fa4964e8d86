#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-types** – Core data model for the event-to-integration gateway.
//!
//! This crate owns every entity described in the system's data model: the
//! inbound [`Event`], the per-tenant [`IntegrationConfig`], the
//! [`DeliveryLog`] produced by each delivery attempt, [`ScheduledItem`]s
//! awaiting a future delivery, [`DlqEntry`] dead-letters, [`CircuitState`]
//! per integration, and the [`AuthTokenCache`] attached to OAuth2/custom
//! auth integrations.
//!
//! Nothing in this crate performs I/O. Persistence contracts live in
//! `gateway-store-core`; this crate only defines the shapes that flow
//! through them.

pub mod json_path;

mod event;
mod integration;
mod delivery_log;
mod scheduled_item;
mod dlq;
mod circuit;
mod auth_cache;
mod dedup;
mod error;
mod ids;
mod source;

pub use event::{Event, EventStatus, RawEvent, SkipReason, SourceName};
pub use integration::{
    Action, ActionKind, AuthBlock, AuthKind, CommunicationChannel, DeliveryMode, Direction,
    IntegrationConfig, Lookup, LookupArrayAgreement, RateLimitConfig, SigningSecret,
    SimpleMapping, StaticField, TokenExpiryMarker, TransformConfig, TransformKind,
    TransformMode, UnmappedBehavior,
};
pub use delivery_log::{DeliveryLog, DeliveryStatus, TriggerType};
pub use scheduled_item::{Recurrence, ScheduledItem, ScheduledItemState};
pub use dlq::{DlqEntry, DlqError, DlqStatus};
pub use circuit::{CircuitBreakerState, CircuitState};
pub use auth_cache::AuthTokenCache;
pub use dedup::{DedupRecord, EventFingerprint};
pub use error::DeliveryErrorCode;
pub use ids::{EventId, IntegrationId, TenantId, TraceId};
pub use source::{HttpPushConfig, SourceConfig, StreamConsumerConfig, TablePollColumns, TablePollConfig};
