#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-store-core** – store-trait abstractions for every persisted
//! collection named in the system's external interfaces.
//!
//! The core treats the store as an external document repository with
//! transactional single-document update semantics. Implementations (this
//! workspace ships `gateway-store-memory` and `gateway-store-sqlite`) give
//! that guarantee through [`versioned::Versioned`]-based compare-and-swap
//! where the backend has no native `findAndModify`.

mod error;
mod traits;
mod versioned;

pub use error::StoreError;
pub use traits::{
    DeliveryLogStore, DlqStore, EventAuditStore, EventSourceConfigStore, EventTypeStore,
    IntegrationConfigStore, PendingDelivery, PendingDeliveryStore, ProcessedEventStore,
    ScheduledItemStore, ScheduledJobLog, ScheduledJobLogStore,
};
pub use versioned::Versioned;
