#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-scheduled-job-worker** – cron/interval execution of
//! SCHEDULED-JOB integrations (§4.15): pulls from a configured data source,
//! wraps the result, and delivers it through the normal transform/auth
//! pipeline.

mod data_source;
mod error;
mod placeholders;
mod worker;

pub use data_source::{DocumentStoreClient, JobExecutor, NoDocumentStore, SqlPools};
pub use error::JobWorkerError;
pub use worker::{JobWorkerConfig, JobWorkerStore, ScheduledJobWorker};
