#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-transformer** – SIMPLE/SCRIPT payload transformation plus
//! post-transform lookups.
//!
//! A `null` SCRIPT return is a first-class "skip delivery" outcome, not an
//! error; callers see it as `Ok(None)`.

mod error;
mod lookup;
mod lookup_provider;
mod simple;

pub use error::TransformError;
pub use lookup_provider::{LookupProvider, MapLookups, NoLookups};
pub use script::{HttpHelper, DEFAULT_SCRIPT_TIMEOUT};

pub mod script;

use gateway_types::json_path;
use gateway_types::{TransformConfig, TransformMode};
use serde_json::Value;
use std::time::Duration;

/// Maximum nesting depth a transformed result may reach before it is
/// rejected as "transformed object too deep".
pub const MAX_RESULT_DEPTH: usize = 50;

/// Runs SIMPLE/SCRIPT transformation and post-transform lookups for one
/// integration or action.
pub struct Transformer {
    http_client: reqwest::Client,
    script_timeout: Duration,
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

impl Transformer {
    /// Builds a transformer with the default 60s script wall-clock budget.
    pub fn new() -> Self {
        Self { http_client: reqwest::Client::new(), script_timeout: DEFAULT_SCRIPT_TIMEOUT }
    }

    /// Overrides the script wall-clock budget.
    pub fn with_script_timeout(mut self, timeout: Duration) -> Self {
        self.script_timeout = timeout;
        self
    }

    /// `transform(config, payload) -> transformedPayload | null`. Applies
    /// the configured mode, then every lookup in order, then enforces the
    /// result depth cap.
    pub async fn transform(
        &self,
        config: &TransformConfig,
        payload: &Value,
        lookups: &dyn LookupProvider,
    ) -> Result<Option<Value>, TransformError> {
        let transformed = match &config.mode {
            TransformMode::Simple { mappings, static_fields } => Some(simple::apply_simple(mappings, static_fields, payload, lookups)?),
            TransformMode::Script { source } => {
                let http = HttpHelper::new(self.http_client.clone(), tokio::runtime::Handle::current(), self.script_timeout);
                script::evaluate(source.clone(), payload.clone(), http, self.script_timeout).await?
            }
        };

        let Some(mut value) = transformed else {
            return Ok(None);
        };

        lookup::apply_lookups(&mut value, &config.lookups, lookups)?;

        if json_path::depth(&value) > MAX_RESULT_DEPTH {
            return Err(TransformError::TooDeep);
        }

        Ok(Some(value))
    }
}
