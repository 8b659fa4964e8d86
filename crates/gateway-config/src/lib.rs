#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **gateway-config** – deployment configuration for the composition root:
//! which store backend to run against, the HTTP ingress port, which
//! source-adapter kinds and channel providers are compiled in, and
//! overrides for the worker tunables each pipeline-driver crate otherwise
//! defaults on its own.
//!
//! Loaded via the `config` crate layered over a `gateway.toml` file (if
//! present) and `GATEWAY__`-prefixed environment variables, following the
//! teacher's `Config::from_env` composition-root pattern. Loading a local
//! `.env` file is the caller's responsibility (`gateway-cli`'s binary
//! entry point), not this crate's.

mod error;

pub use error::ConfigError;

use serde::Deserialize;

/// Which store backend the runtime should construct.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-process `DashMap`-backed store; state does not survive a restart.
    Memory,
    /// `sqlx`-backed SQLite store at `path`.
    Sqlite {
        /// Filesystem path to the database file.
        path: String,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite { path: "data/gateway.db".to_string() }
    }
}

/// Which source-adapter kinds and channel providers this deployment
/// compiles in. All default to enabled; a deployment with no table-poll
/// sources, say, can turn the capability off rather than wire an unused
/// SQL pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeatureToggles {
    /// Enables the table-poll source-adapter variant.
    pub table_poll: bool,
    /// Enables the stream-consumer source-adapter variant.
    pub stream_consumer: bool,
    /// Enables the HTTP-push source-adapter variant and its ingress route.
    pub http_push: bool,
    /// Enables non-HTTP channel adapters (email, SMS) for `COMMUNICATION`
    /// integrations.
    pub channel_adapters: bool,
}

impl Default for FeatureToggles {
    fn default() -> Self {
        Self { table_poll: true, stream_consumer: true, http_push: true, channel_adapters: true }
    }
}

/// Overrides for the tick interval each worker loop otherwise defaults on
/// its own (§4.12–§4.15). `None` leaves the worker crate's own default in
/// place.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WorkerIntervals {
    /// Override for the scheduler's `SchedulerConfig::interval_ms`.
    pub scheduler_ms: Option<u64>,
    /// Override for the retry processor's poll interval.
    pub retry_processor_ms: Option<u64>,
    /// Override for the DLQ worker's `DlqWorkerConfig::interval_ms`.
    pub dlq_worker_ms: Option<u64>,
    /// Override for the scheduled-job worker's `JobWorkerConfig::interval_ms`.
    pub scheduled_job_worker_ms: Option<u64>,
    /// Override for the source-adapter manager's reconciliation cadence.
    pub adapter_reconcile_ms: Option<u64>,
}

/// Top-level deployment configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store backend to construct.
    pub store: StoreConfig,
    /// Port the HTTP ingress server binds to.
    pub http_port: u16,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `info` or
    /// `gateway_runtime=debug,info`.
    pub log_level: String,
    /// Which source-adapter kinds and channel providers are active.
    pub features: FeatureToggles,
    /// Worker tunable overrides.
    pub workers: WorkerIntervals,
}

fn default_http_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            features: FeatureToggles::default(),
            workers: WorkerIntervals::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `gateway.toml` (if present, working
    /// directory or `GATEWAY_CONFIG_FILE`) layered under
    /// `GATEWAY__`-prefixed, double-underscore-nested environment
    /// variables (e.g. `GATEWAY__HTTP_PORT=9090`,
    /// `GATEWAY__STORE__BACKEND=memory`).
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_file = std::env::var("GATEWAY_CONFIG_FILE").unwrap_or_else(|_| "gateway.toml".to_string());

        let builder = config::Config::builder()
            .set_default("http_port", default_http_port() as i64)?
            .set_default("log_level", default_log_level())?
            .add_source(config::File::with_name(&config_file).required(false))
            .add_source(config::Environment::with_prefix("GATEWAY").separator("__"));

        let loaded = builder.build()?;
        Ok(loaded.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_with_no_file_or_env() {
        std::env::remove_var("GATEWAY_CONFIG_FILE");
        std::env::remove_var("GATEWAY__HTTP_PORT");
        let config = Config::from_env().expect("should load from defaults alone");
        assert_eq!(config.http_port, 8080);
        assert!(config.features.http_push);
    }

    #[test]
    fn environment_override_wins_over_default() {
        std::env::set_var("GATEWAY__HTTP_PORT", "9191");
        let config = Config::from_env().expect("should load with env override");
        assert_eq!(config.http_port, 9191);
        std::env::remove_var("GATEWAY__HTTP_PORT");
    }
}
