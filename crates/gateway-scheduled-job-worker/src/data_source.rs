use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gateway_types::DataSourceConfig;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Column, Row};

use crate::error::JobWorkerError;
use crate::placeholders::{substitute_string, substitute_value};

/// Seam for the document-store aggregation data source. No concrete driver
/// ships in-tree, same posture as `gateway-adapters::StreamBroker` and
/// `gateway-delivery::ChannelAdapterRegistry`: productionizing against a
/// specific document store is a pluggable implementation behind this trait.
#[async_trait]
pub trait DocumentStoreClient: Send + Sync {
    /// Runs an aggregation pipeline against `collection`, returning one
    /// JSON value per result document.
    async fn aggregate(&self, collection: &str, pipeline: Vec<Value>) -> Result<Vec<Value>, JobWorkerError>;
}

/// Default document-store client: always returns [`JobWorkerError::NoDocumentStore`].
pub struct NoDocumentStore;

#[async_trait]
impl DocumentStoreClient for NoDocumentStore {
    async fn aggregate(&self, _collection: &str, _pipeline: Vec<Value>) -> Result<Vec<Value>, JobWorkerError> {
        Err(JobWorkerError::NoDocumentStore)
    }
}

/// Named SQL pools a SQL data source can borrow from: a shared default
/// pool, plus any number of dedicated pools keyed by name.
#[derive(Default)]
pub struct SqlPools {
    default_pool: Option<SqlitePool>,
    named: HashMap<String, SqlitePool>,
}

impl SqlPools {
    /// Builds an empty registry; every SQL data source will fail to
    /// resolve a pool until one is configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the shared default pool, borrowed when a data source names no
    /// dedicated pool.
    pub fn with_default(mut self, pool: SqlitePool) -> Self {
        self.default_pool = Some(pool);
        self
    }

    /// Registers a dedicated pool under `name`.
    pub fn with_named(mut self, name: impl Into<String>, pool: SqlitePool) -> Self {
        self.named.insert(name.into(), pool);
        self
    }

    fn resolve(&self, pool: &Option<String>) -> Result<&SqlitePool, JobWorkerError> {
        match pool {
            Some(name) => self.named.get(name).ok_or_else(|| JobWorkerError::UnknownSqlPool(name.clone())),
            None => self.default_pool.as_ref().ok_or_else(|| JobWorkerError::UnknownSqlPool("default".to_string())),
        }
    }
}

fn column_value(row: &SqliteRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return serde_json::Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return Value::Bool(v);
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::String(v);
    }
    Value::Null
}

fn row_to_json(row: &SqliteRow) -> Value {
    let mut map = serde_json::Map::new();
    for (index, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), column_value(row, index));
    }
    Value::Object(map)
}

/// Executes a [`DataSourceConfig`] against its configured transport,
/// substituting `{{config.*}}`/`{{date.*}}`/`{{env.*}}` placeholders first.
pub struct JobExecutor {
    sql_pools: SqlPools,
    documents: Arc<dyn DocumentStoreClient>,
    http: reqwest::Client,
}

impl JobExecutor {
    /// Builds an executor with no document-store client configured.
    pub fn new(sql_pools: SqlPools) -> Self {
        Self { sql_pools, documents: Arc::new(NoDocumentStore), http: reqwest::Client::new() }
    }

    /// Swaps in a document-store client.
    pub fn with_documents(mut self, documents: Arc<dyn DocumentStoreClient>) -> Self {
        self.documents = documents;
        self
    }

    /// Runs `source`, resolving placeholders against `config` and `now`.
    pub async fn execute(&self, source: &DataSourceConfig, config: &Value, now: DateTime<Utc>) -> Result<Vec<Value>, JobWorkerError> {
        match source {
            DataSourceConfig::Sql { pool, query } => {
                let substituted = substitute_string(query, config, now);
                let pool = self.sql_pools.resolve(pool)?;
                let rows = sqlx::query(&substituted).fetch_all(pool).await?;
                Ok(rows.iter().map(row_to_json).collect())
            }
            DataSourceConfig::Document { collection, pipeline } => {
                let substituted: Vec<Value> = pipeline.iter().map(|stage| substitute_value(stage, config, now)).collect();
                self.documents.aggregate(collection, substituted).await
            }
            DataSourceConfig::Http { url, method, body } => {
                let substituted_url = substitute_string(url, config, now);
                let substituted_body = body.as_ref().map(|b| substitute_value(b, config, now));
                let http_method = reqwest::Method::from_bytes(method.as_bytes()).unwrap_or(reqwest::Method::GET);
                let mut request = self.http.request(http_method, &substituted_url);
                if let Some(body) = &substituted_body {
                    request = request.json(body);
                }
                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(JobWorkerError::HttpStatus(status.as_u16()));
                }
                match response.json::<Value>().await? {
                    Value::Array(items) => Ok(items),
                    other => Ok(vec![other]),
                }
            }
        }
    }
}
