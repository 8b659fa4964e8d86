//! HTTP ingress, health, and status endpoints, mirroring the teacher's
//! `create_app`/`health_check`/`orchestration_status` shape.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use gateway_adapters::{AdapterManagerStore, SourceAdapterManager};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

struct IngressState<Store> {
    adapters: Arc<SourceAdapterManager<Store>>,
    started_at: Instant,
}

impl<Store> Clone for IngressState<Store> {
    fn clone(&self) -> Self {
        Self { adapters: self.adapters.clone(), started_at: self.started_at }
    }
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    event_type: String,
    #[serde(default)]
    payload: Value,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    running_adapters: usize,
    uptime_seconds: u64,
}

/// Builds the ingress/health/status router over a live [`SourceAdapterManager`].
pub fn router<Store>(adapters: Arc<SourceAdapterManager<Store>>) -> Router
where
    Store: AdapterManagerStore + Send + Sync + 'static,
{
    let state = IngressState { adapters, started_at: Instant::now() };
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .route("/*path", post(ingress))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).into_inner())
}

async fn health_check<Store>(State(state): State<IngressState<Store>>) -> Json<HealthResponse>
where
    Store: AdapterManagerStore + Send + Sync + 'static,
{
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

async fn status<Store>(State(state): State<IngressState<Store>>) -> Json<StatusResponse>
where
    Store: AdapterManagerStore + Send + Sync + 'static,
{
    Json(StatusResponse {
        running_adapters: state.adapters.running_count(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = serde_json::Map::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        let rendered = value.to_str().unwrap_or("").to_string();
        map.insert(name.as_str().to_string(), Value::String(rendered));
    }
    Value::Object(map)
}

async fn ingress<Store>(
    State(state): State<IngressState<Store>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> impl IntoResponse
where
    Store: AdapterManagerStore + Send + Sync + 'static,
{
    let Some(adapter) = state.adapters.find_http_push(uri.path()) else {
        return (StatusCode::NOT_FOUND, "no http-push adapter bound to this path").into_response();
    };

    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(path = %uri.path(), %err, "malformed http-push envelope");
            return (StatusCode::BAD_REQUEST, "expected {\"event_type\": ..., \"payload\": ...}").into_response();
        }
    };

    adapter.accept_push(envelope.event_type, envelope.payload, headers_to_json(&headers)).await;
    StatusCode::OK.into_response()
}
