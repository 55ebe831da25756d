//! HTTP API: scheduler extender endpoints, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use loadaware_lib::{LoadAware, LoadAwareMetrics, SchedulingRequest, StructuredLogger};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub plugin: LoadAware,
    pub metrics: LoadAwareMetrics,
    pub logger: StructuredLogger,
    ready: AtomicBool,
}

impl AppState {
    pub fn new(plugin: LoadAware, metrics: LoadAwareMetrics, logger: StructuredLogger) -> Self {
        Self {
            plugin,
            metrics,
            logger,
            ready: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Response to `/filter`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub node_names: Vec<String>,
    /// Rejected node name to reason
    pub failed_nodes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// One entry of the `/prioritize` response
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostPriority {
    pub host: String,
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
}

async fn filter(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SchedulingRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let message = rejection.body_text();
            state.logger.log_bad_request("/filter", &message);
            let result = FilterResult {
                error: message,
                ..Default::default()
            };
            return (StatusCode::BAD_REQUEST, Json(result));
        }
    };

    let started = Instant::now();
    let now = Utc::now();
    let pod_name = request.pod.namespaced_name().to_string();
    let mut result = FilterResult::default();

    for node_state in &request.nodes {
        let status = state.plugin.filter(&request.pod, node_state, now);
        state.metrics.record_filter(&status);
        let node_name = node_state.node.name.clone();
        match status.reason() {
            None => result.node_names.push(node_name),
            Some(reason) => {
                state.logger.log_filter_rejected(&pod_name, &node_name, &status);
                result.failed_nodes.insert(node_name, reason.to_string());
            }
        }
    }

    state.metrics.observe_filter_latency(started.elapsed().as_secs_f64());
    (StatusCode::OK, Json(result))
}

async fn prioritize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SchedulingRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            state.logger.log_bad_request("/prioritize", &rejection.body_text());
            return (StatusCode::BAD_REQUEST, Json(Vec::<HostPriority>::new()));
        }
    };

    let started = Instant::now();
    let now = Utc::now();
    let pod_name = request.pod.namespaced_name().to_string();

    let priorities: Vec<HostPriority> = request
        .nodes
        .iter()
        .map(|node_state| {
            let score = state.plugin.score(&request.pod, node_state, now);
            state.metrics.inc_nodes_scored();
            state.logger.log_score(&pod_name, &score);
            HostPriority {
                host: score.node,
                score: score.score,
            }
        })
        .collect();

    state.metrics.observe_score_latency(started.elapsed().as_secs_f64());
    (StatusCode::OK, Json(priorities))
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ready = state.is_ready();
    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(ReadinessResponse { ready }))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %err, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/filter", post(filter))
        .route("/prioritize", post(prioritize))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting extender server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
