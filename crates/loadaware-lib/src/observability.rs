//! Observability infrastructure for load-aware evaluation
//!
//! Provides:
//! - Prometheus metrics (filter/score latency, filter decisions, expired snapshots)
//! - Structured JSON logging with tracing
//!
//! The evaluation functions themselves stay free of side effects; callers
//! record metrics and log events around them.

use crate::plugin::{FilterStatus, NodeScore};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for evaluation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
];

static GLOBAL_METRICS: OnceLock<LoadAwareMetricsInner> = OnceLock::new();

struct LoadAwareMetricsInner {
    filter_latency_seconds: Histogram,
    score_latency_seconds: Histogram,
    filter_decisions: IntCounterVec,
    expired_node_metrics: IntCounter,
    nodes_scored: IntCounter,
}

impl LoadAwareMetricsInner {
    fn new() -> Self {
        Self {
            filter_latency_seconds: register_histogram!(
                "loadaware_filter_latency_seconds",
                "Time spent filtering one request across all candidate nodes",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register filter_latency_seconds"),

            score_latency_seconds: register_histogram!(
                "loadaware_score_latency_seconds",
                "Time spent scoring one request across all candidate nodes",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register score_latency_seconds"),

            filter_decisions: register_int_counter_vec!(
                "loadaware_filter_decisions_total",
                "Filter outcomes per node",
                &["result"]
            )
            .expect("Failed to register filter_decisions"),

            expired_node_metrics: register_int_counter!(
                "loadaware_expired_node_metrics_total",
                "Nodes rejected because their usage snapshot expired"
            )
            .expect("Failed to register expired_node_metrics"),

            nodes_scored: register_int_counter!(
                "loadaware_nodes_scored_total",
                "Total number of node scores computed"
            )
            .expect("Failed to register nodes_scored"),
        }
    }
}

/// Handle to the process-wide load-aware metrics
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct LoadAwareMetrics {
    _private: (),
}

impl Default for LoadAwareMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadAwareMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(LoadAwareMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &LoadAwareMetricsInner {
        GLOBAL_METRICS.get_or_init(LoadAwareMetricsInner::new)
    }

    pub fn observe_filter_latency(&self, duration_secs: f64) {
        self.inner().filter_latency_seconds.observe(duration_secs);
    }

    pub fn observe_score_latency(&self, duration_secs: f64) {
        self.inner().score_latency_seconds.observe(duration_secs);
    }

    /// Count one filter outcome
    pub fn record_filter(&self, status: &FilterStatus) {
        let result = if status.is_success() { "success" } else { "unschedulable" };
        self.inner().filter_decisions.with_label_values(&[result]).inc();
        if status.reason() == Some(crate::plugin::ERR_REASON_NODE_METRIC_EXPIRED) {
            self.inner().expired_node_metrics.inc();
        }
    }

    pub fn inc_nodes_scored(&self) {
        self.inner().nodes_scored.inc();
    }
}

/// Structured logger for scheduling decisions
#[derive(Clone)]
pub struct StructuredLogger {
    component: String,
}

impl StructuredLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }

    pub fn log_startup(&self, version: &str, listen_port: u16) {
        info!(
            event = "extender_started",
            component = %self.component,
            version = %version,
            listen_port = listen_port,
            "Load-aware scheduler extender started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "extender_shutdown",
            component = %self.component,
            reason = %reason,
            "Load-aware scheduler extender shutting down"
        );
    }

    /// Log a node rejected by the filter
    pub fn log_filter_rejected(&self, pod: &str, node: &str, status: &FilterStatus) {
        if let Some(reason) = status.reason() {
            info!(
                event = "node_filtered",
                component = %self.component,
                pod = %pod,
                node = %node,
                reason = %reason,
                "Node rejected by load-aware filter"
            );
        }
    }

    pub fn log_score(&self, pod: &str, score: &NodeScore) {
        debug!(
            event = "node_scored",
            component = %self.component,
            pod = %pod,
            node = %score.node,
            score = score.score,
            "Node scored by load-aware plugin"
        );
    }

    /// Log a request that could not be evaluated
    pub fn log_bad_request(&self, endpoint: &str, error: &str) {
        warn!(
            event = "bad_request",
            component = %self.component,
            endpoint = %endpoint,
            error = %error,
            "Rejected scheduling request"
        );
    }
}
