//! Snapshot freshness
//!
//! A snapshot older than the configured expiration cannot be trusted for
//! usage-based filtering or scoring. The caller samples `now` once per
//! evaluation and passes it to every check.

use crate::models::NodeMetric;
use chrono::{DateTime, Duration, Utc};

/// Report cadence assumed when the snapshot does not declare one
pub const DEFAULT_NODE_METRIC_REPORT_INTERVAL: Duration = Duration::seconds(60);

/// True when the snapshot is missing, has no update time, or (for a
/// positive `expiration_seconds`) is at least that old. A non-positive
/// expiration disables the age check.
pub fn is_node_metric_expired(
    node_metric: Option<&NodeMetric>,
    expiration_seconds: i64,
    now: DateTime<Utc>,
) -> bool {
    let Some(update_time) = node_metric.and_then(|metric| metric.status.update_time) else {
        return true;
    };
    expiration_seconds > 0
        && Duration::try_seconds(expiration_seconds)
            .is_some_and(|limit| now.signed_duration_since(update_time) >= limit)
}

/// Reporting cadence declared by the snapshot, or the default
pub fn node_metric_report_interval(node_metric: &NodeMetric) -> Duration {
    node_metric
        .spec
        .collect_policy
        .as_ref()
        .and_then(|policy| policy.report_interval_seconds)
        .and_then(Duration::try_seconds)
        .unwrap_or(DEFAULT_NODE_METRIC_REPORT_INTERVAL)
}
