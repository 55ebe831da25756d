//! Usage-threshold filtering

use super::LoadAware;
use crate::aggregation::target_aggregated_usage;
use crate::args::UsageThresholds;
use crate::daemon::is_daemon_set_pod;
use crate::freshness::is_node_metric_expired;
use crate::models::{Node, NodeMetric, NodeState, Pod};
use crate::resource::{ResourceList, ResourceName};
use crate::thresholds::usage_thresholds_filter_profile;
use crate::workload::{build_pod_metric_map, sum_pod_usages, EstimationSet};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const ERR_REASON_NODE_METRIC_EXPIRED: &str = "node(s) nodeMetric expired";
pub const ERR_REASON_USAGE_EXCEED_THRESHOLD: &str = "node(s) {} usage exceed threshold";
pub const ERR_REASON_AGGREGATED_USAGE_EXCEED_THRESHOLD: &str =
    "node(s) {} aggregated usage exceed threshold";
pub const ERR_REASON_PROD_USAGE_EXCEED_THRESHOLD: &str = "node(s) {} of prod usage exceed threshold";

/// Outcome of filtering one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FilterStatus {
    Success,
    Unschedulable(String),
}

impl FilterStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, FilterStatus::Success)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            FilterStatus::Success => None,
            FilterStatus::Unschedulable(reason) => Some(reason),
        }
    }
}

impl LoadAware {
    /// Decide whether `pod` may land on the node described by `node_state`.
    /// `now` must be sampled once by the caller for the whole evaluation.
    pub fn filter(&self, pod: &Pod, node_state: &NodeState, now: DateTime<Utc>) -> FilterStatus {
        if is_daemon_set_pod(&pod.owner_references) {
            return FilterStatus::Success;
        }
        let Some(node_metric) = node_state.node_metric.as_ref() else {
            return FilterStatus::Success;
        };

        let args = self.args();
        if args.filter_expired_node_metrics
            && is_node_metric_expired(Some(node_metric), args.node_metric_expiration_seconds, now)
        {
            if args.enable_schedule_when_node_metrics_expired {
                return FilterStatus::Success;
            }
            return FilterStatus::Unschedulable(ERR_REASON_NODE_METRIC_EXPIRED.to_string());
        }

        let node = &node_state.node;
        let profile = usage_thresholds_filter_profile(node, args);
        if !profile.prod_usage_thresholds.is_empty() && pod.is_prod() {
            return filter_prod_usage(node, node_metric, &profile.prod_usage_thresholds);
        }

        match &profile.aggregated_usage {
            Some(policy) => match target_aggregated_usage(
                node_metric,
                policy.usage_aggregated_duration,
                policy.usage_aggregation_type,
            ) {
                Some(usage) => check_usage(
                    node,
                    usage,
                    &policy.usage_thresholds,
                    ERR_REASON_AGGREGATED_USAGE_EXCEED_THRESHOLD,
                ),
                None => FilterStatus::Success,
            },
            None => match &node_metric.status.node_metric {
                Some(info) => check_usage(
                    node,
                    &info.node_usage,
                    &profile.usage_thresholds,
                    ERR_REASON_USAGE_EXCEED_THRESHOLD,
                ),
                None => FilterStatus::Success,
            },
        }
    }
}

fn filter_prod_usage(node: &Node, node_metric: &NodeMetric, thresholds: &UsageThresholds) -> FilterStatus {
    let pod_metrics = build_pod_metric_map(node_metric, true);
    let prod_usage = sum_pod_usages(&pod_metrics, &EstimationSet::new()).observed;
    check_usage(node, &prod_usage, thresholds, ERR_REASON_PROD_USAGE_EXCEED_THRESHOLD)
}

/// Fails on the first resource (in name order) whose usage percentage of
/// allocatable reaches its threshold. Zero thresholds and zero allocatable
/// are not checked.
fn check_usage(
    node: &Node,
    usage: &ResourceList,
    thresholds: &UsageThresholds,
    reason_template: &str,
) -> FilterStatus {
    for (&resource, &threshold) in thresholds {
        if threshold == 0 {
            continue;
        }
        let total = node.allocatable.value(resource);
        if total == 0 {
            continue;
        }
        let used = usage.value(resource);
        if usage_percent(used, total) >= threshold {
            return FilterStatus::Unschedulable(reason(reason_template, resource));
        }
    }
    FilterStatus::Success
}

fn usage_percent(used: i64, total: i64) -> i64 {
    (used as f64 / total as f64 * 100.0).round() as i64
}

fn reason(template: &str, resource: ResourceName) -> String {
    template.replacen("{}", resource.as_str(), 1)
}
