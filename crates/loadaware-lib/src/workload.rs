//! Per-pod usage taken from a node snapshot

use crate::models::{NamespacedName, NodeMetric};
use crate::resource::ResourceList;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Reported usage keyed by pod
pub type PodMetricMap = HashMap<NamespacedName, ResourceList>;

/// Pods whose usage is not (or not certainly) in the node's latest report
pub type EstimationSet = HashSet<NamespacedName>;

/// Pod usage split by membership in an [`EstimationSet`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UsagePartition {
    /// Summed usage of pods outside the estimation set
    pub observed: ResourceList,
    /// Summed reported usage of pods inside the estimation set
    pub estimated: ResourceList,
}

/// Map pod identity to reported usage. With `filter_prod_pod`, only
/// production pods are kept. A later duplicate entry replaces an earlier one.
pub fn build_pod_metric_map(node_metric: &NodeMetric, filter_prod_pod: bool) -> PodMetricMap {
    node_metric
        .status
        .pods_metric
        .iter()
        .filter(|pod_metric| !filter_prod_pod || pod_metric.priority.is_prod())
        .map(|pod_metric| (pod_metric.namespaced_name(), pod_metric.pod_usage.clone()))
        .collect()
}

/// Sum pod usages into observed and estimated totals
pub fn sum_pod_usages(pod_metrics: &PodMetricMap, estimated_pods: &EstimationSet) -> UsagePartition {
    let mut partition = UsagePartition::default();
    for (pod, usage) in pod_metrics {
        if estimated_pods.contains(pod) {
            partition.estimated.add(usage);
        } else {
            partition.observed.add(usage);
        }
    }
    partition
}
