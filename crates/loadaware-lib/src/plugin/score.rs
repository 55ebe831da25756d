//! Least-used scoring

use super::estimation::estimated_assigned_pod_used;
use super::LoadAware;
use crate::aggregation::target_aggregated_usage;
use crate::args::score_with_aggregation;
use crate::freshness::is_node_metric_expired;
use crate::models::{NodeMetric, NodeState, Pod};
use crate::resource::{ResourceList, ResourceName};
use crate::workload::{build_pod_metric_map, sum_pod_usages};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub const MAX_NODE_SCORE: i64 = 100;

/// Score for one node, with the inputs that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeScore {
    pub node: String,
    /// 0..=100, higher means more spare capacity
    pub score: i64,
    /// Usage after placing the pod, including estimates
    pub used: ResourceList,
    pub allocatable: ResourceList,
}

impl NodeScore {
    fn zero(node: &str) -> Self {
        Self {
            node: node.to_string(),
            score: 0,
            used: ResourceList::new(),
            allocatable: ResourceList::new(),
        }
    }
}

impl LoadAware {
    /// Score `pod` on the node described by `node_state`. Missing or expired
    /// snapshots score zero.
    pub fn score(&self, pod: &Pod, node_state: &NodeState, now: DateTime<Utc>) -> NodeScore {
        let node_name = node_state.node.name.as_str();
        let Some(node_metric) = node_state.node_metric.as_ref() else {
            return NodeScore::zero(node_name);
        };
        let args = self.args();
        if is_node_metric_expired(Some(node_metric), args.node_metric_expiration_seconds, now) {
            return NodeScore::zero(node_name);
        }

        let prod_pod = pod.is_prod() && args.score_according_prod_usage;
        let pod_metrics = build_pod_metric_map(node_metric, prod_pod);

        let mut used = self.estimator().estimate_pod(pod);
        let (assigned_used, estimated_pods) = estimated_assigned_pod_used(
            node_state,
            node_metric,
            &pod_metrics,
            prod_pod,
            args,
            self.estimator(),
        );
        used.add(&assigned_used);

        let partition = sum_pod_usages(&pod_metrics, &estimated_pods);
        if prod_pod {
            used.add(&partition.observed);
        } else if let Some(node_usage) = self.score_node_usage(node_metric) {
            // estimated pods are already counted above
            used.add(&node_usage.saturating_sub(&partition.estimated));
        }

        let allocatable = self.estimator().estimate_node(&node_state.node);
        let score = load_aware_scheduling_scorer(&args.resource_weights, &used, &allocatable);
        NodeScore {
            node: node_name.to_string(),
            score,
            used,
            allocatable,
        }
    }

    fn score_node_usage<'a>(&self, node_metric: &'a NodeMetric) -> Option<&'a ResourceList> {
        let aggregated = self.args().aggregated.as_ref();
        match aggregated.and_then(|a| a.score_aggregation_type) {
            Some(aggregation_type) if score_with_aggregation(aggregated) => target_aggregated_usage(
                node_metric,
                aggregated.and_then(|a| a.score_aggregated_duration),
                aggregation_type,
            ),
            _ => node_metric.status.node_metric.as_ref().map(|info| &info.node_usage),
        }
    }
}

/// Weighted mean of per-resource least-used scores
pub fn load_aware_scheduling_scorer(
    resource_weights: &BTreeMap<ResourceName, i64>,
    used: &ResourceList,
    allocatable: &ResourceList,
) -> i64 {
    let mut node_score: i64 = 0;
    let mut weight_sum: i64 = 0;
    for (&resource, &weight) in resource_weights {
        let score = least_used_score(used.value(resource), allocatable.value(resource));
        node_score = node_score.saturating_add(score.saturating_mul(weight));
        weight_sum = weight_sum.saturating_add(weight);
    }
    if weight_sum == 0 {
        return 0;
    }
    node_score / weight_sum
}

/// Share of capacity left unused, scaled to [`MAX_NODE_SCORE`]
pub fn least_used_score(used: i64, capacity: i64) -> i64 {
    if capacity == 0 || used > capacity {
        return 0;
    }
    (capacity - used) * MAX_NODE_SCORE / capacity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::AggregationType;
    use crate::args::{AggregatedArgs, LoadAwareArgs};
    use crate::models::{AggregatedUsage, AssignedPod, PriorityClass};
    use crate::plugin::testing::*;
    use chrono::Duration;
    use std::collections::HashMap;

    #[test]
    fn test_least_used_score() {
        assert_eq!(least_used_score(0, 100), 100);
        assert_eq!(least_used_score(25, 100), 75);
        assert_eq!(least_used_score(100, 100), 0);
        assert_eq!(least_used_score(150, 100), 0);
        assert_eq!(least_used_score(10, 0), 0);
    }

    #[test]
    fn test_weighted_scorer() {
        let weights = BTreeMap::from([(ResourceName::Cpu, 3), (ResourceName::Memory, 1)]);
        let score = load_aware_scheduling_scorer(&weights, &resources(0, 1000), &resources(1000, 1000));
        assert_eq!(score, 75);
        assert_eq!(load_aware_scheduling_scorer(&BTreeMap::new(), &resources(0, 0), &resources(1, 1)), 0);
    }

    #[test]
    fn test_weighted_scorer_huge_weights() {
        let weights = BTreeMap::from([(ResourceName::Cpu, i64::MAX), (ResourceName::Memory, i64::MAX)]);
        let score = load_aware_scheduling_scorer(&weights, &resources(0, 0), &resources(1000, 1000));
        assert!((0..=MAX_NODE_SCORE).contains(&score));
    }

    #[test]
    fn test_score_counts_node_usage_and_pod_estimate() {
        let now = Utc::now();
        let metric = node_metric(now - Duration::seconds(5), resources(1000, 2000));
        let s = state(node(4000, 10000), Some(metric));
        let plugin = LoadAware::new(LoadAwareArgs::default());

        let result = plugin.score(&pod("p", PriorityClass::None, 1000, 1000), &s, now);
        // cpu: 1000 + 850 = 1850 of 4000 -> 53; memory: 2000 + 700 = 2700 of 10000 -> 73
        assert_eq!(result.used.get(ResourceName::Cpu), Some(1850));
        assert_eq!(result.used.get(ResourceName::Memory), Some(2700));
        assert_eq!(result.score, (53 + 73) / 2);
        assert_eq!(result.node, "node-1");
    }

    #[test]
    fn test_expired_or_missing_metric_scores_zero() {
        let now = Utc::now();
        let plugin = LoadAware::new(LoadAwareArgs::default());
        let p = pod("p", PriorityClass::None, 1, 1);

        let missing = state(node(4000, 4000), None);
        assert_eq!(plugin.score(&p, &missing, now).score, 0);

        let old = state(node(4000, 4000), Some(node_metric(now - Duration::hours(1), resources(0, 0))));
        assert_eq!(plugin.score(&p, &old, now).score, 0);
    }

    #[test]
    fn test_estimated_pod_usage_not_double_counted() {
        let now = Utc::now();
        let update = now - Duration::seconds(5);
        let mut metric = node_metric(update, resources(2000, 2000));
        metric.status.pods_metric = vec![pod_metric("a", PriorityClass::None, 500, 500)];
        let mut s = state(node(10000, 10000), Some(metric));
        s.assigned_pods = vec![AssignedPod {
            pod: pod("a", PriorityClass::None, 1000, 1000),
            assigned_time: update - Duration::seconds(10),
            estimated: None,
        }];
        let plugin = LoadAware::new(LoadAwareArgs::default());

        let result = plugin.score(&pod("p", PriorityClass::None, 0, 0), &s, now);
        // incoming: 250 cpu default; assigned: max(850, 500); node 2000 - 500 reported
        assert_eq!(result.used.get(ResourceName::Cpu), Some(250 + 850 + 1500));
    }

    #[test]
    fn test_prod_pod_scored_by_prod_usage() {
        let now = Utc::now();
        let mut metric = node_metric(now, resources(9000, 9000));
        metric.status.pods_metric = vec![
            pod_metric("prod", PriorityClass::Prod, 1000, 1000),
            pod_metric("batch", PriorityClass::Batch, 5000, 5000),
        ];
        let s = state(node(10000, 10000), Some(metric));
        let args = LoadAwareArgs {
            score_according_prod_usage: true,
            ..Default::default()
        };

        let result = LoadAware::new(args).score(&pod("p", PriorityClass::Prod, 1000, 1000), &s, now);
        assert_eq!(result.used.get(ResourceName::Cpu), Some(850 + 1000));
    }

    #[test]
    fn test_score_with_aggregated_usage() {
        let now = Utc::now();
        let mut metric = node_metric(now, resources(9000, 9000));
        if let Some(info) = metric.status.node_metric.as_mut() {
            info.aggregated_node_usages = vec![AggregatedUsage {
                duration: std::time::Duration::from_secs(1800),
                usage: HashMap::from([(AggregationType::Avg, resources(3000, 3000))]),
            }];
        }
        let s = state(node(10000, 10000), Some(metric));
        let args = LoadAwareArgs {
            aggregated: Some(AggregatedArgs {
                score_aggregation_type: Some(AggregationType::Avg),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = LoadAware::new(args).score(&pod("p", PriorityClass::None, 1000, 1000), &s, now);
        assert_eq!(result.used.get(ResourceName::Cpu), Some(850 + 3000));
    }
}
