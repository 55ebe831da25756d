//! Core data models for load-aware evaluation
//!
//! Telemetry (`NodeMetric`) is produced by the node agent; nodes, pods and
//! assignment records come from the scheduler. All of them are read-only
//! inputs to one evaluation.

use crate::aggregation::AggregationType;
use crate::duration::serde_go;
use crate::resource::ResourceList;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

/// Namespace-qualified workload identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedName {
    pub namespace: String,
    pub name: String,
}

impl NamespacedName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for NamespacedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Workload priority classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PriorityClass {
    #[serde(rename = "koord-prod")]
    Prod,
    #[serde(rename = "koord-mid")]
    Mid,
    #[serde(rename = "koord-batch")]
    Batch,
    #[serde(rename = "koord-free")]
    Free,
    #[default]
    #[serde(rename = "none", alias = "")]
    None,
}

impl PriorityClass {
    pub fn is_prod(&self) -> bool {
        matches!(self, PriorityClass::Prod)
    }
}

/// Node usage snapshot reported by the node agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetric {
    #[serde(default)]
    pub spec: NodeMetricSpec,
    #[serde(default)]
    pub status: NodeMetricStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetricSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collect_policy: Option<CollectPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectPolicy {
    /// How often the agent reports, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_interval_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetricStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_metric: Option<NodeMetricInfo>,
    #[serde(default)]
    pub pods_metric: Vec<PodMetricInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetricInfo {
    /// Most recent node usage
    #[serde(default)]
    pub node_usage: ResourceList,
    /// Historical windows; durations are not guaranteed unique
    #[serde(default)]
    pub aggregated_node_usages: Vec<AggregatedUsage>,
}

/// Usage aggregated over one retention window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedUsage {
    #[serde(with = "serde_go")]
    pub duration: Duration,
    #[serde(default)]
    pub usage: HashMap<AggregationType, ResourceList>,
}

/// Usage reported for a single pod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodMetricInfo {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub priority: PriorityClass,
    #[serde(default)]
    pub pod_usage: ResourceList,
}

impl PodMetricInfo {
    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub allocatable: ResourceList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    #[serde(default)]
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub priority_class: PriorityClass,
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
    /// Summed container requests
    #[serde(default)]
    pub requests: ResourceList,
    /// Summed container limits
    #[serde(default)]
    pub limits: ResourceList,
}

impl Pod {
    pub fn namespaced_name(&self) -> NamespacedName {
        NamespacedName::new(&self.namespace, &self.name)
    }

    pub fn is_prod(&self) -> bool {
        self.priority_class.is_prod()
    }
}

/// A pod the scheduler has already bound to a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPod {
    pub pod: Pod,
    pub assigned_time: DateTime<Utc>,
    /// Estimate computed when the pod was assigned, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated: Option<ResourceList>,
}

/// Everything known about one candidate node for one evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub node: Node,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_metric: Option<NodeMetric>,
    #[serde(default)]
    pub assigned_pods: Vec<AssignedPod>,
}

/// A pod to place and the candidate nodes to evaluate it against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulingRequest {
    pub pod: Pod,
    #[serde(default)]
    pub nodes: Vec<NodeState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceName;

    #[test]
    fn test_node_metric_deserialize() {
        let json = r#"{
            "spec": {"collectPolicy": {"reportIntervalSeconds": 30}},
            "status": {
                "updateTime": "2024-01-01T00:00:00Z",
                "nodeMetric": {
                    "nodeUsage": {"cpu": "2", "memory": "4Gi"},
                    "aggregatedNodeUsages": [
                        {"duration": "5m0s", "usage": {"p95": {"cpu": "2500m"}}}
                    ]
                },
                "podsMetric": [
                    {"namespace": "default", "name": "web", "priority": "koord-prod",
                     "podUsage": {"cpu": "500m"}}
                ]
            }
        }"#;
        let metric: NodeMetric = serde_json::from_str(json).unwrap();

        let policy = metric.spec.collect_policy.as_ref().unwrap();
        assert_eq!(policy.report_interval_seconds, Some(30));
        let info = metric.status.node_metric.as_ref().unwrap();
        assert_eq!(info.node_usage.get(ResourceName::Cpu), Some(2000));
        assert_eq!(info.aggregated_node_usages[0].duration, Duration::from_secs(300));
        assert_eq!(
            info.aggregated_node_usages[0].usage[&AggregationType::P95].get(ResourceName::Cpu),
            Some(2500)
        );
        assert!(metric.status.pods_metric[0].priority.is_prod());
    }

    #[test]
    fn test_out_of_range_window_duration_is_rejected() {
        let json = r#"{"status": {"nodeMetric": {"aggregatedNodeUsages": [
            {"duration": "99999999999999999999h", "usage": {}}
        ]}}}"#;
        let err = serde_json::from_str::<NodeMetric>(json).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_empty_node_metric_defaults() {
        let metric: NodeMetric = serde_json::from_str("{}").unwrap();
        assert!(metric.status.update_time.is_none());
        assert!(metric.status.node_metric.is_none());
        assert!(metric.status.pods_metric.is_empty());
    }

    #[test]
    fn test_pod_priority_defaults_to_none() {
        let pod: Pod = serde_json::from_str(r#"{"namespace": "ns", "name": "p"}"#).unwrap();
        assert_eq!(pod.priority_class, PriorityClass::None);
        assert!(!pod.is_prod());
        assert_eq!(pod.namespaced_name().to_string(), "ns/p");
    }
}
