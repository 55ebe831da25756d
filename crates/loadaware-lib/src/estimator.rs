//! Usage estimation for pods that are not yet visible in telemetry

use crate::args::LoadAwareArgs;
use crate::models::{Node, Pod};
use crate::resource::{ResourceList, ResourceName};
use std::collections::BTreeMap;

/// CPU assumed for a pod that requests none, in milli-cores
pub const DEFAULT_MILLI_CPU_REQUEST: i64 = 250;
/// Memory assumed for a pod that requests none, in bytes (200Mi)
pub const DEFAULT_MEMORY_REQUEST: i64 = 200 * 1024 * 1024;

/// Estimates resource usage of pods and capacity of nodes
pub trait Estimator: Send + Sync {
    fn name(&self) -> &str;

    fn estimate_pod(&self, pod: &Pod) -> ResourceList;

    fn estimate_node(&self, node: &Node) -> ResourceList;
}

/// Scales requests by a per-resource factor, preferring a larger limit
#[derive(Debug, Clone)]
pub struct DefaultEstimator {
    resource_weights: BTreeMap<ResourceName, i64>,
    scaling_factors: BTreeMap<ResourceName, i64>,
}

impl DefaultEstimator {
    pub fn new(args: &LoadAwareArgs) -> Self {
        Self {
            resource_weights: args.resource_weights.clone(),
            scaling_factors: args.estimated_scaling_factors.clone(),
        }
    }
}

impl Estimator for DefaultEstimator {
    fn name(&self) -> &str {
        "default"
    }

    fn estimate_pod(&self, pod: &Pod) -> ResourceList {
        self.resource_weights
            .keys()
            .map(|&resource| {
                let factor = self.scaling_factors.get(&resource).copied().unwrap_or(100);
                (resource, estimated_used_by_resource(pod, resource, factor))
            })
            .collect()
    }

    fn estimate_node(&self, node: &Node) -> ResourceList {
        node.allocatable.clone()
    }
}

fn estimated_used_by_resource(pod: &Pod, resource: ResourceName, scaling_factor: i64) -> i64 {
    let request = pod.requests.value(resource);
    let limit = pod.limits.value(resource);

    let (quantity, scaling_factor) = if limit > request {
        (limit, 100)
    } else {
        (request, scaling_factor)
    };

    if quantity == 0 {
        return match resource {
            ResourceName::Cpu => DEFAULT_MILLI_CPU_REQUEST,
            ResourceName::Memory => DEFAULT_MEMORY_REQUEST,
            _ => 0,
        };
    }

    let estimated = (quantity as f64 * scaling_factor as f64 / 100.0).round() as i64;
    if limit > 0 {
        estimated.min(limit)
    } else {
        estimated
    }
}
