//! Estimated usage of pods assigned to a node but not yet trusted in its report

use crate::aggregation::target_aggregated_usage;
use crate::args::LoadAwareArgs;
use crate::daemon::is_daemon_set_pod;
use crate::estimator::Estimator;
use crate::freshness::node_metric_report_interval;
use crate::models::{NodeMetric, NodeState};
use crate::resource::ResourceList;
use crate::temporal::ReportState;
use crate::workload::{EstimationSet, PodMetricMap};

/// Estimated usage of the node's assigned pods, and the set of pods that
/// were estimated.
///
/// A pod is estimated when its reported usage is missing, when the report
/// cannot yet reflect it, or when scoring by aggregated usage has no sample
/// to read. DaemonSet pods are never estimated. Each estimated pod counts
/// the larger of its estimate and its reported usage, per resource.
pub fn estimated_assigned_pod_used(
    node_state: &NodeState,
    node_metric: &NodeMetric,
    pod_metrics: &PodMetricMap,
    filter_prod_pod: bool,
    args: &LoadAwareArgs,
    estimator: &dyn Estimator,
) -> (ResourceList, EstimationSet) {
    let mut estimated_used = ResourceList::new();
    let mut estimated_pods = EstimationSet::new();

    let update_time = node_metric.status.update_time;
    let report_interval = node_metric_report_interval(node_metric);
    let missing_score_sample = args
        .aggregated
        .as_ref()
        .and_then(|aggregated| {
            let aggregation_type = aggregated.score_aggregation_type?;
            Some((aggregation_type, aggregated.score_aggregated_duration))
        })
        .is_some_and(|(aggregation_type, duration)| {
            target_aggregated_usage(node_metric, duration, aggregation_type).is_none()
        });

    for assigned in &node_state.assigned_pods {
        let pod = &assigned.pod;
        if is_daemon_set_pod(&pod.owner_references) {
            continue;
        }
        if filter_prod_pod && !pod.is_prod() {
            continue;
        }

        let name = pod.namespaced_name();
        let reported = pod_metrics.get(&name).filter(|usage| !usage.is_empty());
        let state = match update_time {
            Some(update_time) => {
                ReportState::classify(assigned.assigned_time, update_time, report_interval)
            }
            None => ReportState::NotYetReported,
        };

        if reported.is_some() && !state.needs_estimation() && !missing_score_sample {
            continue;
        }

        let estimate = match &assigned.estimated {
            Some(estimate) => estimate.clone(),
            None => estimator.estimate_pod(pod),
        };
        for (resource, value) in estimate.iter() {
            let reported_value = reported.and_then(|usage| usage.get(resource)).unwrap_or(0);
            estimated_used.add_value(resource, value.max(reported_value));
        }
        estimated_pods.insert(name);
    }

    (estimated_used, estimated_pods)
}
