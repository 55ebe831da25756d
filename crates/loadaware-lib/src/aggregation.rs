//! Selection of an aggregated usage sample from a node snapshot
//!
//! A snapshot carries several historical windows, each aggregated with
//! several statistics. Callers either ask for an exact window or let a
//! [`DefaultWindowPolicy`] pick one.

use crate::models::{NodeMetric, NodeMetricInfo};
use crate::resource::ResourceList;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Statistic used to aggregate usage over a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    Avg,
    P50,
    P90,
    P95,
    P99,
}

impl AggregationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Avg => "avg",
            AggregationType::P50 => "p50",
            AggregationType::P90 => "p90",
            AggregationType::P95 => "p95",
            AggregationType::P99 => "p99",
        }
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg" => Ok(AggregationType::Avg),
            "p50" => Ok(AggregationType::P50),
            "p90" => Ok(AggregationType::P90),
            "p95" => Ok(AggregationType::P95),
            "p99" => Ok(AggregationType::P99),
            other => Err(format!("unknown aggregation type {other:?}")),
        }
    }
}

/// Picks a usage sample when no window was requested
pub trait DefaultWindowPolicy {
    fn select<'a>(
        &self,
        info: &'a NodeMetricInfo,
        aggregation_type: AggregationType,
    ) -> Option<&'a ResourceList>;
}

/// The widest window that has data for the aggregation type. Equal widths
/// keep the first entry. With no usable window, falls back to the current
/// node usage when that is non-empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct LargestNonEmptyWindow;

impl DefaultWindowPolicy for LargestNonEmptyWindow {
    fn select<'a>(
        &self,
        info: &'a NodeMetricInfo,
        aggregation_type: AggregationType,
    ) -> Option<&'a ResourceList> {
        let mut best: Option<(Duration, &ResourceList)> = None;
        for window in &info.aggregated_node_usages {
            let Some(usage) = window.usage.get(&aggregation_type).filter(|u| !u.is_empty()) else {
                continue;
            };
            if best.map_or(true, |(duration, _)| window.duration > duration) {
                best = Some((window.duration, usage));
            }
        }

        match best {
            Some((_, usage)) => Some(usage),
            None if !info.node_usage.is_empty() => Some(&info.node_usage),
            None => None,
        }
    }
}

/// Usage sample for `duration` and `aggregation_type`, using
/// [`LargestNonEmptyWindow`] when no duration is requested.
pub fn target_aggregated_usage(
    node_metric: &NodeMetric,
    duration: Option<Duration>,
    aggregation_type: AggregationType,
) -> Option<&ResourceList> {
    target_aggregated_usage_with(node_metric, duration, aggregation_type, &LargestNonEmptyWindow)
}

/// Like [`target_aggregated_usage`] with an explicit default policy.
///
/// A node that reports no aggregated windows at all has no sample. A
/// requested (non-zero) duration only ever matches a window of exactly
/// that duration with non-empty usage; no other window is substituted.
pub fn target_aggregated_usage_with<'a, P: DefaultWindowPolicy + ?Sized>(
    node_metric: &'a NodeMetric,
    duration: Option<Duration>,
    aggregation_type: AggregationType,
    policy: &P,
) -> Option<&'a ResourceList> {
    let info = node_metric.status.node_metric.as_ref()?;
    if info.aggregated_node_usages.is_empty() {
        return None;
    }

    match duration.filter(|d| !d.is_zero()) {
        None => policy.select(info, aggregation_type),
        Some(requested) => info
            .aggregated_node_usages
            .iter()
            .filter(|window| window.duration == requested)
            .filter_map(|window| window.usage.get(&aggregation_type))
            .find(|usage| !usage.is_empty()),
    }
}
