//! Effective usage thresholds for a node
//!
//! Operators can attach a per-node override as a JSON annotation. The
//! override is merged field by field over the global policy: an empty field
//! falls back to the global value, and an incomplete aggregated block is
//! dropped as a whole before the global one is considered.

use crate::aggregation::AggregationType;
use crate::args::{AggregatedArgs, LoadAwareArgs, UsageThresholds};
use crate::duration::serde_go_option;
use crate::models::Node;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Node annotation carrying a [`CustomUsageThresholds`] document
pub const ANNOTATION_CUSTOM_USAGE_THRESHOLDS: &str = "scheduling.loadaware.io/usage-thresholds";

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("invalid usage-thresholds annotation: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Per-node override as written by an operator; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomUsageThresholds {
    pub usage_thresholds: UsageThresholds,
    pub prod_usage_thresholds: UsageThresholds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregated_usage: Option<CustomAggregatedUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomAggregatedUsage {
    pub usage_thresholds: UsageThresholds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_aggregation_type: Option<AggregationType>,
    #[serde(with = "serde_go_option", skip_serializing_if = "Option::is_none")]
    pub usage_aggregated_duration: Option<Duration>,
}

/// Resolved thresholds used to judge one node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageThresholdsProfile {
    pub usage_thresholds: UsageThresholds,
    pub prod_usage_thresholds: UsageThresholds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregated_usage: Option<AggregatedUsagePolicy>,
}

/// A complete aggregated-usage block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedUsagePolicy {
    pub usage_thresholds: UsageThresholds,
    pub usage_aggregation_type: AggregationType,
    /// `None` selects the sample with the default window policy
    #[serde(with = "serde_go_option", skip_serializing_if = "Option::is_none")]
    pub usage_aggregated_duration: Option<Duration>,
}

impl AggregatedUsagePolicy {
    fn from_custom(custom: CustomAggregatedUsage) -> Option<Self> {
        if custom.usage_thresholds.is_empty() {
            return None;
        }
        Some(Self {
            usage_aggregation_type: custom.usage_aggregation_type?,
            usage_thresholds: custom.usage_thresholds,
            usage_aggregated_duration: custom.usage_aggregated_duration,
        })
    }

    fn from_args(args: &AggregatedArgs) -> Option<Self> {
        if args.usage_thresholds.is_empty() {
            return None;
        }
        Some(Self {
            usage_aggregation_type: args.usage_aggregation_type?,
            usage_thresholds: args.usage_thresholds.clone(),
            usage_aggregated_duration: args.usage_aggregated_duration,
        })
    }
}

/// Read the override annotation. A missing annotation is `Ok(None)`.
pub fn custom_usage_thresholds(node: &Node) -> Result<Option<CustomUsageThresholds>, OverrideError> {
    node.annotations
        .get(ANNOTATION_CUSTOM_USAGE_THRESHOLDS)
        .map(|raw| serde_json::from_str(raw).map_err(OverrideError::from))
        .transpose()
}

/// Own thresholds unless empty, then the global ones
fn merge_thresholds(own: UsageThresholds, global: &UsageThresholds) -> UsageThresholds {
    if own.is_empty() {
        global.clone()
    } else {
        own
    }
}

/// Complete own block, else the complete global block, else nothing
fn merge_aggregated(
    own: Option<CustomAggregatedUsage>,
    global: Option<&AggregatedArgs>,
) -> Option<AggregatedUsagePolicy> {
    own.and_then(AggregatedUsagePolicy::from_custom)
        .or_else(|| global.and_then(AggregatedUsagePolicy::from_args))
}

/// Merge an override over the global policy
pub fn resolve_profile(
    custom: Option<CustomUsageThresholds>,
    args: &LoadAwareArgs,
) -> UsageThresholdsProfile {
    let custom = custom.unwrap_or_default();
    UsageThresholdsProfile {
        usage_thresholds: merge_thresholds(custom.usage_thresholds, &args.usage_thresholds),
        prod_usage_thresholds: merge_thresholds(
            custom.prod_usage_thresholds,
            &args.prod_usage_thresholds,
        ),
        aggregated_usage: merge_aggregated(custom.aggregated_usage, args.aggregated.as_ref()),
    }
}

/// Effective profile for `node`. An unreadable override is logged and
/// ignored.
pub fn usage_thresholds_filter_profile(node: &Node, args: &LoadAwareArgs) -> UsageThresholdsProfile {
    let custom = custom_usage_thresholds(node).unwrap_or_else(|err| {
        debug!(node = %node.name, error = %err, "Ignoring custom usage thresholds");
        None
    });
    resolve_profile(custom, args)
}
