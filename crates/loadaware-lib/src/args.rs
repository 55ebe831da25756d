//! Global load-aware scheduling policy

use crate::aggregation::AggregationType;
use crate::duration::serde_go_option;
use crate::resource::ResourceName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// Per-resource usage ceilings, in percent of allocatable (0-100)
pub type UsageThresholds = BTreeMap<ResourceName, i64>;

pub const DEFAULT_NODE_METRIC_EXPIRATION_SECONDS: i64 = 180;

/// Upper bound for a single resource weight
pub const MAX_RESOURCE_WEIGHT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgsError {
    #[error("{field}[{resource}] must be within 0..=100, got {value}")]
    PercentOutOfRange {
        field: &'static str,
        resource: ResourceName,
        value: i64,
    },

    #[error("resourceWeights[{resource}] must be positive, got {value}")]
    NonPositiveWeight { resource: ResourceName, value: i64 },

    #[error("resourceWeights[{resource}] must be at most 100, got {value}")]
    WeightTooLarge { resource: ResourceName, value: i64 },

    #[error("resourceWeights must not be empty")]
    NoResourceWeights,
}

/// Policy loaded once by configuration and shared by every evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadAwareArgs {
    /// Reject nodes whose snapshot is expired
    pub filter_expired_node_metrics: bool,
    /// Snapshot age limit; zero or negative disables the check
    pub node_metric_expiration_seconds: i64,
    /// Let expired nodes through the filter instead of rejecting them
    pub enable_schedule_when_node_metrics_expired: bool,
    pub resource_weights: BTreeMap<ResourceName, i64>,
    pub usage_thresholds: UsageThresholds,
    /// Applied to production pods only, against production pod usage
    pub prod_usage_thresholds: UsageThresholds,
    /// Score production pods by production pod usage instead of node usage
    pub score_according_prod_usage: bool,
    /// Percentage of requests counted as estimated usage
    pub estimated_scaling_factors: BTreeMap<ResourceName, i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregated: Option<AggregatedArgs>,
}

/// Aggregated-usage sub-policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AggregatedArgs {
    pub usage_thresholds: UsageThresholds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_aggregation_type: Option<AggregationType>,
    #[serde(with = "serde_go_option", skip_serializing_if = "Option::is_none")]
    pub usage_aggregated_duration: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_aggregation_type: Option<AggregationType>,
    #[serde(with = "serde_go_option", skip_serializing_if = "Option::is_none")]
    pub score_aggregated_duration: Option<Duration>,
}

impl Default for LoadAwareArgs {
    fn default() -> Self {
        Self {
            filter_expired_node_metrics: true,
            node_metric_expiration_seconds: DEFAULT_NODE_METRIC_EXPIRATION_SECONDS,
            enable_schedule_when_node_metrics_expired: false,
            resource_weights: BTreeMap::from([(ResourceName::Cpu, 1), (ResourceName::Memory, 1)]),
            usage_thresholds: BTreeMap::from([(ResourceName::Cpu, 65), (ResourceName::Memory, 95)]),
            prod_usage_thresholds: BTreeMap::new(),
            score_according_prod_usage: false,
            estimated_scaling_factors: BTreeMap::from([
                (ResourceName::Cpu, 85),
                (ResourceName::Memory, 70),
            ]),
            aggregated: None,
        }
    }
}

impl LoadAwareArgs {
    pub fn validate(&self) -> Result<(), ArgsError> {
        if self.resource_weights.is_empty() {
            return Err(ArgsError::NoResourceWeights);
        }
        if let Some((&resource, &value)) = self.resource_weights.iter().find(|(_, w)| **w <= 0) {
            return Err(ArgsError::NonPositiveWeight { resource, value });
        }
        if let Some((&resource, &value)) = self
            .resource_weights
            .iter()
            .find(|(_, w)| **w > MAX_RESOURCE_WEIGHT)
        {
            return Err(ArgsError::WeightTooLarge { resource, value });
        }

        check_percentages("usageThresholds", &self.usage_thresholds)?;
        check_percentages("prodUsageThresholds", &self.prod_usage_thresholds)?;
        check_percentages("estimatedScalingFactors", &self.estimated_scaling_factors)?;
        if let Some(aggregated) = &self.aggregated {
            check_percentages("aggregated.usageThresholds", &aggregated.usage_thresholds)?;
        }
        Ok(())
    }

    /// The aggregated sub-policy, when it is usable for filtering
    pub fn filter_aggregation(&self) -> Option<&AggregatedArgs> {
        self.aggregated
            .as_ref()
            .filter(|args| filter_with_aggregation(Some(args)))
    }
}

fn check_percentages(
    field: &'static str,
    values: &BTreeMap<ResourceName, i64>,
) -> Result<(), ArgsError> {
    match values.iter().find(|(_, v)| !(0..=100).contains(*v)) {
        Some((&resource, &value)) => Err(ArgsError::PercentOutOfRange {
            field,
            resource,
            value,
        }),
        None => Ok(()),
    }
}

/// Aggregated filtering needs thresholds and an aggregation type
pub fn filter_with_aggregation(args: Option<&AggregatedArgs>) -> bool {
    args.is_some_and(|a| !a.usage_thresholds.is_empty() && a.usage_aggregation_type.is_some())
}

/// Aggregated scoring needs a score aggregation type
pub fn score_with_aggregation(args: Option<&AggregatedArgs>) -> bool {
    args.is_some_and(|a| a.score_aggregation_type.is_some())
}
