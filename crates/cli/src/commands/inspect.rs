//! Threshold and usage inspection commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::Colorize;
use loadaware_lib::aggregation::target_aggregated_usage;
use loadaware_lib::args::UsageThresholds;
use loadaware_lib::duration::{format_duration, parse_duration};
use loadaware_lib::freshness::{is_node_metric_expired, node_metric_report_interval};
use loadaware_lib::thresholds::{custom_usage_thresholds, resolve_profile, UsageThresholdsProfile};
use loadaware_lib::workload::{build_pod_metric_map, sum_pod_usages, EstimationSet};
use loadaware_lib::{AggregationType, LoadAwareArgs, Node, NodeMetric, ResourceList};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::read_json;
use crate::output::{format_resources, print_json, print_table, print_warning, OutputFormat};

/// Row for the thresholds table
#[derive(Tabled)]
struct ThresholdRow {
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Thresholds (%)")]
    thresholds: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThresholdsReport {
    node: String,
    override_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    override_error: Option<String>,
    profile: UsageThresholdsProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    update_time: Option<DateTime<Utc>>,
    expired: bool,
    report_interval_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    aggregation: Option<AggregationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selected_usage: Option<ResourceList>,
    prod_usage: ResourceList,
    pods_reported: usize,
}

/// Show the thresholds resolved for a node
pub fn show_thresholds(args: &LoadAwareArgs, node: &Path, format: OutputFormat) -> Result<()> {
    let node: Node = read_json(node)?;
    let (custom, override_error) = match custom_usage_thresholds(&node) {
        Ok(custom) => (custom, None),
        Err(err) => (None, Some(err.to_string())),
    };

    let report = ThresholdsReport {
        node: node.name.clone(),
        override_applied: custom.is_some(),
        override_error,
        profile: resolve_profile(custom, args),
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            println!("Node: {}", report.node.cyan());
            if let Some(err) = &report.override_error {
                print_warning(&format!("override ignored: {}", err));
            } else if report.override_applied {
                println!("Override: {}", "applied".green());
            }

            let profile = &report.profile;
            let mut rows = vec![
                ThresholdRow {
                    scope: "usage".to_string(),
                    thresholds: format_thresholds(&profile.usage_thresholds),
                },
                ThresholdRow {
                    scope: "prod usage".to_string(),
                    thresholds: format_thresholds(&profile.prod_usage_thresholds),
                },
            ];
            if let Some(aggregated) = &profile.aggregated_usage {
                let window = aggregated
                    .usage_aggregated_duration
                    .map(|d| format_duration(&d))
                    .unwrap_or_else(|| "widest".to_string());
                rows.push(ThresholdRow {
                    scope: format!("{} over {}", aggregated.usage_aggregation_type, window),
                    thresholds: format_thresholds(&aggregated.usage_thresholds),
                });
            }
            print_table(rows);
        }
    }

    Ok(())
}

/// Show freshness of a node metric and the usage sample it yields
pub fn show_usage(
    args: &LoadAwareArgs,
    metric: &Path,
    aggregation: Option<AggregationType>,
    duration: Option<&str>,
    now: DateTime<Utc>,
    format: OutputFormat,
) -> Result<()> {
    let node_metric: NodeMetric = read_json(metric)?;
    let duration = duration
        .map(parse_duration)
        .transpose()
        .context("invalid --duration")?;

    let selected_usage = match aggregation {
        Some(aggregation_type) => target_aggregated_usage(&node_metric, duration, aggregation_type),
        None => node_metric.status.node_metric.as_ref().map(|info| &info.node_usage),
    };
    let prod_pods = build_pod_metric_map(&node_metric, true);

    let report = UsageReport {
        update_time: node_metric.status.update_time,
        expired: is_node_metric_expired(
            Some(&node_metric),
            args.node_metric_expiration_seconds,
            now,
        ),
        report_interval_seconds: node_metric_report_interval(&node_metric).num_seconds(),
        aggregation,
        selected_usage: selected_usage.cloned(),
        prod_usage: sum_pod_usages(&prod_pods, &EstimationSet::new()).observed,
        pods_reported: node_metric.status.pods_metric.len(),
    };

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            let update_time = report
                .update_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string());
            println!("Updated:         {}", update_time);
            if report.expired {
                println!("Freshness:       {}", "expired".red());
            } else {
                println!("Freshness:       {}", "fresh".green());
            }
            println!("Report interval: {}s", report.report_interval_seconds);
            println!("Pods reported:   {}", report.pods_reported);
            println!("Prod usage:      {}", format_resources(&report.prod_usage));

            let label = report
                .aggregation
                .map(|a| a.to_string())
                .unwrap_or_else(|| "current".to_string());
            match &report.selected_usage {
                Some(usage) => println!("Usage ({}): {}", label, format_resources(usage)),
                None => print_warning(&format!("no {} usage sample available", label)),
            }
        }
    }

    Ok(())
}

fn format_thresholds(thresholds: &UsageThresholds) -> String {
    if thresholds.is_empty() {
        return "-".to_string();
    }
    thresholds
        .iter()
        .map(|(resource, percent)| format!("{}={}", resource, percent))
        .collect::<Vec<_>>()
        .join(", ")
}
