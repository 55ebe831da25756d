//! Filter and score commands

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use loadaware_lib::{LoadAware, LoadAwareArgs, NodeScore, ResourceName, SchedulingRequest};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use super::read_json;
use crate::output::{
    color_result, color_score, format_utilization, print_info, print_json, print_table,
    OutputFormat,
};

/// Filter outcome for one node
#[derive(Debug, Serialize)]
struct FilterOutcome {
    node: String,
    feasible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Row for the filter table
#[derive(Tabled)]
struct FilterRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Result")]
    result: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Row for the score table
#[derive(Tabled)]
struct ScoreRow {
    #[tabled(rename = "Node")]
    node: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "CPU")]
    cpu: String,
    #[tabled(rename = "Memory")]
    memory: String,
}

/// Run the filter over every candidate node of a recorded request
pub fn filter_nodes(
    args: &LoadAwareArgs,
    input: &Path,
    now: DateTime<Utc>,
    format: OutputFormat,
) -> Result<()> {
    let request: SchedulingRequest = read_json(input)?;
    let plugin = LoadAware::new(args.clone());

    let outcomes: Vec<FilterOutcome> = request
        .nodes
        .iter()
        .map(|node_state| {
            let status = plugin.filter(&request.pod, node_state, now);
            FilterOutcome {
                node: node_state.node.name.clone(),
                feasible: status.is_success(),
                reason: status.reason().map(str::to_string),
            }
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&outcomes)?,
        OutputFormat::Table => {
            println!("Pod: {}", request.pod.namespaced_name().to_string().cyan());
            let passed = outcomes.iter().filter(|o| o.feasible).count();
            let rows = outcomes
                .into_iter()
                .map(|outcome| FilterRow {
                    node: outcome.node,
                    result: color_result(outcome.feasible),
                    reason: outcome.reason.unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_table(rows);
            print_info(&format!("{} of {} nodes feasible", passed, request.nodes.len()));
        }
    }

    Ok(())
}

/// Score every candidate node of a recorded request, best first
pub fn score_nodes(
    args: &LoadAwareArgs,
    input: &Path,
    now: DateTime<Utc>,
    format: OutputFormat,
) -> Result<()> {
    let request: SchedulingRequest = read_json(input)?;
    let plugin = LoadAware::new(args.clone());

    let mut scores: Vec<NodeScore> = request
        .nodes
        .iter()
        .map(|node_state| plugin.score(&request.pod, node_state, now))
        .collect();
    scores.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.node.cmp(&b.node)));

    match format {
        OutputFormat::Json => print_json(&scores)?,
        OutputFormat::Table => {
            println!("Pod: {}", request.pod.namespaced_name().to_string().cyan());
            let rows = scores
                .iter()
                .map(|score| ScoreRow {
                    node: score.node.clone(),
                    score: color_score(score.score),
                    cpu: utilization(score, ResourceName::Cpu),
                    memory: utilization(score, ResourceName::Memory),
                })
                .collect();
            print_table(rows);
        }
    }

    Ok(())
}

fn utilization(score: &NodeScore, resource: ResourceName) -> String {
    format_utilization(
        resource,
        score.used.value(resource),
        score.allocatable.value(resource),
    )
}
