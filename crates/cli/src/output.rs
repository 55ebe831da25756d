//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use loadaware_lib::{ResourceList, ResourceName};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: i64) -> String {
    const KI: f64 = 1024.0;
    const MI: f64 = KI * 1024.0;
    const GI: f64 = MI * 1024.0;

    let value = bytes as f64;
    if value.abs() >= GI {
        format!("{:.2}Gi", value / GI)
    } else if value.abs() >= MI {
        format!("{:.2}Mi", value / MI)
    } else if value.abs() >= KI {
        format!("{:.2}Ki", value / KI)
    } else {
        format!("{}", bytes)
    }
}

/// Format millicores as human-readable string
pub fn format_cpu(millicores: i64) -> String {
    if millicores >= 1000 && millicores % 1000 == 0 {
        format!("{}", millicores / 1000)
    } else if millicores >= 1000 {
        format!("{:.2}", millicores as f64 / 1000.0)
    } else {
        format!("{}m", millicores)
    }
}

/// Format one normalized resource value in its usual unit
pub fn format_resource(resource: ResourceName, value: i64) -> String {
    match resource {
        ResourceName::Cpu => format_cpu(value),
        ResourceName::Memory | ResourceName::EphemeralStorage => format_bytes(value),
        _ => value.to_string(),
    }
}

/// `cpu=1.50, memory=2.00Gi`, or `-` when empty
pub fn format_resources(list: &ResourceList) -> String {
    if list.is_empty() {
        return "-".to_string();
    }
    list.iter()
        .map(|(resource, value)| format!("{}={}", resource, format_resource(resource, value)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `used / allocatable (percent)` for one resource
pub fn format_utilization(resource: ResourceName, used: i64, allocatable: i64) -> String {
    let percent = if allocatable > 0 {
        format!("{:.0}%", used as f64 / allocatable as f64 * 100.0)
    } else {
        "-".to_string()
    };
    format!(
        "{} / {} ({})",
        format_resource(resource, used),
        format_resource(resource, allocatable),
        percent
    )
}

/// Color a filter result
pub fn color_result(passed: bool) -> String {
    if passed {
        "pass".green().to_string()
    } else {
        "reject".red().to_string()
    }
}

/// Color a node score
pub fn color_score(score: i64) -> String {
    let formatted = score.to_string();
    if score >= 60 {
        formatted.green().to_string()
    } else if score >= 30 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
