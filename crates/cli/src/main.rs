//! Load-aware scheduling CLI
//!
//! Evaluates recorded scheduling requests, node overrides and usage
//! snapshots against a load-aware policy, without a running cluster.

mod commands;
mod output;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use commands::{evaluate, inspect};
use loadaware_lib::AggregationType;
use std::path::PathBuf;

/// Load-aware scheduling CLI
#[derive(Parser)]
#[command(name = "lactl")]
#[command(author, version, about = "CLI for load-aware scheduling evaluation", long_about = None)]
pub struct Cli {
    /// Policy file (JSON); built-in defaults apply when omitted
    #[arg(long, global = true, env = "LOADAWARE_ARGS_FILE")]
    pub args: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Evaluation time (RFC 3339); defaults to now
    #[arg(long, global = true)]
    pub now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Filter the candidate nodes of a scheduling request
    Filter {
        /// Scheduling request file (JSON)
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Score the candidate nodes of a scheduling request
    Score {
        /// Scheduling request file (JSON)
        #[arg(long, short)]
        input: PathBuf,
    },

    /// Show the usage thresholds that apply to a node
    Thresholds {
        /// Node file (JSON)
        #[arg(long)]
        node: PathBuf,
    },

    /// Show freshness and the usage sample selected from a node metric
    Usage {
        /// Node metric file (JSON)
        #[arg(long)]
        metric: PathBuf,

        /// Aggregation type (avg, p50, p90, p95, p99); current usage when omitted
        #[arg(long)]
        aggregation: Option<AggregationType>,

        /// Aggregation window (e.g. 5m, 1h); the widest filled window when omitted
        #[arg(long)]
        duration: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = commands::load_args(cli.args.as_deref())?;
    let now = cli.now.unwrap_or_else(Utc::now);

    match cli.command {
        Commands::Filter { input } => {
            evaluate::filter_nodes(&args, &input, now, cli.format)?;
        }
        Commands::Score { input } => {
            evaluate::score_nodes(&args, &input, now, cli.format)?;
        }
        Commands::Thresholds { node } => {
            inspect::show_thresholds(&args, &node, cli.format)?;
        }
        Commands::Usage {
            metric,
            aggregation,
            duration,
        } => {
            inspect::show_usage(&args, &metric, aggregation, duration.as_deref(), now, cli.format)?;
        }
    }

    Ok(())
}
