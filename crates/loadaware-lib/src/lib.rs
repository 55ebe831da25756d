//! Load-aware scheduling library
//!
//! This crate provides the evaluation core used by the scheduler extender:
//! - Resource quantity normalization
//! - Snapshot freshness and report timing
//! - Aggregated usage selection and threshold resolution
//! - Per-pod usage aggregation and estimation
//! - Filter and score plugins
//! - Metrics and structured logging for callers

pub mod aggregation;
pub mod args;
pub mod daemon;
pub mod duration;
pub mod estimator;
pub mod freshness;
pub mod models;
pub mod observability;
pub mod plugin;
pub mod resource;
pub mod temporal;
pub mod thresholds;
pub mod workload;

pub use aggregation::{AggregationType, DefaultWindowPolicy, LargestNonEmptyWindow};
pub use args::{ArgsError, LoadAwareArgs};
pub use estimator::{DefaultEstimator, Estimator};
pub use models::*;
pub use observability::{LoadAwareMetrics, StructuredLogger};
pub use plugin::{FilterStatus, LoadAware, NodeScore};
pub use resource::{Quantity, QuantityError, ResourceList, ResourceName};
pub use temporal::ReportState;
