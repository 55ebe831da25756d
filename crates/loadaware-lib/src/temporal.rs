//! Timing of a pod assignment relative to the node's last report

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Whether a node report can already contain an assigned pod's usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    /// Assigned after the last report was produced
    NotYetReported,
    /// Assigned less than one report interval before the last report
    WithinGracePeriod,
    /// At least one full report interval has passed since assignment, or
    /// the assignment coincides with the report instant
    Reported,
}

impl ReportState {
    pub fn classify(
        assigned_time: DateTime<Utc>,
        update_time: DateTime<Utc>,
        report_interval: Duration,
    ) -> Self {
        if assigned_time > update_time {
            ReportState::NotYetReported
        } else if assigned_time < update_time
            && update_time.signed_duration_since(assigned_time) < report_interval
        {
            ReportState::WithinGracePeriod
        } else {
            ReportState::Reported
        }
    }

    /// Usage for the pod must be estimated rather than read from the report
    pub fn needs_estimation(&self) -> bool {
        !matches!(self, ReportState::Reported)
    }
}
