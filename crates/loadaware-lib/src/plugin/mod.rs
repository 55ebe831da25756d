//! Load-aware filter and score
//!
//! This module ties the evaluation pieces together the way a scheduler
//! extension calls them for one (pod, node) pair:
//! - Filter rejects nodes whose recent usage already crosses a threshold
//! - Score prefers nodes with the most spare capacity once assigned but
//!   unreported pods are accounted for

mod estimation;
mod filter;
mod score;

pub use estimation::estimated_assigned_pod_used;
pub use filter::{
    FilterStatus, ERR_REASON_AGGREGATED_USAGE_EXCEED_THRESHOLD, ERR_REASON_NODE_METRIC_EXPIRED,
    ERR_REASON_PROD_USAGE_EXCEED_THRESHOLD, ERR_REASON_USAGE_EXCEED_THRESHOLD,
};
pub use score::{least_used_score, load_aware_scheduling_scorer, NodeScore, MAX_NODE_SCORE};

use crate::args::LoadAwareArgs;
use crate::estimator::{DefaultEstimator, Estimator};
use std::sync::Arc;

/// Filter and score evaluation under one global policy
///
/// Holds no per-node state; a single instance can evaluate any number of
/// nodes from any number of threads.
#[derive(Clone)]
pub struct LoadAware {
    args: LoadAwareArgs,
    estimator: Arc<dyn Estimator>,
}

impl LoadAware {
    pub fn new(args: LoadAwareArgs) -> Self {
        let estimator = Arc::new(DefaultEstimator::new(&args));
        Self { args, estimator }
    }

    /// Use a custom estimator
    pub fn with_estimator(args: LoadAwareArgs, estimator: Arc<dyn Estimator>) -> Self {
        Self { args, estimator }
    }

    pub fn args(&self) -> &LoadAwareArgs {
        &self.args
    }

    pub fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }
}

impl std::fmt::Debug for LoadAware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadAware")
            .field("args", &self.args)
            .field("estimator", &self.estimator.name())
            .finish()
    }
}
