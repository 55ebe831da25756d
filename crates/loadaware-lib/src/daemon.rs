//! Daemon-style workload detection

use crate::models::OwnerReference;

const DAEMON_SET_KIND: &str = "DaemonSet";

/// True if any owner is a DaemonSet, i.e. the pod runs on every node by design
pub fn is_daemon_set_pod(owner_references: &[OwnerReference]) -> bool {
    owner_references
        .iter()
        .any(|owner| owner.kind == DAEMON_SET_KIND)
}
