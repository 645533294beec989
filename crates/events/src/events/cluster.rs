use relsync_types::ClusterReconcileReport;
use serde::{Deserialize, Serialize};

/// Cluster relation reconciliation events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClusterEvent {
    /// Space data loaded, diff about to be computed
    ReconcileStarted {
        projects: usize,
        overrides: usize,
    },

    /// Container space lookup failed; the second relation is skipped
    SpaceLookupFailed {
        project_code: String,
        space_uid: String,
        not_found: bool,
        error: String,
    },

    /// Relation table converged
    ReconcileCompleted { report: ClusterReconcileReport },
}
