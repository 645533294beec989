use relsync_types::{DataLinkRebuildReport, DataLinkStrategy, SkipReason};
use serde::{Deserialize, Serialize};

/// Data-link relation rebuild events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DataLinkEvent {
    /// Batch rebuild started
    RebuildStarted {
        bk_tenant_id: String,
        namespace: String,
        total: usize,
        dry_run: bool,
    },

    /// A data-bus was linked and all its components stamped
    Linked {
        databus: String,
        data_link_name: String,
        strategy: DataLinkStrategy,
        table_ids: Vec<String>,
        created: bool,
    },

    /// Dry run resolved a data-bus without writing
    Planned {
        databus: String,
        data_link_name: String,
        strategy: DataLinkStrategy,
    },

    /// A data-bus was left unlinked
    Skipped {
        databus: String,
        reason: SkipReason,
        detail: String,
    },

    /// Batch rebuild finished
    RebuildCompleted { report: DataLinkRebuildReport },
}
