use serde::{Deserialize, Serialize};

use crate::EventSource;

pub mod cluster;
pub mod datalink;
pub mod general;

pub use cluster::*;
pub use datalink::*;
pub use general::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Command lifecycle and warnings
    General(GeneralEvent),

    /// Cluster relation reconciliation
    Cluster(ClusterEvent),

    /// Data-link relation rebuild
    DataLink(DataLinkEvent),
}

impl AppEvent {
    /// Identify the source domain for this event (used for metadata/logging).
    #[must_use]
    pub fn event_source(&self) -> EventSource {
        match self {
            Self::General(_) => EventSource::General,
            Self::Cluster(_) => EventSource::Cluster,
            Self::DataLink(_) => EventSource::DataLink,
        }
    }

    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::OperationFailed { .. }) => Level::ERROR,
            Self::DataLink(DataLinkEvent::Skipped { reason, .. }) if reason.is_conflict() => {
                Level::ERROR
            }

            Self::General(GeneralEvent::Warning { .. })
            | Self::DataLink(DataLinkEvent::Skipped { .. })
            | Self::Cluster(ClusterEvent::SpaceLookupFailed { .. }) => Level::WARN,

            Self::DataLink(DataLinkEvent::Planned { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }
}
