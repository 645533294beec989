#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for relsync
//!
//! This crate provides the domain vocabulary shared by the store, the
//! reconcilers and the CLI: space identifiers, cluster relation keys,
//! data-link sink kinds and strategies, and the reports both reconcilers
//! produce.

pub mod datalink;
pub mod relation;
pub mod reports;

pub use datalink::{
    parse_sink_entry, rebuilt_data_link_name, DataLinkStrategy, SinkKind,
    REBUILT_DATA_LINK_NAME_PREFIX,
};
pub use relation::{space_uid, ClusterRelationKey, SpaceType, SPACE_UID_HYPHEN};
pub use reports::{
    ClusterReconcileReport, DataLinkRebuildReport, RebuildPlan, ResultTableSummary, SinkSummary,
    SkipReason,
};

use serde::{Deserialize, Serialize};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Plain
    }
}
