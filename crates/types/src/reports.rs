//! Report type definitions for reconciliation runs

use crate::{DataLinkStrategy, SinkKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of one cluster relation reconciliation pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterReconcileReport {
    /// Number of distinct relation keys derived from space data
    pub desired: usize,
    /// Rows inserted
    pub added: usize,
    /// Rows whose check time was refreshed
    pub refreshed: usize,
    /// Rows removed
    pub deleted: usize,
    /// Container space lookups that failed and were skipped
    pub lookup_failures: usize,
    /// Total execution time
    pub duration_ms: u64,
}

/// Why a data-bus was left unlinked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MalformedSinkEntry,
    UnknownSinkKind,
    MissingComponent,
    ComponentConflict,
    EmptyResultTableRef,
    MissingResultTable,
    ResultTableConflict,
    MissingDataSource,
    UnmappedEtlConfig,
}

impl SkipReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedSinkEntry => "malformed_sink_entry",
            Self::UnknownSinkKind => "unknown_sink_kind",
            Self::MissingComponent => "missing_component",
            Self::ComponentConflict => "component_conflict",
            Self::EmptyResultTableRef => "empty_result_table_ref",
            Self::MissingResultTable => "missing_result_table",
            Self::ResultTableConflict => "result_table_conflict",
            Self::MissingDataSource => "missing_data_source",
            Self::UnmappedEtlConfig => "unmapped_etl_config",
        }
    }

    /// Ownership conflicts point at pre-existing bad data and are logged as errors
    #[must_use]
    pub fn is_conflict(self) -> bool {
        matches!(self, Self::ComponentConflict | Self::ResultTableConflict)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink component listed in a rebuild plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSummary {
    pub kind: SinkKind,
    pub name: String,
}

/// Result table listed in a rebuild plan
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTableSummary {
    pub name: String,
    pub table_id: String,
}

/// What a rebuild would write, returned instead of writing in dry-run mode
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildPlan {
    pub data_link_name: String,
    pub strategy: DataLinkStrategy,
    pub bk_data_id: i64,
    pub table_ids: Vec<String>,
    pub sinks: Vec<SinkSummary>,
    pub result_tables: Vec<ResultTableSummary>,
}

/// Outcome of a batch data-link relation rebuild
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLinkRebuildReport {
    pub bk_tenant_id: String,
    pub namespace: String,
    pub dry_run: bool,
    /// Data-buses with an empty link name at the start of the run
    pub total: usize,
    pub success: usize,
    pub skipped: usize,
    /// Skip counts keyed by reason
    pub skip_reasons: BTreeMap<SkipReason, usize>,
    /// Plans of every rebuildable data-bus, filled only in dry-run mode
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<RebuildPlan>,
    pub duration_ms: u64,
}

impl DataLinkRebuildReport {
    #[must_use]
    pub fn new(
        bk_tenant_id: impl Into<String>,
        namespace: impl Into<String>,
        dry_run: bool,
    ) -> Self {
        Self {
            bk_tenant_id: bk_tenant_id.into(),
            namespace: namespace.into(),
            dry_run,
            ..Self::default()
        }
    }

    /// Count a skipped data-bus
    pub fn record_skip(&mut self, reason: SkipReason) {
        self.skipped += 1;
        *self.skip_reasons.entry(reason).or_insert(0) += 1;
    }
}
