//! Data-link component kinds and strategies

use relsync_errors::ReconcileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of every data link created by the relation rebuilder
pub const REBUILT_DATA_LINK_NAME_PREFIX: &str = "rebuilt__";

/// Name of the data link rebuilt for a data-bus
#[must_use]
pub fn rebuilt_data_link_name(bk_tenant_id: &str, namespace: &str, databus_name: &str) -> String {
    format!("{REBUILT_DATA_LINK_NAME_PREFIX}{bk_tenant_id}__{namespace}__{databus_name}")
}

/// Split a `kind:name` sink entry at the first colon
///
/// # Errors
///
/// Returns `ReconcileError::InvalidSinkRef` when the entry has no colon.
pub fn parse_sink_entry(entry: &str) -> Result<(&str, &str), ReconcileError> {
    entry
        .split_once(':')
        .ok_or_else(|| ReconcileError::InvalidSinkRef {
            entry: entry.to_string(),
        })
}

/// Kinds of components a data-bus can sink into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SinkKind {
    #[serde(rename = "VmStorageBinding")]
    VmStorageBinding,
    #[serde(rename = "ElasticSearchBinding")]
    EsStorageBinding,
    #[serde(rename = "DorisBinding")]
    DorisBinding,
    #[serde(rename = "ConditionalSink")]
    ConditionalSink,
}

impl SinkKind {
    pub const ALL: [SinkKind; 4] = [
        Self::VmStorageBinding,
        Self::EsStorageBinding,
        Self::DorisBinding,
        Self::ConditionalSink,
    ];

    /// Kind name as written in a data-bus sink list
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VmStorageBinding => "VmStorageBinding",
            Self::EsStorageBinding => "ElasticSearchBinding",
            Self::DorisBinding => "DorisBinding",
            Self::ConditionalSink => "ConditionalSink",
        }
    }

    /// Storage bindings point at a result table; conditional sinks do not
    #[must_use]
    pub fn references_result_table(self) -> bool {
        !matches!(self, Self::ConditionalSink)
    }
}

impl FromStr for SinkKind {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ReconcileError::UnknownSinkKind {
                kind: s.to_string(),
            })
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a data link's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataLinkStrategy {
    BkStandardV2TimeSeries,
    BkExporterTimeSeries,
    BkStandardTimeSeries,
    BkStandardV2Event,
    BasereportTimeSeriesV1,
    SystemProcPerf,
    SystemProcPort,
    BaseEventV1,
    BkLog,
}

impl DataLinkStrategy {
    const ALL: [DataLinkStrategy; 9] = [
        Self::BkStandardV2TimeSeries,
        Self::BkExporterTimeSeries,
        Self::BkStandardTimeSeries,
        Self::BkStandardV2Event,
        Self::BasereportTimeSeriesV1,
        Self::SystemProcPerf,
        Self::SystemProcPort,
        Self::BaseEventV1,
        Self::BkLog,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BkStandardV2TimeSeries => "bk_standard_v2_time_series",
            Self::BkExporterTimeSeries => "bk_exporter_time_series",
            Self::BkStandardTimeSeries => "bk_standard_time_series",
            Self::BkStandardV2Event => "bk_standard_v2_event",
            Self::BasereportTimeSeriesV1 => "basereport_time_series_v1",
            Self::SystemProcPerf => "system_proc_perf",
            Self::SystemProcPort => "system_proc_port",
            Self::BaseEventV1 => "base_event_v1",
            Self::BkLog => "bk_log",
        }
    }

    /// Map a data source's ETL config label to a strategy
    #[must_use]
    pub fn from_etl_config(etl_config: &str) -> Option<Self> {
        let strategy = match etl_config {
            "bk_standard_v2_time_series" => Self::BkStandardV2TimeSeries,
            "bk_exporter" => Self::BkExporterTimeSeries,
            "bk_standard" => Self::BkStandardTimeSeries,
            "bk_standard_v2_event" => Self::BkStandardV2Event,
            "bk_system_basereport" | "bk_multi_tenancy_basereport" => {
                Self::BasereportTimeSeriesV1
            }
            "bk_multi_tenancy_system_proc_perf" => Self::SystemProcPerf,
            "bk_multi_tenancy_system_proc_port" => Self::SystemProcPort,
            "bk_multi_tenancy_agent_event" => Self::BaseEventV1,
            _ => return None,
        };
        Some(strategy)
    }
}

impl FromStr for DataLinkStrategy {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| ReconcileError::UnknownStrategy {
                strategy: s.to_string(),
            })
    }
}

impl fmt::Display for DataLinkStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
