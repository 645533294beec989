//! Data-link relation rebuild
//!
//! A data-bus synced without its link carries enough references to find the
//! rest: its `kind:name` sink list, each storage binding's result table name
//! and its data source's ETL config. The rebuilder follows them, refuses to
//! take over anything another link already owns, and claims the whole set
//! for a `rebuilt__` data link in one transaction.

use relsync_errors::Error;
use relsync_events::{AppEvent, DataLinkEvent, EventEmitter, EventSender};
use relsync_state::{
    DataBusConfig, DataLink, DataLinkCommit, MetadataStore, ResultTableConfig, SinkComponent,
};
use relsync_types::{
    parse_sink_entry, rebuilt_data_link_name, DataLinkRebuildReport, DataLinkStrategy,
    RebuildPlan, ResultTableSummary, SinkKind, SinkSummary, SkipReason,
};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Result of rebuilding one data-bus
#[derive(Debug, Clone)]
pub enum RebuildOutcome {
    /// The link was upserted and every component stamped
    Linked(DataLink),
    /// Dry run: what would have been written
    Planned(RebuildPlan),
    /// The data-bus was left untouched
    Skipped(SkipReason),
}

/// Why resolution stopped, with the offending names for the log
struct Skip {
    reason: SkipReason,
    detail: String,
}

impl Skip {
    fn new(reason: SkipReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Everything a data-bus resolves to before any write
struct Resolution {
    data_link_name: String,
    strategy: DataLinkStrategy,
    sinks: Vec<SinkComponent>,
    result_tables: Vec<ResultTableConfig>,
    table_ids: Vec<String>,
}

impl Resolution {
    fn plan(&self, databus: &DataBusConfig) -> RebuildPlan {
        RebuildPlan {
            data_link_name: self.data_link_name.clone(),
            strategy: self.strategy,
            bk_data_id: databus.bk_data_id,
            table_ids: self.table_ids.clone(),
            sinks: self
                .sinks
                .iter()
                .map(|sink| SinkSummary {
                    kind: sink.kind,
                    name: sink.name.clone(),
                })
                .collect(),
            result_tables: self
                .result_tables
                .iter()
                .map(|table| ResultTableSummary {
                    name: table.name.clone(),
                    table_id: table.table_id.clone(),
                })
                .collect(),
        }
    }

    fn commit(&self, databus: &DataBusConfig) -> DataLinkCommit {
        let mut sink_ids: BTreeMap<SinkKind, Vec<i64>> = BTreeMap::new();
        for sink in &self.sinks {
            sink_ids.entry(sink.kind).or_default().push(sink.id);
        }
        DataLinkCommit {
            bk_tenant_id: databus.bk_tenant_id.clone(),
            namespace: databus.namespace.clone(),
            data_link_name: self.data_link_name.clone(),
            strategy: self.strategy,
            bk_data_id: databus.bk_data_id,
            table_ids: self.table_ids.clone(),
            databus_id: databus.id,
            sink_ids,
            result_table_ids: self.result_tables.iter().map(|table| table.id).collect(),
        }
    }
}

/// Rebuilds the data link of data-buses whose link name is empty
pub struct DataLinkRelationRebuilder {
    store: MetadataStore,
    tx: Option<EventSender>,
}

impl EventEmitter for DataLinkRelationRebuilder {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl DataLinkRelationRebuilder {
    #[must_use]
    pub fn new(store: MetadataStore) -> Self {
        Self { store, tx: None }
    }

    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Rebuild every unlinked data-bus of a tenant namespace
    ///
    /// Each data-bus is handled on its own; a skipped one never affects the
    /// others. In dry-run mode the report carries the plan of every data-bus
    /// that would have been linked.
    ///
    /// # Errors
    ///
    /// Returns the first store failure; data-buses already linked stay linked.
    pub async fn rebuild_bkbase_v4_datalink_relation(
        &self,
        bk_tenant_id: &str,
        namespace: &str,
        dry_run: bool,
    ) -> Result<DataLinkRebuildReport, Error> {
        let started = Instant::now();
        let databuses = self.store.unlinked_databuses(bk_tenant_id, namespace).await?;

        let mut report = DataLinkRebuildReport::new(bk_tenant_id, namespace, dry_run);
        report.total = databuses.len();
        self.emit(AppEvent::DataLink(DataLinkEvent::RebuildStarted {
            bk_tenant_id: bk_tenant_id.to_string(),
            namespace: namespace.to_string(),
            total: report.total,
            dry_run,
        }));

        for databus in &databuses {
            match self.rebuild_databus_relation(databus, dry_run).await? {
                RebuildOutcome::Linked(_) => report.success += 1,
                RebuildOutcome::Planned(plan) => {
                    report.success += 1;
                    report.plans.push(plan);
                }
                RebuildOutcome::Skipped(reason) => report.record_skip(reason),
            }
        }

        report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.emit(AppEvent::DataLink(DataLinkEvent::RebuildCompleted {
            report: report.clone(),
        }));

        Ok(report)
    }

    /// Rebuild the data link of one data-bus
    ///
    /// Bad references, missing components, ownership conflicts and unmapped
    /// strategies leave the data-bus untouched and come back as
    /// [`RebuildOutcome::Skipped`].
    ///
    /// # Errors
    ///
    /// Returns an error only for store failures. A failure while writing rolls
    /// back the link and every stamp.
    pub async fn rebuild_databus_relation(
        &self,
        databus: &DataBusConfig,
        dry_run: bool,
    ) -> Result<RebuildOutcome, Error> {
        let resolution = match self.resolve(databus).await? {
            Ok(resolution) => resolution,
            Err(skip) => {
                self.report_skip(databus, &skip);
                return Ok(RebuildOutcome::Skipped(skip.reason));
            }
        };

        if dry_run {
            self.emit(AppEvent::DataLink(DataLinkEvent::Planned {
                databus: databus.name.clone(),
                data_link_name: resolution.data_link_name.clone(),
                strategy: resolution.strategy,
            }));
            return Ok(RebuildOutcome::Planned(resolution.plan(databus)));
        }

        let (link, created) = self.store.commit_data_link(&resolution.commit(databus)).await?;

        self.emit(AppEvent::DataLink(DataLinkEvent::Linked {
            databus: databus.name.clone(),
            data_link_name: link.data_link_name.clone(),
            strategy: resolution.strategy,
            table_ids: resolution.table_ids,
            created,
        }));

        Ok(RebuildOutcome::Linked(link))
    }

    /// Skips are reported once, as an event; conflicts carry ERROR level
    fn report_skip(&self, databus: &DataBusConfig, skip: &Skip) {
        self.emit(AppEvent::DataLink(DataLinkEvent::Skipped {
            databus: databus.name.clone(),
            reason: skip.reason,
            detail: skip.detail.clone(),
        }));
    }

    /// Follow the data-bus references without writing anything
    async fn resolve(&self, databus: &DataBusConfig) -> Result<Result<Resolution, Skip>, Error> {
        let tenant = databus.bk_tenant_id.as_str();
        let namespace = databus.namespace.as_str();

        let sink_groups = match group_sink_entries(databus) {
            Ok(groups) => groups,
            Err(skip) => return Ok(Err(skip)),
        };

        let mut sinks = Vec::new();
        for (kind, names) in &sink_groups {
            let by_name: HashMap<String, SinkComponent> = self
                .store
                .sinks(*kind, tenant, namespace, names)
                .await?
                .into_iter()
                .map(|sink| (sink.name.clone(), sink))
                .collect();
            let missing: Vec<&str> = names
                .iter()
                .filter(|name| !by_name.contains_key(*name))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Ok(Err(Skip::new(
                    SkipReason::MissingComponent,
                    format!("{kind}: {}", missing.join(", ")),
                )));
            }
            sinks.extend(names.iter().filter_map(|name| by_name.get(name).cloned()));
        }

        if let Some(owned) = sinks.iter().find(|sink| sink.is_claimed()) {
            return Ok(Err(Skip::new(
                SkipReason::ComponentConflict,
                format!(
                    "{}:{} owned by {}",
                    owned.kind, owned.name, owned.data_link_name
                ),
            )));
        }

        // Result table names in first-reference order
        let mut table_names: Vec<String> = Vec::new();
        for sink in &sinks {
            let Some(table_name) = &sink.bkbase_result_table_name else {
                continue;
            };
            if table_name.is_empty() {
                return Ok(Err(Skip::new(
                    SkipReason::EmptyResultTableRef,
                    format!("{}:{}", sink.kind, sink.name),
                )));
            }
            if !table_names.contains(table_name) {
                table_names.push(table_name.clone());
            }
        }

        let by_name: HashMap<String, ResultTableConfig> = self
            .store
            .result_tables(tenant, namespace, &table_names)
            .await?
            .into_iter()
            .map(|table| (table.name.clone(), table))
            .collect();
        let missing: Vec<&str> = table_names
            .iter()
            .filter(|name| !by_name.contains_key(*name))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Ok(Err(Skip::new(
                SkipReason::MissingResultTable,
                missing.join(", "),
            )));
        }
        let result_tables: Vec<ResultTableConfig> = table_names
            .iter()
            .filter_map(|name| by_name.get(name).cloned())
            .collect();

        if let Some(owned) = result_tables.iter().find(|table| table.is_claimed()) {
            return Ok(Err(Skip::new(
                SkipReason::ResultTableConflict,
                format!("{} owned by {}", owned.name, owned.data_link_name),
            )));
        }

        let strategy = match self.infer_strategy(databus, &sink_groups).await? {
            Ok(strategy) => strategy,
            Err(skip) => return Ok(Err(skip)),
        };

        let table_ids = result_tables
            .iter()
            .filter(|table| !table.table_id.is_empty())
            .map(|table| table.table_id.clone())
            .collect();

        Ok(Ok(Resolution {
            data_link_name: rebuilt_data_link_name(tenant, namespace, &databus.name),
            strategy,
            sinks,
            result_tables,
            table_ids,
        }))
    }

    /// ES plus Doris bindings make a log link; otherwise the data source decides
    async fn infer_strategy(
        &self,
        databus: &DataBusConfig,
        sink_groups: &[(SinkKind, Vec<String>)],
    ) -> Result<Result<DataLinkStrategy, Skip>, Error> {
        let has_kind = |kind: SinkKind| sink_groups.iter().any(|(k, _)| *k == kind);
        if has_kind(SinkKind::EsStorageBinding) && has_kind(SinkKind::DorisBinding) {
            return Ok(Ok(DataLinkStrategy::BkLog));
        }

        let Some(source) = self.store.data_source(databus.bk_data_id).await? else {
            return Ok(Err(Skip::new(
                SkipReason::MissingDataSource,
                format!("bk_data_id {}", databus.bk_data_id),
            )));
        };

        Ok(DataLinkStrategy::from_etl_config(&source.etl_config).ok_or_else(|| {
            Skip::new(
                SkipReason::UnmappedEtlConfig,
                format!("etl_config {}", source.etl_config),
            )
        }))
    }
}

/// Parse the sink list into names per kind, kinds in first-appearance order
fn group_sink_entries(databus: &DataBusConfig) -> Result<Vec<(SinkKind, Vec<String>)>, Skip> {
    let entries = databus
        .sink_entries()
        .map_err(|err| Skip::new(SkipReason::MalformedSinkEntry, err.to_string()))?;

    let mut groups: Vec<(&str, Vec<String>)> = Vec::new();
    for entry in &entries {
        let (kind, name) = parse_sink_entry(entry)
            .map_err(|_| Skip::new(SkipReason::MalformedSinkEntry, entry.clone()))?;
        match groups.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, names)) => names.push(name.to_string()),
            None => groups.push((kind, vec![name.to_string()])),
        }
    }

    groups
        .into_iter()
        .map(|(kind, names)| {
            kind.parse::<SinkKind>()
                .map(|kind| (kind, names))
                .map_err(|_| Skip::new(SkipReason::UnknownSinkKind, kind))
        })
        .collect()
}
