//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so the
//! same run can be followed through JSON logs.

use relsync_events::{AppEvent, ClusterEvent, DataLinkEvent, EventMessage, GeneralEvent};
use tracing::{debug, error, info, warn};

/// Log an event at the level recorded in its metadata
pub fn log_event_with_tracing(message: &EventMessage) {
    let event = &message.event;
    let meta = &message.meta;
    let level = meta.tracing_level();

    match event {
        AppEvent::Cluster(cluster_event) => match cluster_event {
            ClusterEvent::ReconcileStarted {
                projects,
                overrides,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    projects,
                    overrides,
                    "Cluster reconcile started"
                );
            }
            ClusterEvent::SpaceLookupFailed {
                project_code,
                space_uid,
                not_found,
                error,
            } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    project_code = %project_code,
                    space_uid = %space_uid,
                    not_found,
                    error = %error,
                    "Container space lookup failed"
                );
            }
            ClusterEvent::ReconcileCompleted { report } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    desired = report.desired,
                    added = report.added,
                    refreshed = report.refreshed,
                    deleted = report.deleted,
                    lookup_failures = report.lookup_failures,
                    duration_ms = report.duration_ms,
                    "Cluster reconcile completed"
                );
            }
        },

        AppEvent::DataLink(datalink_event) => match datalink_event {
            DataLinkEvent::RebuildStarted {
                bk_tenant_id,
                namespace,
                total,
                dry_run,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    bk_tenant_id = %bk_tenant_id,
                    namespace = %namespace,
                    total,
                    dry_run,
                    "Data-link rebuild started"
                );
            }
            DataLinkEvent::Linked {
                databus,
                data_link_name,
                strategy,
                table_ids,
                created,
            } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    databus = %databus,
                    data_link_name = %data_link_name,
                    strategy = strategy.as_str(),
                    table_ids = ?table_ids,
                    created,
                    "Data-bus linked"
                );
            }
            DataLinkEvent::Planned {
                databus,
                data_link_name,
                strategy,
            } => {
                debug!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    databus = %databus,
                    data_link_name = %data_link_name,
                    strategy = strategy.as_str(),
                    "Data-bus planned"
                );
            }
            DataLinkEvent::Skipped {
                databus,
                reason,
                detail,
            } => {
                if level == tracing::Level::ERROR {
                    error!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        databus = %databus,
                        reason = reason.as_str(),
                        detail = %detail,
                        "Data-bus skipped"
                    );
                } else {
                    warn!(
                        source = meta.source.as_str(),
                        event_id = %meta.event_id,
                        correlation = ?meta.correlation_id,
                        databus = %databus,
                        reason = reason.as_str(),
                        detail = %detail,
                        "Data-bus skipped"
                    );
                }
            }
            DataLinkEvent::RebuildCompleted { report } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    bk_tenant_id = %report.bk_tenant_id,
                    namespace = %report.namespace,
                    total = report.total,
                    success = report.success,
                    skipped = report.skipped,
                    dry_run = report.dry_run,
                    duration_ms = report.duration_ms,
                    "Data-link rebuild completed"
                );
            }
        },

        AppEvent::General(general_event) => match general_event {
            GeneralEvent::Warning { message, context } => {
                warn!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    correlation = ?meta.correlation_id,
                    message = %message,
                    context = %context,
                    "Warning"
                );
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    "Operation started"
                );
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                info!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    success,
                    "Operation completed"
                );
            }
            GeneralEvent::OperationFailed { operation, error } => {
                error!(
                    source = meta.source.as_str(),
                    event_id = %meta.event_id,
                    operation = %operation,
                    error = %error,
                    "Operation failed"
                );
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relsync_events::EventMeta;
    use relsync_types::SkipReason;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(message: &EventMessage) -> String {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::with_default(subscriber, || log_event_with_tracing(message));
        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    fn skipped(reason: SkipReason) -> EventMessage {
        let event = AppEvent::DataLink(DataLinkEvent::Skipped {
            databus: "DB1".to_string(),
            reason,
            detail: "VmStorageBinding:missing".to_string(),
        });
        let meta = EventMeta::new(event.log_level(), event.event_source());
        EventMessage::new(meta, event)
    }

    #[test]
    fn skipped_databus_logs_one_record() {
        let output = capture(&skipped(SkipReason::MissingComponent));

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1, "{output}");
        assert!(lines[0].contains("WARN"));
        assert!(lines[0].contains("Data-bus skipped"));
        assert!(lines[0].contains("DB1"));
    }

    #[test]
    fn ownership_conflict_logs_one_error_record() {
        let output = capture(&skipped(SkipReason::ResultTableConflict));

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1, "{output}");
        assert!(lines[0].contains("ERROR"));
    }
}
