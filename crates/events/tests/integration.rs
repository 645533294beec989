//! Integration tests for events

#[cfg(test)]
mod tests {
    use relsync_events::*;
    use relsync_types::SkipReason;

    #[tokio::test]
    async fn test_event_emitter_helpers() {
        let (tx, mut rx) = channel();

        tx.emit_operation_started("cluster sync");
        tx.emit_warning_with_context("space lookup skipped", "timeout");
        tx.emit_operation_failed("cluster sync", "store unavailable");

        let first = rx.recv().await.unwrap();
        assert!(matches!(
            first.event,
            AppEvent::General(GeneralEvent::OperationStarted { .. })
        ));
        assert_eq!(first.meta.level, EventLevel::Info);
        assert_eq!(first.meta.source, EventSource::General);

        let second = rx.recv().await.unwrap();
        match second.event {
            AppEvent::General(GeneralEvent::Warning { message, context }) => {
                assert_eq!(message, "space lookup skipped");
                assert_eq!(context, "timeout");
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(second.meta.level, EventLevel::Warn);

        let third = rx.recv().await.unwrap();
        assert_eq!(third.meta.level, EventLevel::Error);
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_operation_completed("migrate", true);
    }

    #[test]
    fn test_conflict_skips_log_as_errors() {
        let conflict = AppEvent::DataLink(DataLinkEvent::Skipped {
            databus: "DB1".to_string(),
            reason: SkipReason::ResultTableConflict,
            detail: "RT2 owned by other".to_string(),
        });
        let missing = AppEvent::DataLink(DataLinkEvent::Skipped {
            databus: "DB1".to_string(),
            reason: SkipReason::MissingComponent,
            detail: "S9".to_string(),
        });
        assert_eq!(conflict.log_level(), tracing::Level::ERROR);
        assert_eq!(missing.log_level(), tracing::Level::WARN);
        assert_eq!(conflict.event_source(), EventSource::DataLink);
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = AppEvent::Cluster(ClusterEvent::ReconcileStarted {
            projects: 2,
            overrides: 0,
        });
        let meta = EventMeta::new(event.log_level(), event.event_source());
        let value = serde_json::to_value(EventMessage::new(meta, event)).unwrap();
        assert_eq!(value["event"]["domain"], "cluster");
        assert_eq!(value["event"]["event"]["type"], "ReconcileStarted");
        assert_eq!(value["meta"]["source"], "cluster");
    }
}
