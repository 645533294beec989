//! Event handling while a command runs

use crate::logging::log_event_with_tracing;
use relsync_events::{AppEvent, DataLinkEvent, EventMessage};

/// Drains events from the running command
#[derive(Default)]
pub struct EventHandler {
    warnings: usize,
    conflicts: usize,
}

impl EventHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, message: EventMessage) {
        log_event_with_tracing(&message);

        if let AppEvent::DataLink(DataLinkEvent::Skipped { reason, .. }) = &message.event {
            if reason.is_conflict() {
                self.conflicts += 1;
            }
        }
        if message.event.log_level() == tracing::Level::WARN {
            self.warnings += 1;
        }
    }

    /// Warnings seen so far, conflicts excluded
    pub fn warnings(&self) -> usize {
        self.warnings
    }

    /// Ownership conflicts seen so far
    pub fn conflicts(&self) -> usize {
        self.conflicts
    }
}
