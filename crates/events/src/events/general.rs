use serde::{Deserialize, Serialize};

/// Command lifecycle and record-level warnings not tied to one reconciler
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// A record was passed over; `context` holds the underlying error
    Warning { message: String, context: String },

    /// A CLI command began
    OperationStarted { operation: String },

    /// A CLI command returned
    OperationCompleted { operation: String, success: bool },

    /// A CLI command failed
    OperationFailed { operation: String, error: String },
}

impl GeneralEvent {
    #[must_use]
    pub fn warning(message: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            context: context.into(),
        }
    }
}
