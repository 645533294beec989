//! Persistence error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StateError {
    #[error("database error: {message}")]
    DatabaseError { message: String },

    #[error("transaction failed: {message}")]
    TransactionFailed { message: String },

    #[error("migration failed: {message}")]
    MigrationFailed { message: String },

    #[error("corrupted row in {table}: {message}")]
    CorruptedRow { table: String, message: String },
}

impl UserFacingError for StateError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MigrationFailed { .. } => {
                Some("Check that the database file belongs to this version of relsync.")
            }
            Self::CorruptedRow { .. } => {
                Some("Inspect the offending row; JSON columns must hold valid arrays.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DatabaseError { .. } | Self::TransactionFailed { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::DatabaseError { .. } => "state.database_error",
            Self::TransactionFailed { .. } => "state.transaction_failed",
            Self::MigrationFailed { .. } => "state.migration_failed",
            Self::CorruptedRow { .. } => "state.corrupted_row",
        };
        Some(code)
    }
}
