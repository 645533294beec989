//! Space lookup error types

use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum SpaceError {
    #[error("space not found: {space_uid}")]
    NotFound { space_uid: String },

    #[error("invalid space uid: {space_uid}")]
    InvalidUid { space_uid: String },

    #[error("space lookup rejected {space_uid}: {message}")]
    Rejected { space_uid: String, message: String },
}

impl SpaceError {
    /// Whether this error means the space simply does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
